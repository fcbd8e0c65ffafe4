//! Login routing decisions across every role/tab combination

use coachdesk_core::{route_after_login, Area, Error, Role, LOGIN_PATH};

#[test]
fn test_every_role_tab_combination() {
    for role in [Role::Coach, Role::Alumno] {
        for tab in Area::ALL {
            let result = route_after_login(Some(role), tab);
            if role == tab.required_role() {
                assert_eq!(result.unwrap(), tab.landing());
            } else {
                assert_eq!(result.unwrap_err(), Error::RoleMismatch(tab));
            }
        }
    }
}

#[test]
fn test_landing_pages_are_inside_their_area() {
    for area in Area::ALL {
        assert_eq!(Area::protecting(area.landing()), Some(area));
    }
}

#[test]
fn test_login_page_is_not_protected() {
    assert_eq!(Area::protecting(LOGIN_PATH), None);
}

#[test]
fn test_role_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Coach).unwrap(), "\"coach\"");
    let tab: Area = serde_json::from_str("\"alumno\"").unwrap();
    assert_eq!(tab, Area::Alumno);
}
