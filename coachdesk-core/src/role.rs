//! Roles, protected areas and post-login routing

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Where unauthenticated visitors of a protected area are sent
pub const LOGIN_PATH: &str = "/auth/login";

/// The single role a user holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coach,
    Alumno,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coach => "coach",
            Role::Alumno => "alumno",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "coach" => Ok(Role::Coach),
            "alumno" => Ok(Role::Alumno),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

/// A session-protected area of the site.
///
/// Also the login tab a user picks, since each tab targets one area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Coach,
    Alumno,
}

impl Area {
    pub const ALL: [Area; 2] = [Area::Coach, Area::Alumno];

    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Coach => "coach",
            Area::Alumno => "alumno",
        }
    }

    /// Path prefix guarded by the route gate
    pub fn prefix(&self) -> &'static str {
        match self {
            Area::Coach => "/coach",
            Area::Alumno => "/alumno",
        }
    }

    /// Landing page after a successful login through this area's tab
    pub fn landing(&self) -> &'static str {
        match self {
            Area::Coach => "/coach/alumnos",
            Area::Alumno => "/alumno",
        }
    }

    pub fn required_role(&self) -> Role {
        match self {
            Area::Coach => Role::Coach,
            Area::Alumno => Role::Alumno,
        }
    }

    /// The protected area a request path falls into, if any.
    ///
    /// Matching is a plain prefix test, so `/coaches` counts as coach area.
    pub fn protecting(path: &str) -> Option<Area> {
        Self::ALL
            .into_iter()
            .find(|area| path.starts_with(area.prefix()))
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide where a freshly authenticated user goes.
///
/// `role` is the user's role record, `None` when the record is missing.
/// A role that doesn't match the chosen tab is refused; this is a UX guard,
/// the session gate and row scoping remain the actual boundary.
pub fn route_after_login(role: Option<Role>, tab: Area) -> Result<&'static str> {
    let role = role.ok_or(Error::RoleNotFound)?;
    if role != tab.required_role() {
        return Err(Error::RoleMismatch(tab));
    }
    Ok(tab.landing())
}
