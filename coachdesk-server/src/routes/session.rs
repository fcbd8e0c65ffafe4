//! Session context endpoint and the identity checks coach and student
//! routes run before touching the store

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use coachdesk_core::{Area, Role};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::error::AppError;
use crate::session::current_session;
use crate::state::AppState;
use crate::store::{AccountStore, Coach, RosterStore, SessionStore, UserId};

#[derive(Serialize)]
pub struct SessionContext {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub server_time: i64,
}

/// GET /auth/session
pub async fn get_session_context<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
) -> Result<Json<SessionContext>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let server_time = chrono::Utc::now().timestamp();

    let Some(session) = current_session(&cookies, state.sessions.as_ref())? else {
        return Ok(Json(SessionContext {
            authenticated: false,
            user_id: None,
            role: None,
            server_time,
        }));
    };

    let role = state.accounts.get_role(session.user_id)?.map(|r| r.role);

    Ok(Json(SessionContext {
        authenticated: true,
        user_id: Some(session.user_id.0),
        role,
        server_time,
    }))
}

/// The user behind the request's session holding the role of `area`
pub fn require_role<A, S, R>(
    state: &AppState<A, S, R>,
    cookies: &Cookies,
    area: Area,
) -> Result<UserId, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let session =
        current_session(cookies, state.sessions.as_ref())?.ok_or(AppError::NotAuthenticated)?;

    match state.accounts.get_role(session.user_id)? {
        Some(record) if record.role == area.required_role() => Ok(session.user_id),
        _ => Err(coachdesk_core::Error::RoleMismatch(area).into()),
    }
}

/// The coach behind the request's session
pub fn require_coach<A, S, R>(
    state: &AppState<A, S, R>,
    cookies: &Cookies,
) -> Result<Coach, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let user_id = require_role(state, cookies, Area::Coach)?;
    state
        .accounts
        .get_coach_by_user(user_id)?
        .ok_or(AppError::CoachNotFound)
}
