//! Student portal

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use coachdesk_core::Area;
use serde::Serialize;
use tower_cookies::Cookies;

use super::session::require_role;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{AccountStore, RosterStore, SessionStore};

#[derive(Serialize)]
pub struct PortalHome {
    pub success: bool,
    pub user_id: u64,
    pub email: String,
    pub message: String,
}

/// GET /alumno
pub async fn get_home<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
) -> Result<Json<PortalHome>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let user_id = require_role(&state, &cookies, Area::Alumno)?;
    let user = state
        .accounts
        .get_user(user_id)?
        .ok_or(AppError::NotAuthenticated)?;

    Ok(Json(PortalHome {
        success: true,
        user_id: user.id.0,
        message: format!("Bienvenido/a, {}", user.email),
        email: user.email,
    }))
}
