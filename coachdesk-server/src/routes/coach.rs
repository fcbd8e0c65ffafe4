//! Coach profile endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tower_cookies::Cookies;

use super::session::require_coach;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{AccountStore, RosterStore, SessionStore};

#[derive(Serialize)]
pub struct CoachProfile {
    pub coach_id: u64,
    pub user_id: u64,
    pub dominio: String,
}

/// GET /coach
pub async fn get_profile<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
) -> Result<Json<CoachProfile>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let coach = require_coach(&state, &cookies)?;

    Ok(Json(CoachProfile {
        coach_id: coach.id.0,
        user_id: coach.user_id.0,
        dominio: coach.dominio,
    }))
}
