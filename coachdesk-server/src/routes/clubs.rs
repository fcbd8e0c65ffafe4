//! Club (training location) endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use coachdesk_core::search;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use super::session::require_coach;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{AccountStore, Club, ClubDraft, ClubId, RosterStore, SessionStore};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct ClubRequest {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub direccion: String,
    #[serde(default)]
    pub comuna: String,
}

impl ClubRequest {
    fn into_draft(self) -> Result<ClubDraft, AppError> {
        Ok(ClubDraft {
            nombre: required(self.nombre, "El nombre es requerido")?,
            direccion: required(self.direccion, "La direccion es requerida")?,
            comuna: required(self.comuna, "La comuna es requerida")?,
        })
    }
}

fn required(value: String, message: &'static str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(coachdesk_core::Error::Required(message).into());
    }
    Ok(value.to_string())
}

#[derive(Serialize)]
pub struct ClubList {
    pub success: bool,
    pub clubs: Vec<Club>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// GET /coach/clubs
pub async fn list_clubs<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Query(params): Query<SearchParams>,
) -> Result<Json<ClubList>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let coach = require_coach(&state, &cookies)?;
    let query = search::Query::from(params.q.as_deref());

    let clubs = state
        .roster
        .list_clubs(coach.id)?
        .into_iter()
        .filter(|c| query.matches_club(&c.nombre, &c.direccion, &c.comuna))
        .collect();

    Ok(Json(ClubList {
        success: true,
        clubs,
    }))
}

/// POST /coach/clubs
pub async fn create_club<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Json(req): Json<ClubRequest>,
) -> Result<(StatusCode, Json<Club>), AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let coach = require_coach(&state, &cookies)?;
    let draft = req.into_draft()?;

    let club = state.roster.create_club(coach.id, &draft)?;
    tracing::info!(coach_id = coach.id.0, club_id = club.id.0, "Club created");

    Ok((StatusCode::CREATED, Json(club)))
}

/// PUT /coach/clubs/{id}
pub async fn update_club<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Path(id): Path<u64>,
    Json(req): Json<ClubRequest>,
) -> Result<Json<Club>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let coach = require_coach(&state, &cookies)?;
    let draft = req.into_draft()?;

    let club = state.roster.update_club(coach.id, ClubId(id), &draft)?;
    Ok(Json(club))
}

/// DELETE /coach/clubs/{id}
pub async fn delete_club<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Path(id): Path<u64>,
) -> Result<Json<DeleteResponse>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let coach = require_coach(&state, &cookies)?;

    state.roster.delete_club(coach.id, ClubId(id))?;
    tracing::info!(coach_id = coach.id.0, club_id = id, "Club deleted");

    Ok(Json(DeleteResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(nombre: &str, direccion: &str, comuna: &str) -> ClubRequest {
        ClubRequest {
            nombre: nombre.to_string(),
            direccion: direccion.to_string(),
            comuna: comuna.to_string(),
        }
    }

    #[test]
    fn test_club_request_trims_fields() {
        let draft = request("  Club Norte ", "Av. Siempre Viva 742", "Ñuñoa")
            .into_draft()
            .unwrap();
        assert_eq!(draft.nombre, "Club Norte");
    }

    #[test]
    fn test_club_request_reports_first_missing_field() {
        let err = request("", "", "").into_draft().unwrap_err();
        assert_eq!(err.to_string(), "El nombre es requerido");

        let err = request("Club", " ", "Ñuñoa").into_draft().unwrap_err();
        assert_eq!(err.to_string(), "La direccion es requerida");

        let err = request("Club", "Calle 1", "").into_draft().unwrap_err();
        assert_eq!(err.to_string(), "La comuna es requerida");
    }
}
