//! Student roster endpoints

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use coachdesk_core::{format_age, format_seniority, search, validate_phone, Gender};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_cookies::Cookies;

use super::clubs::{DeleteResponse, SearchParams};
use super::session::require_coach;
use crate::error::AppError;
use crate::state::AppState;
use crate::store::{
    AccountStore, Club, ClubId, RosterStore, SessionStore, Student, StudentDraft, StudentId,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Student form as submitted. Optional fields may arrive as empty strings.
#[derive(Deserialize)]
pub struct StudentRequest {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub telefono: String,
    pub fecha_nacimiento: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub genero: Option<String>,
    pub fecha_primera_clase: Option<String>,
    /// Number or string; empty and `"0"` mean no location
    pub id_ubicacion: Option<Value>,
}

impl StudentRequest {
    fn into_draft(self) -> Result<StudentDraft, AppError> {
        let nombre = required(&self.nombre, "El nombre es requerido")?;
        let apellido = required(&self.apellido, "El apellido es requerido")?;
        required(&self.telefono, "El teléfono es requerido")?;
        let telefono = validate_phone(&self.telefono)?;

        let genero = match optional(self.genero) {
            Some(raw) => raw.parse::<Gender>()?,
            None => Gender::default(),
        };

        Ok(StudentDraft {
            nombre,
            apellido,
            telefono,
            fecha_nacimiento: parse_date(self.fecha_nacimiento, "fecha_nacimiento")?,
            direccion: optional(self.direccion),
            comuna: optional(self.comuna),
            genero,
            fecha_primera_clase: parse_date(self.fecha_primera_clase, "fecha_primera_clase")?,
            id_ubicacion: parse_location(self.id_ubicacion)?,
        })
    }
}

fn required(value: &str, message: &'static str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(coachdesk_core::Error::Required(message).into());
    }
    Ok(value.to_string())
}

/// Blank strings become `None`
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    optional(value)
        .map(|v| {
            NaiveDate::parse_from_str(&v, DATE_FORMAT)
                .map_err(|_| AppError::Validation(format!("Fecha inválida en {}: {}", field, v)))
        })
        .transpose()
}

fn parse_location(value: Option<Value>) -> Result<Option<ClubId>, AppError> {
    let invalid = || AppError::Validation("La ubicación seleccionada no es válida".to_string());
    let id = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(invalid)?,
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<u64>().map_err(|_| invalid())?
        }
        Some(_) => return Err(invalid()),
    };
    Ok((id != 0).then_some(ClubId(id)))
}

#[derive(Serialize)]
pub struct Ubicacion {
    pub id: u64,
    pub nombre: String,
    pub direccion: String,
    pub comuna: String,
}

impl From<&Club> for Ubicacion {
    fn from(club: &Club) -> Self {
        Self {
            id: club.id.0,
            nombre: club.nombre.clone(),
            direccion: club.direccion.clone(),
            comuna: club.comuna.clone(),
        }
    }
}

/// A roster row: the stored record plus its location and display fields
#[derive(Serialize)]
pub struct StudentView {
    #[serde(flatten)]
    pub student: Student,
    pub ubicacion: Option<Ubicacion>,
    pub edad: String,
    pub antiguedad: String,
    pub genero_corto: &'static str,
}

impl StudentView {
    fn new(student: Student, club: Option<&Club>, today: NaiveDate) -> Self {
        Self {
            ubicacion: club.map(Ubicacion::from),
            edad: format_age(student.fecha_nacimiento, today),
            antiguedad: format_seniority(student.fecha_primera_clase, today),
            genero_corto: student.genero.short(),
            student,
        }
    }
}

#[derive(Serialize)]
pub struct StudentList {
    pub success: bool,
    pub alumnos: Vec<StudentView>,
}

/// GET /coach/alumnos
pub async fn list_students<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Query(params): Query<SearchParams>,
) -> Result<Json<StudentList>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let coach = require_coach(&state, &cookies)?;
    let query = search::Query::from(params.q.as_deref());

    let clubs: HashMap<ClubId, Club> = state
        .roster
        .list_clubs(coach.id)?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    let today = Utc::now().date_naive();

    let alumnos = state
        .roster
        .list_students(coach.id)?
        .into_iter()
        .filter(|s| query.matches_student(&s.nombre, &s.apellido, &s.telefono))
        .map(|s| {
            let club = s.id_ubicacion.and_then(|id| clubs.get(&id));
            StudentView::new(s, club, today)
        })
        .collect();

    Ok(Json(StudentList {
        success: true,
        alumnos,
    }))
}

/// POST /coach/alumnos
pub async fn create_student<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Json(req): Json<StudentRequest>,
) -> Result<(StatusCode, Json<StudentView>), AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let coach = require_coach(&state, &cookies)?;
    let draft = req.into_draft()?;

    let student = state
        .roster
        .create_student(coach.id, coach.user_id, &draft)?;
    tracing::info!(coach_id = coach.id.0, student_id = student.id.0, "Student created");

    let view = with_location(state.roster.as_ref(), student)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// PUT /coach/alumnos/{id}
pub async fn update_student<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Path(id): Path<u64>,
    Json(req): Json<StudentRequest>,
) -> Result<Json<StudentView>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let coach = require_coach(&state, &cookies)?;
    let draft = req.into_draft()?;

    let student = state
        .roster
        .update_student(coach.id, StudentId(id), &draft)?;

    Ok(Json(with_location(state.roster.as_ref(), student)?))
}

/// DELETE /coach/alumnos/{id}
pub async fn delete_student<A, S, R>(
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

    state.roster.delete_student(coach.id, StudentId(id))?;
    tracing::info!(coach_id = coach.id.0, student_id = id, "Student deleted");

    Ok(Json(DeleteResponse { success: true }))
}

fn with_location<R: RosterStore>(roster: &R, student: Student) -> Result<StudentView, AppError> {
    let club = match student.id_ubicacion {
        Some(id) => roster.get_club(student.id_coach, id)?,
        None => None,
    };
    Ok(StudentView::new(student, club.as_ref(), Utc::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> StudentRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_blank_optionals_become_none() {
        let draft = request(json!({
            "nombre": "Ana",
            "apellido": "Pérez",
            "telefono": "912345678",
            "direccion": "  ",
            "comuna": "",
            "genero": "",
            "fecha_nacimiento": "",
            "id_ubicacion": ""
        }))
        .into_draft()
        .unwrap();

        assert_eq!(draft.telefono, "+56912345678");
        assert_eq!(draft.direccion, None);
        assert_eq!(draft.comuna, None);
        assert_eq!(draft.genero, Gender::Masculino);
        assert_eq!(draft.fecha_nacimiento, None);
        assert_eq!(draft.id_ubicacion, None);
    }

    #[test]
    fn test_location_forms() {
        assert_eq!(parse_location(None).unwrap(), None);
        assert_eq!(parse_location(Some(json!("0"))).unwrap(), None);
        assert_eq!(parse_location(Some(json!(0))).unwrap(), None);
        assert_eq!(parse_location(Some(json!("4"))).unwrap(), Some(ClubId(4)));
        assert_eq!(parse_location(Some(json!(4))).unwrap(), Some(ClubId(4)));
        assert!(parse_location(Some(json!("abc"))).is_err());
        assert!(parse_location(Some(json!(true))).is_err());
    }

    #[test]
    fn test_invalid_phone_rejected() {
        let err = request(json!({
            "nombre": "Ana",
            "apellido": "Pérez",
            "telefono": "+569123456789"
        }))
        .into_draft()
        .unwrap_err();
        assert_eq!(err.to_string(), "El teléfono debe tener el formato +569XXXXXXXX");
    }

    #[test]
    fn test_dates_and_gender_parsed() {
        let draft = request(json!({
            "nombre": "Ana",
            "apellido": "Pérez",
            "telefono": "+56912345678",
            "genero": "femenino",
            "fecha_nacimiento": "2008-03-14",
            "fecha_primera_clase": "2024-01-10"
        }))
        .into_draft()
        .unwrap();

        assert_eq!(draft.genero, Gender::Femenino);
        assert_eq!(draft.fecha_nacimiento, NaiveDate::from_ymd_opt(2008, 3, 14));
        assert_eq!(draft.fecha_primera_clase, NaiveDate::from_ymd_opt(2024, 1, 10));

        assert!(request(json!({
            "nombre": "Ana",
            "apellido": "Pérez",
            "telefono": "+56912345678",
            "fecha_nacimiento": "14/03/2008"
        }))
        .into_draft()
        .is_err());
    }
}
