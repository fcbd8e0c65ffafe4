//! Service error types
//!
//! Every variant maps to a status code and a localized reason. Internal
//! details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Credenciales de acceso inválidas")]
    InvalidCredentials,

    #[error("No se encontró el rol del usuario")]
    RoleNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("No autenticado")]
    NotAuthenticated,

    #[error("No se encontró información del coach")]
    CoachNotFound,

    #[error("El correo ya está registrado")]
    EmailAlreadyExists,

    #[error("El usuario ya tiene un rol asignado")]
    RoleAlreadyAssigned,

    #[error("Alumno no encontrado")]
    StudentNotFound,

    #[error("Club no encontrado")]
    ClubNotFound,

    #[error("La ubicación seleccionada no existe")]
    UnknownClub,

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<coachdesk_core::Error> for AppError {
    fn from(err: coachdesk_core::Error) -> Self {
        match err {
            coachdesk_core::Error::RoleNotFound => AppError::RoleNotFound,
            coachdesk_core::Error::RoleMismatch(_) => AppError::Forbidden(err.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidCredentials | AppError::RoleNotFound | AppError::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::CoachNotFound | AppError::StudentNotFound | AppError::ClubNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::EmailAlreadyExists | AppError::RoleAlreadyAssigned => StatusCode::CONFLICT,
            AppError::UnknownClub | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                let body = json!({ "success": false, "reason": "Error interno del servidor" });
                return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
            }
        };

        let body = json!({ "success": false, "reason": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
