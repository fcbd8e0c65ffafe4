//! Error types for Coach Desk domain rules
//!
//! Messages are user-facing and localized (es-CL).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("El teléfono debe tener el formato {}", crate::PHONE_FORMAT)]
    InvalidPhone,

    #[error("Género inválido: {0}")]
    InvalidGender(String),

    #[error("Rol inválido: {0}")]
    InvalidRole(String),

    #[error("No se encontró el rol del usuario")]
    RoleNotFound,

    #[error("Esta cuenta no tiene permisos de {}", .0.as_str())]
    RoleMismatch(crate::Area),

    #[error("{0}")]
    Required(&'static str),
}
