//! Data models for Coach Desk storage

use chrono::{DateTime, NaiveDate, Utc};
use coachdesk_core::{Gender, Role};
use serde::{Deserialize, Serialize};

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Unique coach identifier (distinct from the coach's user id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoachId(pub u64);

/// Unique club (training location) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClubId(pub u64);

/// Unique student identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub u64);

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// A login account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Stored lowercase
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The one role a user holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRecord {
    pub user_id: UserId,
    pub role: Role,
    /// Set only for coaches
    pub coach_id: Option<CoachId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coach {
    pub id: CoachId,
    pub user_id: UserId,
    pub dominio: String,
}

/// A training location owned by a coach
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Club {
    pub id: ClubId,
    pub nombre: String,
    pub direccion: String,
    pub comuna: String,
    pub id_coach: CoachId,
}

/// Validated club fields, as written by create and update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClubDraft {
    pub nombre: String,
    pub direccion: String,
    pub comuna: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: StudentId,
    pub nombre: String,
    pub apellido: String,
    pub telefono: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub genero: Gender,
    pub fecha_primera_clase: Option<NaiveDate>,
    /// The user that created the record
    pub id_usuario: UserId,
    pub id_coach: CoachId,
    pub id_ubicacion: Option<ClubId>,
    pub fecha_creacion: DateTime<Utc>,
}

/// Validated student fields, as written by create and update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDraft {
    pub nombre: String,
    pub apellido: String,
    pub telefono: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub genero: Gender,
    pub fecha_primera_clase: Option<NaiveDate>,
    pub id_ubicacion: Option<ClubId>,
}

/// A login session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
