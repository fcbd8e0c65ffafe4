//! Coach Desk Core Library
//!
//! Domain rules shared by the Coach Desk service:
//! - Users hold exactly one role, coach or alumno, which decides their area
//! - Phone numbers are coerced toward the Chilean mobile format and validated
//! - Roster records carry display helpers for age, seniority and gender

pub mod error;
pub mod phone;
pub mod role;
pub mod search;
pub mod student;

pub use error::Error;
pub use phone::{normalize_phone, validate_phone, PHONE_FORMAT};
pub use role::{route_after_login, Area, Role, LOGIN_PATH};
pub use student::{format_age, format_seniority, Gender};

/// Result type for coachdesk-core operations
pub type Result<T> = std::result::Result<T, Error>;
