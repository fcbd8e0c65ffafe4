//! Storage abstractions for Coach Desk
//!
//! Every roster operation takes the acting coach's id and only ever sees
//! that coach's rows; records owned by someone else behave as missing.

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{InMemoryAccountStore, InMemoryRosterStore, InMemorySessionStore};
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Duration, Utc};
use coachdesk_core::Role;

use crate::error::AppError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, AppError>;

/// Trait for accounts, role records and coaches
pub trait AccountStore: Send + Sync {
    /// Create a login account without a role
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        phone: Option<&str>,
    ) -> StoreResult<UserId>;

    /// Get a user by ID
    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Get a user by email address (case-insensitive)
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Record the user's role; a user holds exactly one
    fn assign_role(&self, record: RoleRecord) -> StoreResult<()>;

    /// Get the role record of a user
    fn get_role(&self, user_id: UserId) -> StoreResult<Option<RoleRecord>>;

    /// Create the coach record backing a coach account
    fn create_coach(&self, user_id: UserId, dominio: &str) -> StoreResult<Coach>;

    /// Get the coach record belonging to a user
    fn get_coach_by_user(&self, user_id: UserId) -> StoreResult<Option<Coach>>;

    /// Create a student account (role alumno)
    fn create_alumno_account(
        &self,
        email: &str,
        password_hash: &str,
        phone: &str,
    ) -> StoreResult<UserId> {
        let user_id = self.create_user(email, password_hash, Some(phone))?;
        self.assign_role(RoleRecord {
            user_id,
            role: Role::Alumno,
            coach_id: None,
        })?;
        Ok(user_id)
    }

    /// Create a coach account: user, coach record and role
    fn create_coach_account(
        &self,
        email: &str,
        password_hash: &str,
        dominio: &str,
    ) -> StoreResult<Coach> {
        let user_id = self.create_user(email, password_hash, None)?;
        let coach = self.create_coach(user_id, dominio)?;
        self.assign_role(RoleRecord {
            user_id,
            role: Role::Coach,
            coach_id: Some(coach.id),
        })?;
        Ok(coach)
    }
}

/// Trait for session storage
pub trait SessionStore: Send + Sync {
    /// Create a new session for a user, valid for `ttl`
    fn create(&self, user_id: UserId, ttl: Duration) -> StoreResult<Session>;

    /// Get a session by ID (expired sessions included)
    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// Move a session's expiry
    fn touch(&self, session_id: &SessionId, expires_at: DateTime<Utc>) -> StoreResult<()>;

    /// Delete a session
    fn delete(&self, session_id: &SessionId) -> StoreResult<()>;

    /// Delete sessions that expired before `now`
    fn cleanup_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Trait for clubs and students, scoped by owning coach
pub trait RosterStore: Send + Sync {
    /// Clubs of a coach ordered by name
    fn list_clubs(&self, coach: CoachId) -> StoreResult<Vec<Club>>;

    fn get_club(&self, coach: CoachId, club_id: ClubId) -> StoreResult<Option<Club>>;

    fn create_club(&self, coach: CoachId, draft: &ClubDraft) -> StoreResult<Club>;

    fn update_club(&self, coach: CoachId, club_id: ClubId, draft: &ClubDraft)
        -> StoreResult<Club>;

    /// Delete a club; its students stay, without a location
    fn delete_club(&self, coach: CoachId, club_id: ClubId) -> StoreResult<()>;

    /// Students of a coach ordered by first name
    fn list_students(&self, coach: CoachId) -> StoreResult<Vec<Student>>;

    fn get_student(&self, coach: CoachId, student_id: StudentId)
        -> StoreResult<Option<Student>>;

    /// Create a student; `created_by` becomes the record's owning user
    fn create_student(
        &self,
        coach: CoachId,
        created_by: UserId,
        draft: &StudentDraft,
    ) -> StoreResult<Student>;

    fn update_student(
        &self,
        coach: CoachId,
        student_id: StudentId,
        draft: &StudentDraft,
    ) -> StoreResult<Student>;

    fn delete_student(&self, coach: CoachId, student_id: StudentId) -> StoreResult<()>;
}
