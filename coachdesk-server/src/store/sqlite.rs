//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use coachdesk_core::{Gender, Role};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    AccountStore, Club, ClubDraft, ClubId, Coach, CoachId, RoleRecord, RosterStore, Session,
    SessionId, SessionStore, StoreResult, Student, StudentDraft, StudentId, User, UserId,
};
use crate::crypto::generate_session_id;
use crate::error::AppError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

const STUDENT_COLUMNS: &str = "id, nombre, apellido, telefono, fecha_nacimiento, direccion, \
     comuna, genero, fecha_primera_clase, id_usuario, id_coach, id_ubicacion, fecha_creacion";

/// SQLite-based store implementing every store trait
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> AppError {
    AppError::Internal(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Fixed-width timestamps so that text comparison orders them
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = Connection::open(path).map_err(db_err)?;

        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), AppError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, AppError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(db_err)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), AppError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                phone TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS coach (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                id_usuario INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                dominio TEXT NOT NULL
            );

            -- Exactly one role per user
            CREATE TABLE IF NOT EXISTS rol_usuario (
                id_usuario INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                rol TEXT NOT NULL CHECK (rol IN ('coach', 'alumno')),
                id_coach INTEGER REFERENCES coach(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS ubicacion (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nombre TEXT NOT NULL,
                direccion TEXT NOT NULL,
                comuna TEXT NOT NULL,
                id_coach INTEGER NOT NULL REFERENCES coach(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_ubicacion_coach ON ubicacion(id_coach);

            CREATE TABLE IF NOT EXISTS alumno (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nombre TEXT NOT NULL,
                apellido TEXT NOT NULL,
                telefono TEXT NOT NULL,
                fecha_nacimiento TEXT,
                direccion TEXT,
                comuna TEXT,
                genero TEXT NOT NULL CHECK (genero IN ('masculino', 'femenino', 'otro')),
                fecha_primera_clase TEXT,
                id_usuario INTEGER NOT NULL REFERENCES users(id),
                id_coach INTEGER NOT NULL REFERENCES coach(id) ON DELETE CASCADE,
                id_ubicacion INTEGER REFERENCES ubicacion(id) ON DELETE SET NULL,
                fecha_creacion TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_alumno_coach ON alumno(id_coach);

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn club_belongs_to(conn: &Connection, coach: CoachId, club_id: ClubId) -> StoreResult<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM ubicacion WHERE id = ?1 AND id_coach = ?2)",
            params![club_id.0 as i64, coach.0 as i64],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    /// A student may only point at a club of the same coach
    fn check_club(conn: &Connection, coach: CoachId, club_id: Option<ClubId>) -> StoreResult<()> {
        if let Some(id) = club_id {
            if !Self::club_belongs_to(conn, coach, id)? {
                return Err(AppError::UnknownClub);
            }
        }
        Ok(())
    }

    fn fetch_student(
        conn: &Connection,
        coach: CoachId,
        student_id: StudentId,
    ) -> StoreResult<Option<Student>> {
        conn.query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM alumno WHERE id = ?1 AND id_coach = ?2"),
            params![student_id.0 as i64, coach.0 as i64],
            student_from_row,
        )
        .optional()
        .map_err(db_err)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: i64 = row.get(0)?;
    let created_at: String = row.get(4)?;
    Ok(User {
        id: UserId(id as u64),
        email: row.get(1)?,
        password_hash: row.get(2)?,
        phone: row.get(3)?,
        created_at: parse_timestamp(&created_at),
    })
}

fn club_from_row(row: &Row<'_>) -> rusqlite::Result<Club> {
    let id: i64 = row.get(0)?;
    let coach: i64 = row.get(4)?;
    Ok(Club {
        id: ClubId(id as u64),
        nombre: row.get(1)?,
        direccion: row.get(2)?,
        comuna: row.get(3)?,
        id_coach: CoachId(coach as u64),
    })
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let id: i64 = row.get(0)?;
    let genero: String = row.get(7)?;
    let id_usuario: i64 = row.get(9)?;
    let id_coach: i64 = row.get(10)?;
    let id_ubicacion: Option<i64> = row.get(11)?;
    let fecha_creacion: String = row.get(12)?;
    Ok(Student {
        id: StudentId(id as u64),
        nombre: row.get(1)?,
        apellido: row.get(2)?,
        telefono: row.get(3)?,
        fecha_nacimiento: parse_date(row.get(4)?),
        direccion: row.get(5)?,
        comuna: row.get(6)?,
        genero: genero.parse::<Gender>().unwrap_or_default(),
        fecha_primera_clase: parse_date(row.get(8)?),
        id_usuario: UserId(id_usuario as u64),
        id_coach: CoachId(id_coach as u64),
        id_ubicacion: id_ubicacion.map(|id| ClubId(id as u64)),
        fecha_creacion: parse_timestamp(&fecha_creacion),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let id: String = row.get(0)?;
    let user_id: i64 = row.get(1)?;
    let created_at: String = row.get(2)?;
    let expires_at: String = row.get(3)?;
    Ok(Session {
        id: SessionId(id),
        user_id: UserId(user_id as u64),
        created_at: parse_timestamp(&created_at),
        expires_at: parse_timestamp(&expires_at),
    })
}

fn insert_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    phone: Option<&str>,
) -> StoreResult<UserId> {
    conn.execute(
        "INSERT INTO users (email, password_hash, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![email.to_lowercase(), password_hash, phone, timestamp(Utc::now())],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            return AppError::EmailAlreadyExists;
        }
        db_err(e)
    })?;

    Ok(UserId(conn.last_insert_rowid() as u64))
}

fn insert_role(conn: &Connection, record: RoleRecord) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO rol_usuario (id_usuario, rol, id_coach) VALUES (?1, ?2, ?3)",
        params![
            record.user_id.0 as i64,
            record.role.as_str(),
            record.coach_id.map(|id| id.0 as i64),
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            return AppError::RoleAlreadyAssigned;
        }
        db_err(e)
    })?;

    Ok(())
}

fn insert_coach(conn: &Connection, user_id: UserId, dominio: &str) -> StoreResult<Coach> {
    conn.execute(
        "INSERT INTO coach (id_usuario, dominio) VALUES (?1, ?2)",
        params![user_id.0 as i64, dominio],
    )
    .map_err(db_err)?;

    Ok(Coach {
        id: CoachId(conn.last_insert_rowid() as u64),
        user_id,
        dominio: dominio.to_string(),
    })
}

impl AccountStore for SqliteStore {
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        phone: Option<&str>,
    ) -> StoreResult<UserId> {
        let conn = self.conn.lock().unwrap();
        insert_user(&conn, email, password_hash, phone)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, email, password_hash, phone, created_at FROM users WHERE id = ?1",
            params![user_id.0 as i64],
            user_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.to_lowercase();
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, email, password_hash, phone, created_at FROM users WHERE email = ?1",
            params![normalized],
            user_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn assign_role(&self, record: RoleRecord) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        insert_role(&conn, record)
    }

    fn get_role(&self, user_id: UserId) -> StoreResult<Option<RoleRecord>> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT rol, id_coach FROM rol_usuario WHERE id_usuario = ?1",
                params![user_id.0 as i64],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err)?;

        match row {
            Some((rol, id_coach)) => Ok(Some(RoleRecord {
                user_id,
                role: rol.parse::<Role>()?,
                coach_id: id_coach.map(|id| CoachId(id as u64)),
            })),
            None => Ok(None),
        }
    }

    fn create_coach(&self, user_id: UserId, dominio: &str) -> StoreResult<Coach> {
        let conn = self.conn.lock().unwrap();
        insert_coach(&conn, user_id, dominio)
    }

    fn get_coach_by_user(&self, user_id: UserId) -> StoreResult<Option<Coach>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, dominio FROM coach WHERE id_usuario = ?1",
            params![user_id.0 as i64],
            |row| {
                let id: i64 = row.get(0)?;
                Ok(Coach {
                    id: CoachId(id as u64),
                    user_id,
                    dominio: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    /// User and role are written in one transaction
    fn create_alumno_account(
        &self,
        email: &str,
        password_hash: &str,
        phone: &str,
    ) -> StoreResult<UserId> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let user_id = insert_user(&tx, email, password_hash, Some(phone))?;
        insert_role(
            &tx,
            RoleRecord {
                user_id,
                role: Role::Alumno,
                coach_id: None,
            },
        )?;

        tx.commit().map_err(db_err)?;
        Ok(user_id)
    }

    /// User, coach and role are written in one transaction
    fn create_coach_account(
        &self,
        email: &str,
        password_hash: &str,
        dominio: &str,
    ) -> StoreResult<Coach> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db_err)?;

        let user_id = insert_user(&tx, email, password_hash, None)?;
        let coach = insert_coach(&tx, user_id, dominio)?;
        insert_role(
            &tx,
            RoleRecord {
                user_id,
                role: Role::Coach,
                coach_id: Some(coach.id),
            },
        )?;

        tx.commit().map_err(db_err)?;
        Ok(coach)
    }
}

impl SessionStore for SqliteStore {
    fn create(&self, user_id: UserId, ttl: Duration) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let session = Session {
            id: SessionId(generate_session_id()),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        };

        conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.0,
                session.user_id.0 as i64,
                timestamp(session.created_at),
                timestamp(session.expires_at),
            ],
        )
        .map_err(db_err)?;

        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1",
            params![session_id.0],
            session_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn touch(&self, session_id: &SessionId, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "UPDATE sessions SET expires_at = ?1 WHERE id = ?2",
            params![timestamp(expires_at), session_id.0],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id.0])
            .map_err(db_err)?;

        Ok(())
    }

    fn cleanup_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_deleted = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![timestamp(now)],
            )
            .map_err(db_err)?;

        Ok(rows_deleted as u64)
    }
}

impl RosterStore for SqliteStore {
    fn list_clubs(&self, coach: CoachId) -> StoreResult<Vec<Club>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, nombre, direccion, comuna, id_coach FROM ubicacion
                 WHERE id_coach = ?1 ORDER BY nombre ASC, id ASC",
            )
            .map_err(db_err)?;

        let clubs = stmt
            .query_map(params![coach.0 as i64], club_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(clubs)
    }

    fn get_club(&self, coach: CoachId, club_id: ClubId) -> StoreResult<Option<Club>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, nombre, direccion, comuna, id_coach FROM ubicacion
             WHERE id = ?1 AND id_coach = ?2",
            params![club_id.0 as i64, coach.0 as i64],
            club_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn create_club(&self, coach: CoachId, draft: &ClubDraft) -> StoreResult<Club> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO ubicacion (nombre, direccion, comuna, id_coach) VALUES (?1, ?2, ?3, ?4)",
            params![draft.nombre, draft.direccion, draft.comuna, coach.0 as i64],
        )
        .map_err(db_err)?;

        Ok(Club {
            id: ClubId(conn.last_insert_rowid() as u64),
            nombre: draft.nombre.clone(),
            direccion: draft.direccion.clone(),
            comuna: draft.comuna.clone(),
            id_coach: coach,
        })
    }

    fn update_club(
        &self,
        coach: CoachId,
        club_id: ClubId,
        draft: &ClubDraft,
    ) -> StoreResult<Club> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE ubicacion SET nombre = ?1, direccion = ?2, comuna = ?3
                 WHERE id = ?4 AND id_coach = ?5",
                params![
                    draft.nombre,
                    draft.direccion,
                    draft.comuna,
                    club_id.0 as i64,
                    coach.0 as i64,
                ],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(AppError::ClubNotFound);
        }

        Ok(Club {
            id: club_id,
            nombre: draft.nombre.clone(),
            direccion: draft.direccion.clone(),
            comuna: draft.comuna.clone(),
            id_coach: coach,
        })
    }

    fn delete_club(&self, coach: CoachId, club_id: ClubId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // ON DELETE SET NULL detaches the club's students
        let rows_affected = conn
            .execute(
                "DELETE FROM ubicacion WHERE id = ?1 AND id_coach = ?2",
                params![club_id.0 as i64, coach.0 as i64],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(AppError::ClubNotFound);
        }

        Ok(())
    }

    fn list_students(&self, coach: CoachId) -> StoreResult<Vec<Student>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM alumno WHERE id_coach = ?1 ORDER BY nombre ASC, id ASC"
            ))
            .map_err(db_err)?;

        let students = stmt
            .query_map(params![coach.0 as i64], student_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(students)
    }

    fn get_student(
        &self,
        coach: CoachId,
        student_id: StudentId,
    ) -> StoreResult<Option<Student>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_student(&conn, coach, student_id)
    }

    fn create_student(
        &self,
        coach: CoachId,
        created_by: UserId,
        draft: &StudentDraft,
    ) -> StoreResult<Student> {
        let conn = self.conn.lock().unwrap();
        Self::check_club(&conn, coach, draft.id_ubicacion)?;

        conn.execute(
            "INSERT INTO alumno (nombre, apellido, telefono, fecha_nacimiento, direccion, comuna,
                 genero, fecha_primera_clase, id_usuario, id_coach, id_ubicacion, fecha_creacion)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                draft.nombre,
                draft.apellido,
                draft.telefono,
                format_date(draft.fecha_nacimiento),
                draft.direccion,
                draft.comuna,
                draft.genero.as_str(),
                format_date(draft.fecha_primera_clase),
                created_by.0 as i64,
                coach.0 as i64,
                draft.id_ubicacion.map(|id| id.0 as i64),
                timestamp(Utc::now()),
            ],
        )
        .map_err(db_err)?;

        let id = StudentId(conn.last_insert_rowid() as u64);
        Self::fetch_student(&conn, coach, id)?
            .ok_or_else(|| AppError::Internal("inserted student vanished".to_string()))
    }

    fn update_student(
        &self,
        coach: CoachId,
        student_id: StudentId,
        draft: &StudentDraft,
    ) -> StoreResult<Student> {
        let conn = self.conn.lock().unwrap();
        Self::check_club(&conn, coach, draft.id_ubicacion)?;

        let rows_affected = conn
            .execute(
                "UPDATE alumno SET nombre = ?1, apellido = ?2, telefono = ?3,
                     fecha_nacimiento = ?4, direccion = ?5, comuna = ?6, genero = ?7,
                     fecha_primera_clase = ?8, id_ubicacion = ?9
                 WHERE id = ?10 AND id_coach = ?11",
                params![
                    draft.nombre,
                    draft.apellido,
                    draft.telefono,
                    format_date(draft.fecha_nacimiento),
                    draft.direccion,
                    draft.comuna,
                    draft.genero.as_str(),
                    format_date(draft.fecha_primera_clase),
                    draft.id_ubicacion.map(|id| id.0 as i64),
                    student_id.0 as i64,
                    coach.0 as i64,
                ],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(AppError::StudentNotFound);
        }

        Self::fetch_student(&conn, coach, student_id)?.ok_or(AppError::StudentNotFound)
    }

    fn delete_student(&self, coach: CoachId, student_id: StudentId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "DELETE FROM alumno WHERE id = ?1 AND id_coach = ?2",
                params![student_id.0 as i64, coach.0 as i64],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(AppError::StudentNotFound);
        }

        Ok(())
    }
}
