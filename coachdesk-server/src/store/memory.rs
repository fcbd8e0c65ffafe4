//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use super::{
    AccountStore, Club, ClubDraft, ClubId, Coach, CoachId, RoleRecord, RosterStore, Session,
    SessionId, SessionStore, StoreResult, Student, StudentDraft, StudentId, User, UserId,
};
use crate::crypto::generate_session_id;
use crate::error::AppError;

/// In-memory accounts, roles and coaches
pub struct InMemoryAccountStore {
    users: RwLock<HashMap<UserId, User>>,
    roles: RwLock<HashMap<UserId, RoleRecord>>,
    coaches: RwLock<HashMap<CoachId, Coach>>,
    next_user_id: AtomicU64,
    next_coach_id: AtomicU64,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashMap::new()),
            coaches: RwLock::new(HashMap::new()),
            next_user_id: AtomicU64::new(1),
            next_coach_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        phone: Option<&str>,
    ) -> StoreResult<UserId> {
        let normalized = email.to_lowercase();
        let mut users = self.users.write().unwrap();
        if users.values().any(|u| u.email == normalized) {
            return Err(AppError::EmailAlreadyExists);
        }
        let id = UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst));
        users.insert(
            id,
            User {
                id,
                email: normalized,
                password_hash: password_hash.to_string(),
                phone: phone.map(str::to_string),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.read().unwrap().get(&user_id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.to_lowercase();
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email == normalized)
            .cloned())
    }

    fn assign_role(&self, record: RoleRecord) -> StoreResult<()> {
        let mut roles = self.roles.write().unwrap();
        if roles.contains_key(&record.user_id) {
            return Err(AppError::RoleAlreadyAssigned);
        }
        roles.insert(record.user_id, record);
        Ok(())
    }

    fn get_role(&self, user_id: UserId) -> StoreResult<Option<RoleRecord>> {
        Ok(self.roles.read().unwrap().get(&user_id).copied())
    }

    fn create_coach(&self, user_id: UserId, dominio: &str) -> StoreResult<Coach> {
        let coach = Coach {
            id: CoachId(self.next_coach_id.fetch_add(1, Ordering::SeqCst)),
            user_id,
            dominio: dominio.to_string(),
        };
        self.coaches.write().unwrap().insert(coach.id, coach.clone());
        Ok(coach)
    }

    fn get_coach_by_user(&self, user_id: UserId) -> StoreResult<Option<Coach>> {
        Ok(self
            .coaches
            .read()
            .unwrap()
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, user_id: UserId, ttl: Duration) -> StoreResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: SessionId(generate_session_id()),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn touch(&self, session_id: &SessionId, expires_at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(session) = self.sessions.write().unwrap().get_mut(session_id) {
            session.expires_at = expires_at;
        }
        Ok(())
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }

    fn cleanup_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

/// In-memory clubs and students
pub struct InMemoryRosterStore {
    clubs: RwLock<HashMap<ClubId, Club>>,
    students: RwLock<HashMap<StudentId, Student>>,
    next_club_id: AtomicU64,
    next_student_id: AtomicU64,
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self {
            clubs: RwLock::new(HashMap::new()),
            students: RwLock::new(HashMap::new()),
            next_club_id: AtomicU64::new(1),
            next_student_id: AtomicU64::new(1),
        }
    }

    /// A student may only point at a club of the same coach
    fn check_club(&self, coach: CoachId, club_id: Option<ClubId>) -> StoreResult<()> {
        match club_id {
            Some(id) => match self.clubs.read().unwrap().get(&id) {
                Some(club) if club.id_coach == coach => Ok(()),
                _ => Err(AppError::UnknownClub),
            },
            None => Ok(()),
        }
    }
}

impl Default for InMemoryRosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore for InMemoryRosterStore {
    fn list_clubs(&self, coach: CoachId) -> StoreResult<Vec<Club>> {
        let mut clubs: Vec<Club> = self
            .clubs
            .read()
            .unwrap()
            .values()
            .filter(|c| c.id_coach == coach)
            .cloned()
            .collect();
        clubs.sort_by(|a, b| a.nombre.cmp(&b.nombre).then(a.id.0.cmp(&b.id.0)));
        Ok(clubs)
    }

    fn get_club(&self, coach: CoachId, club_id: ClubId) -> StoreResult<Option<Club>> {
        Ok(self
            .clubs
            .read()
            .unwrap()
            .get(&club_id)
            .filter(|c| c.id_coach == coach)
            .cloned())
    }

    fn create_club(&self, coach: CoachId, draft: &ClubDraft) -> StoreResult<Club> {
        let club = Club {
            id: ClubId(self.next_club_id.fetch_add(1, Ordering::SeqCst)),
            nombre: draft.nombre.clone(),
            direccion: draft.direccion.clone(),
            comuna: draft.comuna.clone(),
            id_coach: coach,
        };
        self.clubs.write().unwrap().insert(club.id, club.clone());
        Ok(club)
    }

    fn update_club(
        &self,
        coach: CoachId,
        club_id: ClubId,
        draft: &ClubDraft,
    ) -> StoreResult<Club> {
        let mut clubs = self.clubs.write().unwrap();
        match clubs.get_mut(&club_id) {
            Some(club) if club.id_coach == coach => {
                club.nombre = draft.nombre.clone();
                club.direccion = draft.direccion.clone();
                club.comuna = draft.comuna.clone();
                Ok(club.clone())
            }
            _ => Err(AppError::ClubNotFound),
        }
    }

    fn delete_club(&self, coach: CoachId, club_id: ClubId) -> StoreResult<()> {
        let mut clubs = self.clubs.write().unwrap();
        match clubs.get(&club_id) {
            Some(club) if club.id_coach == coach => {
                clubs.remove(&club_id);
            }
            _ => return Err(AppError::ClubNotFound),
        }

        // Detach students that trained there
        for student in self.students.write().unwrap().values_mut() {
            if student.id_ubicacion == Some(club_id) {
                student.id_ubicacion = None;
            }
        }
        Ok(())
    }

    fn list_students(&self, coach: CoachId) -> StoreResult<Vec<Student>> {
        let mut students: Vec<Student> = self
            .students
            .read()
            .unwrap()
            .values()
            .filter(|s| s.id_coach == coach)
            .cloned()
            .collect();
        students.sort_by(|a, b| a.nombre.cmp(&b.nombre).then(a.id.0.cmp(&b.id.0)));
        Ok(students)
    }

    fn get_student(
        &self,
        coach: CoachId,
        student_id: StudentId,
    ) -> StoreResult<Option<Student>> {
        Ok(self
            .students
            .read()
            .unwrap()
            .get(&student_id)
            .filter(|s| s.id_coach == coach)
            .cloned())
    }

    fn create_student(
        &self,
        coach: CoachId,
        created_by: UserId,
        draft: &StudentDraft,
    ) -> StoreResult<Student> {
        self.check_club(coach, draft.id_ubicacion)?;
        let student = Student {
            id: StudentId(self.next_student_id.fetch_add(1, Ordering::SeqCst)),
            nombre: draft.nombre.clone(),
            apellido: draft.apellido.clone(),
            telefono: draft.telefono.clone(),
            fecha_nacimiento: draft.fecha_nacimiento,
            direccion: draft.direccion.clone(),
            comuna: draft.comuna.clone(),
            genero: draft.genero,
            fecha_primera_clase: draft.fecha_primera_clase,
            id_usuario: created_by,
            id_coach: coach,
            id_ubicacion: draft.id_ubicacion,
            fecha_creacion: Utc::now(),
        };
        self.students
            .write()
            .unwrap()
            .insert(student.id, student.clone());
        Ok(student)
    }

    fn update_student(
        &self,
        coach: CoachId,
        student_id: StudentId,
        draft: &StudentDraft,
    ) -> StoreResult<Student> {
        self.check_club(coach, draft.id_ubicacion)?;
        let mut students = self.students.write().unwrap();
        match students.get_mut(&student_id) {
            Some(student) if student.id_coach == coach => {
                student.nombre = draft.nombre.clone();
                student.apellido = draft.apellido.clone();
                student.telefono = draft.telefono.clone();
                student.fecha_nacimiento = draft.fecha_nacimiento;
                student.direccion = draft.direccion.clone();
                student.comuna = draft.comuna.clone();
                student.genero = draft.genero;
                student.fecha_primera_clase = draft.fecha_primera_clase;
                student.id_ubicacion = draft.id_ubicacion;
                Ok(student.clone())
            }
            _ => Err(AppError::StudentNotFound),
        }
    }

    fn delete_student(&self, coach: CoachId, student_id: StudentId) -> StoreResult<()> {
        let mut students = self.students.write().unwrap();
        match students.get(&student_id) {
            Some(student) if student.id_coach == coach => {
                students.remove(&student_id);
                Ok(())
            }
            _ => Err(AppError::StudentNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coachdesk_core::{Gender, Role};

    fn draft(nombre: &str) -> StudentDraft {
        StudentDraft {
            nombre: nombre.to_string(),
            apellido: "Rojas".to_string(),
            telefono: "+56912345678".to_string(),
            fecha_nacimiento: None,
            direccion: None,
            comuna: None,
            genero: Gender::Femenino,
            fecha_primera_clase: None,
            id_ubicacion: None,
        }
    }

    #[test]
    fn test_coach_account_has_one_role() {
        let store = InMemoryAccountStore::new();

        let coach = store
            .create_coach_account("Coach@Example.com", "hash", "box-central")
            .unwrap();
        let role = store.get_role(coach.user_id).unwrap().unwrap();
        assert_eq!(role.role, Role::Coach);
        assert_eq!(role.coach_id, Some(coach.id));

        let again = store.assign_role(RoleRecord {
            user_id: coach.user_id,
            role: Role::Alumno,
            coach_id: None,
        });
        assert!(matches!(again, Err(AppError::RoleAlreadyAssigned)));

        let user = store.get_user_by_email("coach@example.com").unwrap();
        assert_eq!(user.unwrap().id, coach.user_id);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = InMemoryAccountStore::new();
        store.create_user("a@example.com", "hash", None).unwrap();
        let result = store.create_user("A@example.com", "hash", None);
        assert!(matches!(result, Err(AppError::EmailAlreadyExists)));
    }

    #[test]
    fn test_session_lifecycle() {
        let store = InMemorySessionStore::new();

        let session = store.create(UserId(1), Duration::hours(1)).unwrap();
        assert!(store.get(&session.id).unwrap().is_some());

        store.delete(&session.id).unwrap();
        assert!(store.get(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_cleanup_expired_sessions() {
        let store = InMemorySessionStore::new();
        let stale = store.create(UserId(1), Duration::seconds(-5)).unwrap();
        let fresh = store.create(UserId(2), Duration::hours(1)).unwrap();

        assert_eq!(store.cleanup_expired(Utc::now()).unwrap(), 1);
        assert!(store.get(&stale.id).unwrap().is_none());
        assert!(store.get(&fresh.id).unwrap().is_some());
    }

    #[test]
    fn test_students_scoped_by_coach() {
        let store = InMemoryRosterStore::new();
        let (a, b) = (CoachId(1), CoachId(2));

        let ana = store.create_student(a, UserId(10), &draft("Ana")).unwrap();
        store.create_student(b, UserId(20), &draft("Beto")).unwrap();

        let listed = store.list_students(a).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, ana.id);

        assert!(store.get_student(b, ana.id).unwrap().is_none());
        assert!(matches!(
            store.update_student(b, ana.id, &draft("Hack")),
            Err(AppError::StudentNotFound)
        ));
        assert!(matches!(
            store.delete_student(b, ana.id),
            Err(AppError::StudentNotFound)
        ));
    }

    #[test]
    fn test_student_cannot_use_foreign_club() {
        let store = InMemoryRosterStore::new();
        let club = store
            .create_club(
                CoachId(2),
                &ClubDraft {
                    nombre: "Ajeno".to_string(),
                    direccion: "Calle 1".to_string(),
                    comuna: "Maipú".to_string(),
                },
            )
            .unwrap();

        let mut d = draft("Ana");
        d.id_ubicacion = Some(club.id);
        let result = store.create_student(CoachId(1), UserId(10), &d);
        assert!(matches!(result, Err(AppError::UnknownClub)));
    }

    #[test]
    fn test_deleting_club_detaches_students() {
        let store = InMemoryRosterStore::new();
        let coach = CoachId(1);
        let club = store
            .create_club(
                coach,
                &ClubDraft {
                    nombre: "Central".to_string(),
                    direccion: "Calle 1".to_string(),
                    comuna: "Ñuñoa".to_string(),
                },
            )
            .unwrap();
        let mut d = draft("Ana");
        d.id_ubicacion = Some(club.id);
        let ana = store.create_student(coach, UserId(10), &d).unwrap();

        store.delete_club(coach, club.id).unwrap();

        let ana = store.get_student(coach, ana.id).unwrap().unwrap();
        assert_eq!(ana.id_ubicacion, None);
    }
}
