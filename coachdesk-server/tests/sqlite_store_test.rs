//! End-to-end tests over the SQLite store

use std::sync::Arc;

use axum_test::TestServer;
use chrono::Duration;
use coachdesk_core::Gender;
use coachdesk_server::crypto::hash_password;
use coachdesk_server::store::{CoachId, StudentDraft, UserId};
use coachdesk_server::{
    create_router, AccountStore, AppState, GateConfig, RosterStore, RouteGate, SessionStore,
    SqliteStore, StoreSessionResolver,
};
use serde_json::{json, Value};
use tempfile::TempDir;

const STORE_KEY: &str = "pk_sqlite";
const PASSWORD: &str = "secreto123";

fn create_test_store() -> (Arc<SqliteStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coachdesk.db");
    let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
    (Arc::new(store), dir) // Return dir to keep it alive
}

fn create_test_server(store: &Arc<SqliteStore>) -> TestServer {
    let ttl = Duration::hours(1);
    let resolver = StoreSessionResolver::new(Arc::clone(store), STORE_KEY, ttl);
    let gate = Arc::new(RouteGate::new(
        Some(GateConfig::new("sqlite://coachdesk.db", STORE_KEY)),
        Arc::new(resolver),
    ));
    let state = Arc::new(AppState::new(
        Arc::clone(store),
        Arc::clone(store),
        Arc::clone(store),
        ttl,
    ));
    TestServer::new(create_router(state, gate)).expect("Failed to create test server")
}

/// Test: login, club and student management over SQLite
#[tokio::test]
async fn test_roster_flow() {
    let (store, _dir) = create_test_store();
    let hash = hash_password(PASSWORD).unwrap();
    store
        .create_coach_account("coach@studio.cl", &hash, "studio.cl")
        .unwrap();
    let server = create_test_server(&store);

    let response = server.get("/coach/alumnos").await;
    assert_eq!(response.status_code(), 307);

    let response = server
        .post("/auth/login")
        .json(&json!({
            "email": "coach@studio.cl",
            "password": PASSWORD,
            "tab": "coach"
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let session = response
        .maybe_cookie("coachdesk_session")
        .unwrap()
        .value()
        .to_string();
    let session_cookie = || cookie::Cookie::new("coachdesk_session", session.clone());

    let response = server
        .post("/coach/clubs")
        .add_cookie(session_cookie())
        .json(&json!({
            "nombre": "Club Norte",
            "direccion": "Av. Recoleta 100",
            "comuna": "Recoleta"
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    let club: Value = response.json();

    let response = server
        .post("/coach/alumnos")
        .add_cookie(session_cookie())
        .json(&json!({
            "nombre": "Ana",
            "apellido": "Pérez",
            "telefono": "912345678",
            "fecha_primera_clase": "2024-01-10",
            "id_ubicacion": club["id"].to_string()
        }))
        .await;
    assert_eq!(response.status_code(), 201);

    let response = server.get("/coach/alumnos").add_cookie(session_cookie()).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let alumnos = body["alumnos"].as_array().unwrap();
    assert_eq!(alumnos.len(), 1);
    assert_eq!(alumnos[0]["telefono"], "+56912345678");
    assert_eq!(alumnos[0]["fecha_primera_clase"], "2024-01-10");
    assert_eq!(alumnos[0]["ubicacion"]["nombre"], "Club Norte");

    let response = server
        .delete(&format!("/coach/clubs/{}", club["id"]))
        .add_cookie(session_cookie())
        .await;
    assert_eq!(response.status_code(), 200);

    let response = server.get("/coach/alumnos").add_cookie(session_cookie()).await;
    let body: Value = response.json();
    assert!(body["alumnos"][0]["id_ubicacion"].is_null());
}

/// Test: sessions and roster survive reopening the database
#[test]
fn test_data_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coachdesk.db");
    let path = path.to_str().unwrap();

    let (coach_id, session_id) = {
        let store = SqliteStore::open(path).unwrap();
        let coach = store
            .create_coach_account("coach@studio.cl", "hash", "studio.cl")
            .unwrap();
        let session = store.create(coach.user_id, Duration::hours(1)).unwrap();
        store
            .create_student(
                coach.id,
                coach.user_id,
                &StudentDraft {
                    nombre: "Ana".to_string(),
                    apellido: "Pérez".to_string(),
                    telefono: "+56912345678".to_string(),
                    fecha_nacimiento: None,
                    direccion: None,
                    comuna: None,
                    genero: Gender::Femenino,
                    fecha_primera_clase: None,
                    id_ubicacion: None,
                },
            )
            .unwrap();
        (coach.id, session.id)
    };

    let store = SqliteStore::open(path).unwrap();
    assert!(store.get(&session_id).unwrap().is_some());

    let students = store.list_students(coach_id).unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].genero, Gender::Femenino);
    assert!(store.list_students(CoachId(coach_id.0 + 1)).unwrap().is_empty());
}

/// Test: a user holds at most one role
#[test]
fn test_single_role_per_user() {
    let (store, _dir) = create_test_store();

    let user_id = store
        .create_alumno_account("ana@correo.cl", "hash", "+56912345678")
        .unwrap();
    let err = store.create_coach(user_id, "studio.cl").and_then(|coach| {
        store.assign_role(coachdesk_server::store::RoleRecord {
            user_id,
            role: coachdesk_core::Role::Coach,
            coach_id: Some(coach.id),
        })
    });

    assert!(err.is_err());
    assert_eq!(
        store.get_role(user_id).unwrap().unwrap().role,
        coachdesk_core::Role::Alumno
    );
    assert!(store.get_user(UserId(user_id.0 + 100)).unwrap().is_none());
}
