//! Common test utilities for Coach Desk integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Duration;
use coachdesk_server::crypto::hash_password;
use coachdesk_server::store::Coach;
use coachdesk_server::{
    create_router, AccountStore, AppError, AppState, GateConfig, Identity, InMemoryAccountStore,
    InMemoryRosterStore, InMemorySessionStore, ResolveError, RouteGate, SessionClient,
    SessionResolver, StoreSessionResolver,
};
use serde_json::json;

pub const SESSION_COOKIE: &str = "coachdesk_session";
pub const STORE_URL: &str = "memory://";
pub const STORE_KEY: &str = "pk_test_coachdesk";
pub const PASSWORD: &str = "secreto123";

pub struct TestApp {
    pub server: TestServer,
    pub accounts: Arc<InMemoryAccountStore>,
    pub sessions: Arc<InMemorySessionStore>,
    pub roster: Arc<InMemoryRosterStore>,
}

/// Resolver whose store is unreachable
pub struct FailingResolver;

#[async_trait]
impl SessionResolver for FailingResolver {
    async fn get_user(
        &self,
        _client: &mut SessionClient,
    ) -> Result<Option<Identity>, ResolveError> {
        Err(ResolveError::Store(AppError::Internal(
            "store unreachable".to_string(),
        )))
    }
}

pub fn session_ttl() -> Duration {
    Duration::hours(2)
}

fn build(gate_config: Option<GateConfig>, resolver: Option<Arc<dyn SessionResolver>>) -> TestApp {
    build_with_sessions(
        gate_config,
        resolver,
        Arc::new(InMemorySessionStore::new()),
    )
}

fn build_with_sessions(
    gate_config: Option<GateConfig>,
    resolver: Option<Arc<dyn SessionResolver>>,
    sessions: Arc<InMemorySessionStore>,
) -> TestApp {
    let accounts = Arc::new(InMemoryAccountStore::new());
    let roster = Arc::new(InMemoryRosterStore::new());

    let resolver: Arc<dyn SessionResolver> = match resolver {
        Some(resolver) => resolver,
        None => Arc::new(StoreSessionResolver::new(
            Arc::clone(&sessions),
            STORE_KEY,
            session_ttl(),
        )),
    };
    let gate = Arc::new(RouteGate::new(gate_config, resolver));

    let state = Arc::new(AppState::new(
        Arc::clone(&accounts),
        Arc::clone(&sessions),
        Arc::clone(&roster),
        session_ttl(),
    ));

    let app = create_router(state, gate);
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        accounts,
        sessions,
        roster,
    }
}

/// Create a test server with the route gate enforcing
pub fn create_test_server() -> TestApp {
    build(Some(GateConfig::new(STORE_URL, STORE_KEY)), None)
}

/// Create a test server whose gate has no store configured
pub fn create_inert_test_server() -> TestApp {
    build(None, None)
}

/// Create a test server with an enforcing gate and a custom resolver
pub fn create_test_server_with_resolver(resolver: Arc<dyn SessionResolver>) -> TestApp {
    build(Some(GateConfig::new(STORE_URL, STORE_KEY)), Some(resolver))
}

/// Create a test server with a custom resolver over a session store the
/// caller prepared
pub fn create_test_server_with_sessions(
    sessions: Arc<InMemorySessionStore>,
    resolver: Arc<dyn SessionResolver>,
) -> TestApp {
    build_with_sessions(
        Some(GateConfig::new(STORE_URL, STORE_KEY)),
        Some(resolver),
        sessions,
    )
}

/// Create a test server whose gate presents the wrong store key
pub fn create_test_server_with_key(store_key: &str) -> TestApp {
    build(Some(GateConfig::new(STORE_URL, store_key)), None)
}

/// Provision a coach directly in the account store
pub fn seed_coach(app: &TestApp, email: &str, dominio: &str) -> Coach {
    let hash = hash_password(PASSWORD).unwrap();
    app.accounts
        .create_coach_account(email, &hash, dominio)
        .unwrap()
}

/// Log in through the API and return the session cookie value
pub async fn login(server: &TestServer, email: &str, tab: &str) -> String {
    let response = server
        .post("/auth/login")
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "tab": tab,
        }))
        .await;
    assert_eq!(response.status_code(), 200, "login failed: {}", response.text());

    response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string()
}

/// Seed a coach and log in as them
pub async fn coach_session(app: &TestApp, email: &str) -> String {
    seed_coach(app, email, "studio.cl");
    login(&app.server, email, "coach").await
}

/// Register a student through the API and return the session cookie value
pub async fn sign_up_alumno(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/auth/sign-up")
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "repeat_password": PASSWORD,
            "phone": "912345678",
        }))
        .await;
    assert_eq!(response.status_code(), 201, "sign-up failed: {}", response.text());

    response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string()
}

pub fn session_cookie(value: &str) -> cookie::Cookie<'static> {
    cookie::Cookie::new(SESSION_COOKIE, value.to_string())
}
