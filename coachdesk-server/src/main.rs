//! Coach Desk server binary

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coachdesk_server::crypto::hash_password;
use coachdesk_server::{
    create_router, AccountStore, AppState, CoachSeed, Config, InMemoryAccountStore,
    InMemoryRosterStore, InMemorySessionStore, RosterStore, RouteGate, SessionStore, SqliteStore,
    StoreLocation, StoreSessionResolver,
};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coachdesk_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    match config.store_location() {
        StoreLocation::Memory => {
            tracing::warn!("Store not configured, using in-memory store");
            serve(
                &config,
                Arc::new(InMemoryAccountStore::new()),
                Arc::new(InMemorySessionStore::new()),
                Arc::new(InMemoryRosterStore::new()),
            )
            .await
        }
        StoreLocation::Sqlite(path) => {
            let store = Arc::new(SqliteStore::open(&path)?);
            tracing::info!(path = %path, "Opened SQLite store");
            serve(&config, Arc::clone(&store), Arc::clone(&store), store).await
        }
    }
}

async fn serve<A, S, R>(
    config: &Config,
    accounts: Arc<A>,
    sessions: Arc<S>,
    roster: Arc<R>,
) -> Result<()>
where
    A: AccountStore + 'static,
    S: SessionStore + 'static,
    R: RosterStore + 'static,
{
    if let Some(seed) = &config.coach_seed {
        seed_coach(accounts.as_ref(), seed)?;
    }

    let gate_config = config.gate();
    let resolver = StoreSessionResolver::new(
        Arc::clone(&sessions),
        config.store_key.clone().unwrap_or_default(),
        config.session_ttl(),
    );
    let gate = Arc::new(RouteGate::new(gate_config, Arc::new(resolver)));
    if gate.is_enforcing() {
        tracing::info!("Route gate enforcing sessions on /coach and /alumno");
    } else {
        tracing::warn!("COACHDESK_STORE_URL or COACHDESK_STORE_KEY missing, route gate is inert");
    }

    spawn_session_cleanup(Arc::clone(&sessions));

    let state = Arc::new(AppState::new(accounts, sessions, roster, config.session_ttl()));
    let app = create_router(state, gate);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Coach Desk listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the configured coach unless the email is already registered
fn seed_coach<A: AccountStore>(accounts: &A, seed: &CoachSeed) -> Result<()> {
    if accounts.get_user_by_email(&seed.email)?.is_some() {
        tracing::debug!(email = %seed.email, "Seed coach already exists");
        return Ok(());
    }

    let password_hash = hash_password(&seed.password)?;
    let coach = accounts.create_coach_account(&seed.email, &password_hash, &seed.dominio)?;
    tracing::info!(email = %seed.email, coach_id = coach.id.0, dominio = %coach.dominio, "Seeded coach account");

    Ok(())
}

fn spawn_session_cleanup<S: SessionStore + 'static>(sessions: Arc<S>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.cleanup_expired(chrono::Utc::now()) {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Removed expired sessions"),
                Err(err) => tracing::error!(error = %err, "Session cleanup failed"),
            }
        }
    });
}
