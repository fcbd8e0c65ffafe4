//! Coach Desk Server
//!
//! Coaching-studio backend: coaches log in, manage their students and the
//! clubs they train at, and students get a portal of their own. A route gate
//! keeps the `/coach` and `/alumno` areas behind a session.

pub mod config;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

pub use config::{CoachSeed, Config, StoreLocation};
pub use error::AppError;
pub use gate::{route_gate, GateConfig, RouteGate};
pub use routes::create_router;
pub use session::{Identity, ResolveError, SessionClient, SessionResolver, StoreSessionResolver};
pub use state::AppState;
pub use store::{
    AccountStore, InMemoryAccountStore, InMemoryRosterStore, InMemorySessionStore, RosterStore,
    SessionStore, SqliteStore,
};
