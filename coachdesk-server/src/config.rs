//! Service configuration
//!
//! Read from the environment. The two store values double as the switch for
//! the route gate: when either is missing the gate stays inert and the
//! service runs on an in-memory store.

use std::fmt;

use chrono::Duration;

use crate::gate::GateConfig;

/// Longest accepted session lifetime, ten years
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// Where the relational store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    Sqlite(String),
}

impl StoreLocation {
    /// Parse `memory://`, `sqlite://<path>` or a bare file path
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        if url == "memory" || url.starts_with("memory:") {
            StoreLocation::Memory
        } else if let Some(path) = url.strip_prefix("sqlite://") {
            StoreLocation::Sqlite(path.to_string())
        } else if let Some(path) = url.strip_prefix("sqlite:") {
            StoreLocation::Sqlite(path.to_string())
        } else {
            StoreLocation::Sqlite(url.to_string())
        }
    }
}

/// Coach account created at startup
#[derive(Clone)]
pub struct CoachSeed {
    pub email: String,
    pub password: String,
    pub dominio: String,
}

impl fmt::Debug for CoachSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoachSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("dominio", &self.dominio)
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Store endpoint URL (`COACHDESK_STORE_URL`)
    pub store_url: Option<String>,

    /// Store public key presented by session clients (`COACHDESK_STORE_KEY`)
    pub store_key: Option<String>,

    /// Sliding session lifetime
    pub session_ttl_hours: i64,

    /// Optional coach provisioned at startup
    pub coach_seed: Option<CoachSeed>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("store_url", &self.store_url)
            .field("store_key", &self.store_key.as_ref().map(|_| "<redacted>"))
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("coach_seed", &self.coach_seed)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            store_url: None,
            store_key: None,
            session_ttl_hours: 24 * 7,
            coach_seed: None,
        }
    }
}

impl Config {
    /// Create config from environment variables
    ///
    /// Optional:
    /// - COACHDESK_PORT (default: 3000)
    /// - COACHDESK_STORE_URL, COACHDESK_STORE_KEY (gate switch)
    /// - COACHDESK_SESSION_TTL_HOURS (default: 168, at most ten years)
    /// - COACHDESK_COACH_EMAIL, COACHDESK_COACH_PASSWORD, COACHDESK_COACH_DOMAIN
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup; empty values count as absent
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let defaults = Self::default();

        let coach_seed = match (
            get("COACHDESK_COACH_EMAIL"),
            get("COACHDESK_COACH_PASSWORD"),
            get("COACHDESK_COACH_DOMAIN"),
        ) {
            (Some(email), Some(password), Some(dominio)) => Some(CoachSeed {
                email,
                password,
                dominio,
            }),
            _ => None,
        };

        Self {
            port: get("COACHDESK_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            store_url: get("COACHDESK_STORE_URL"),
            store_key: get("COACHDESK_STORE_KEY"),
            session_ttl_hours: get("COACHDESK_SESSION_TTL_HOURS")
                .and_then(|s| s.parse().ok())
                .filter(|h: &i64| (1..=MAX_SESSION_TTL_HOURS).contains(h))
                .unwrap_or(defaults.session_ttl_hours),
            coach_seed,
        }
    }

    /// Gate configuration, present only when both store values are set
    pub fn gate(&self) -> Option<GateConfig> {
        match (&self.store_url, &self.store_key) {
            (Some(url), Some(key)) => Some(GateConfig::new(url, key)),
            _ => None,
        }
    }

    /// Store to open; in-memory unless the store is fully configured
    pub fn store_location(&self) -> StoreLocation {
        match self.gate() {
            Some(gate) => StoreLocation::parse(gate.store_url()),
            None => StoreLocation::Memory,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }
}
