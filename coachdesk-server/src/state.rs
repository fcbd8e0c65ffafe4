//! Application state shared by all handlers

use std::sync::Arc;

use chrono::Duration;

use crate::store::{AccountStore, RosterStore, SessionStore};

pub struct AppState<A, S, R>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    pub accounts: Arc<A>,
    pub sessions: Arc<S>,
    pub roster: Arc<R>,
    /// Sliding lifetime of a login session
    pub session_ttl: Duration,
}

impl<A, S, R> AppState<A, S, R>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    pub fn new(accounts: Arc<A>, sessions: Arc<S>, roster: Arc<R>, session_ttl: Duration) -> Self {
        Self {
            accounts,
            sessions,
            roster,
            session_ttl,
        }
    }
}
