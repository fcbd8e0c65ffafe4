//! Session resolution
//!
//! The route gate asks a [`SessionResolver`] who is behind a request. The
//! resolver works through a [`SessionClient`] scoped to that request: it
//! reads the request cookies from it and queues any cookie it wants set or
//! refreshed, which the gate then mirrors onto the request and response.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use thiserror::Error;
use tower_cookies::cookie::{time, SameSite};
use tower_cookies::{Cookie, Cookies};

use crate::error::AppError;
use crate::gate::GateConfig;
use crate::store::{Session, SessionId, SessionStore, StoreResult, UserId};

pub const SESSION_COOKIE: &str = "coachdesk_session";

/// The authenticated user behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub session_id: SessionId,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("session client key rejected by the store")]
    InvalidClientKey,

    #[error("session store failure: {0}")]
    Store(#[from] AppError),
}

/// Session client bound to one request's cookies
#[derive(Debug)]
pub struct SessionClient {
    store_url: String,
    public_key: String,
    cookies: Vec<Cookie<'static>>,
    refreshed: Vec<Cookie<'static>>,
}

impl SessionClient {
    pub fn open(config: &GateConfig, headers: &HeaderMap) -> Self {
        Self {
            store_url: config.store_url().to_string(),
            public_key: config.store_key().to_string(),
            cookies: request_cookies(headers),
            refreshed: Vec::new(),
        }
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.iter().rev().find(|c| c.name() == name)
    }

    pub fn get_all(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// Queue cookies to set; later reads through this client see them too.
    /// An empty value removes the cookie.
    pub fn set_all<I>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = Cookie<'static>>,
    {
        for cookie in cookies {
            self.cookies.retain(|c| c.name() != cookie.name());
            if !cookie.value().is_empty() {
                self.cookies.push(cookie.clone());
            }
            self.refreshed.retain(|c| c.name() != cookie.name());
            self.refreshed.push(cookie);
        }
    }

    /// Cookies queued during resolution
    pub fn into_refreshed(self) -> Vec<Cookie<'static>> {
        self.refreshed
    }
}

/// Parse every cookie carried by the request's `Cookie` headers
pub fn request_cookies(headers: &HeaderMap) -> Vec<Cookie<'static>> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .map(Cookie::into_owned)
        .collect()
}

/// Resolves the identity behind a request
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// `Ok(None)` means unauthenticated; errors are for failures only
    async fn get_user(&self, client: &mut SessionClient)
        -> Result<Option<Identity>, ResolveError>;
}

/// Resolver backed by the service's own session store.
///
/// Valid sessions slide: each resolution pushes the expiry out by the
/// session TTL and re-issues the cookie.
pub struct StoreSessionResolver<S> {
    store: Arc<S>,
    public_key: String,
    ttl: Duration,
}

impl<S: SessionStore> StoreSessionResolver<S> {
    pub fn new(store: Arc<S>, public_key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            public_key: public_key.into(),
            ttl,
        }
    }
}

#[async_trait]
impl<S: SessionStore> SessionResolver for StoreSessionResolver<S> {
    async fn get_user(
        &self,
        client: &mut SessionClient,
    ) -> Result<Option<Identity>, ResolveError> {
        if client.public_key() != self.public_key {
            return Err(ResolveError::InvalidClientKey);
        }

        let Some(cookie) = client.get(SESSION_COOKIE) else {
            return Ok(None);
        };
        let session_id = SessionId(cookie.value().to_string());

        let Some(session) = self.store.get(&session_id)? else {
            return Ok(None);
        };

        let now = Utc::now();
        if session.is_expired(now) {
            self.store.delete(&session_id)?;
            client.set_all([removal_cookie()]);
            return Ok(None);
        }

        self.store.touch(&session_id, now + self.ttl)?;
        client.set_all([session_cookie(&session_id.0, self.ttl)]);

        Ok(Some(Identity {
            user_id: session.user_id,
            session_id,
        }))
    }
}

/// Build the session cookie
pub fn session_cookie(session_id: &str, ttl: Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

/// Build a cookie that removes the session cookie
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Helper to get the current, unexpired session from cookies
pub fn current_session<S: SessionStore + ?Sized>(
    cookies: &Cookies,
    session_store: &S,
) -> StoreResult<Option<Session>> {
    let Some(cookie) = cookies.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let session = session_store.get(&SessionId(cookie.value().to_string()))?;
    Ok(session.filter(|s| !s.is_expired(Utc::now())))
}

/// Helper to set session cookie
pub fn set_session_cookie(cookies: &Cookies, session_id: &str, ttl: Duration) {
    cookies.add(session_cookie(session_id, ttl));
}

/// Helper to clear session cookie
pub fn clear_session_cookie(cookies: &Cookies) {
    cookies.add(removal_cookie());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySessionStore;
    use axum::http::HeaderValue;

    const KEY: &str = "pk_test";

    fn client(cookie_header: Option<&str>) -> SessionClient {
        let mut headers = HeaderMap::new();
        if let Some(value) = cookie_header {
            headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        }
        SessionClient::open(&GateConfig::new("memory://", KEY), &headers)
    }

    fn resolver(store: &Arc<InMemorySessionStore>) -> StoreSessionResolver<InMemorySessionStore> {
        StoreSessionResolver::new(Arc::clone(store), KEY, Duration::hours(2))
    }

    #[test]
    fn test_request_cookies_parsed() {
        let client = client(Some("a=1; coachdesk_session=abc; b=2"));
        assert_eq!(client.get_all().len(), 3);
        assert_eq!(client.get(SESSION_COOKIE).unwrap().value(), "abc");
    }

    #[test]
    fn test_set_all_updates_view_and_queue() {
        let mut client = client(Some("coachdesk_session=old"));
        client.set_all([session_cookie("new", Duration::hours(1))]);
        assert_eq!(client.get(SESSION_COOKIE).unwrap().value(), "new");

        client.set_all([removal_cookie()]);
        assert!(client.get(SESSION_COOKIE).is_none());

        let refreshed = client.into_refreshed();
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].value(), "");
    }

    #[tokio::test]
    async fn test_no_cookie_is_anonymous() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut client = client(None);

        let identity = resolver(&store).get_user(&mut client).await.unwrap();
        assert!(identity.is_none());
        assert!(client.into_refreshed().is_empty());
    }

    #[tokio::test]
    async fn test_valid_session_slides() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create(UserId(7), Duration::minutes(5)).unwrap();
        let mut client = client(Some(&format!("coachdesk_session={}", session.id.0)));

        let identity = resolver(&store).get_user(&mut client).await.unwrap().unwrap();
        assert_eq!(identity.user_id, UserId(7));

        let stored = store.get(&session.id).unwrap().unwrap();
        assert!(stored.expires_at > session.expires_at + Duration::minutes(60));

        let refreshed = client.into_refreshed();
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].value(), session.id.0);
        assert_eq!(refreshed[0].max_age(), Some(time::Duration::hours(2)));
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create(UserId(7), Duration::seconds(-1)).unwrap();
        let mut client = client(Some(&format!("coachdesk_session={}", session.id.0)));

        let identity = resolver(&store).get_user(&mut client).await.unwrap();
        assert!(identity.is_none());
        assert!(store.get(&session.id).unwrap().is_none());
        assert_eq!(client.into_refreshed()[0].value(), "");
    }

    #[tokio::test]
    async fn test_wrong_client_key_is_an_error() {
        let store = Arc::new(InMemorySessionStore::new());
        let resolver = StoreSessionResolver::new(store, "pk_other", Duration::hours(1));
        let mut client = client(None);

        let result = resolver.get_user(&mut client).await;
        assert!(matches!(result, Err(ResolveError::InvalidClientKey)));
    }
}
