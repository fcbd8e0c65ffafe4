//! Route gate middleware
//!
//! Runs on every request. Paths under `/coach` and `/alumno` need a resolved
//! session; anonymous requests there are redirected to the login page. All
//! other paths pass through, carrying whatever cookies the session resolver
//! refreshed.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use coachdesk_core::{Area, LOGIN_PATH};
use tower_cookies::Cookie;

use crate::session::{SessionClient, SessionResolver};

/// The two store values the gate needs to enforce anything
#[derive(Clone)]
pub struct GateConfig {
    store_url: String,
    store_key: String,
}

impl GateConfig {
    pub fn new(store_url: impl Into<String>, store_key: impl Into<String>) -> Self {
        Self {
            store_url: store_url.into(),
            store_key: store_key.into(),
        }
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }

    pub fn store_key(&self) -> &str {
        &self.store_key
    }
}

impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field("store_url", &self.store_url)
            .field("store_key", &"<redacted>")
            .finish()
    }
}

pub struct RouteGate {
    config: Option<GateConfig>,
    resolver: Arc<dyn SessionResolver>,
}

impl RouteGate {
    pub fn new(config: Option<GateConfig>, resolver: Arc<dyn SessionResolver>) -> Self {
        Self { config, resolver }
    }

    pub fn is_enforcing(&self) -> bool {
        self.config.is_some()
    }
}

/// Middleware entry point, installed with `from_fn_with_state`
pub async fn route_gate(
    State(gate): State<Arc<RouteGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(config) = gate.config.as_ref() else {
        return next.run(request).await;
    };

    let mut client = SessionClient::open(config, request.headers());

    let identity = match gate.resolver.get_user(&mut client).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::error!(
                error = %err,
                store = client.store_url(),
                path = %request.uri().path(),
                "Session resolution failed, passing request through"
            );
            return next.run(request).await;
        }
    };

    let view = client.get_all().to_vec();
    let refreshed = client.into_refreshed();

    if identity.is_none() {
        if let Some(area) = Area::protecting(request.uri().path()) {
            tracing::debug!(area = area.as_str(), path = %request.uri().path(), "Redirecting to login");
            let mut response = Redirect::temporary(&login_target(request.uri())).into_response();
            append_cookies(response.headers_mut(), &refreshed);
            return response;
        }
    }

    if !refreshed.is_empty() {
        rewrite_cookie_header(request.headers_mut(), &view);
    }

    let mut response = next.run(request).await;
    append_cookies(response.headers_mut(), &refreshed);
    response
}

/// Login URL carrying the original query string
fn login_target(uri: &Uri) -> String {
    match uri.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", LOGIN_PATH, query),
        _ => LOGIN_PATH.to_string(),
    }
}

/// Replace the request's `Cookie` header with the client's view
fn rewrite_cookie_header(headers: &mut HeaderMap, cookies: &[Cookie<'static>]) {
    headers.remove(COOKIE);
    if cookies.is_empty() {
        return;
    }

    let joined = cookies
        .iter()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect::<Vec<_>>()
        .join("; ");

    match HeaderValue::from_str(&joined) {
        Ok(value) => {
            headers.insert(COOKIE, value);
        }
        Err(err) => tracing::warn!(error = %err, "Dropping unencodable cookie header"),
    }
}

/// Append `Set-Cookie` headers, leaving alone any cookie the response
/// already sets
fn append_cookies(headers: &mut HeaderMap, cookies: &[Cookie<'static>]) {
    let already_set: Vec<String> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse(value).ok())
        .map(|cookie| cookie.name().to_string())
        .collect();

    for cookie in cookies {
        if already_set.iter().any(|name| name == cookie.name()) {
            continue;
        }
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(err) => tracing::warn!(error = %err, name = cookie.name(), "Dropping unencodable cookie"),
        }
    }
}
