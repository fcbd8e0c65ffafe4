//! HTTP routes for Coach Desk

mod alumnos;
mod auth;
mod clubs;
mod coach;
mod portal;
mod session;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::gate::{route_gate, RouteGate};
use crate::state::AppState;
use crate::store::{AccountStore, RosterStore, SessionStore};

/// Create the router with all routes.
///
/// The gate wraps the cookie manager so handlers see the request cookies as
/// the gate rewrote them.
pub fn create_router<A, S, R>(state: Arc<AppState<A, S, R>>, gate: Arc<RouteGate>) -> Router
where
    A: AccountStore + 'static,
    S: SessionStore + 'static,
    R: RosterStore + 'static,
{
    Router::new()
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-up-success", get(auth::sign_up_success))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(session::get_session_context))
        .route("/coach", get(coach::get_profile))
        .route("/coach/alumnos", get(alumnos::list_students).post(alumnos::create_student))
        .route(
            "/coach/alumnos/{id}",
            put(alumnos::update_student).delete(alumnos::delete_student),
        )
        .route("/coach/clubs", get(clubs::list_clubs).post(clubs::create_club))
        .route("/coach/clubs/{id}", put(clubs::update_club).delete(clubs::delete_club))
        .route("/alumno", get(portal::get_home))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(gate, route_gate))
                .layer(CookieManagerLayer::new()),
        )
        .with_state(state)
}
