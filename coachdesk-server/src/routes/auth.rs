//! Login, sign-up and logout endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use coachdesk_core::{route_after_login, validate_phone, Area, Role};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::crypto::{hash_password, verify_password};
use crate::error::AppError;
use crate::session::{clear_session_cookie, current_session, set_session_cookie};
use crate::state::AppState;
use crate::store::{AccountStore, RosterStore, SessionStore};

const SIGN_UP_SUCCESS_PATH: &str = "/auth/sign-up-success";

/// bcrypt ignores everything past 72 bytes
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 72;

/// GET /auth/login
pub async fn login_page() -> Html<&'static str> {
    Html(
        "<!doctype html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><title>Iniciar sesión</title></head>\n\
         <body><h1>Iniciar sesión</h1><p>Envía tus credenciales a <code>POST /auth/login</code>.</p></body>\n</html>\n",
    )
}

/// GET /auth/sign-up-success
pub async fn sign_up_success() -> Html<&'static str> {
    Html(
        "<!doctype html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><title>Registro exitoso</title></head>\n\
         <body><h1>¡Gracias por registrarte!</h1><p>Ya puedes iniciar sesión como alumno.</p></body>\n</html>\n",
    )
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// The login tab the user picked
    pub tab: Area,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub redirect: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominio: Option<String>,
}

/// POST /auth/login
pub async fn login<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let user = state
        .accounts
        .get_user_by_email(req.email.trim())?
        .ok_or(AppError::InvalidCredentials)?;

    let valid = verify_password(&req.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AppError::InvalidCredentials);
    }

    let role = state.accounts.get_role(user.id)?.map(|r| r.role);
    let redirect = route_after_login(role, req.tab).inspect_err(|err| {
        tracing::warn!(user_id = user.id.0, tab = req.tab.as_str(), error = %err, "Login refused");
    })?;

    let dominio = match req.tab {
        Area::Coach => {
            let coach = state
                .accounts
                .get_coach_by_user(user.id)?
                .ok_or(AppError::CoachNotFound)?;
            Some(coach.dominio)
        }
        Area::Alumno => None,
    };

    let session = state.sessions.create(user.id, state.session_ttl)?;
    set_session_cookie(&cookies, &session.id.0, state.session_ttl);

    tracing::info!(user_id = user.id.0, tab = req.tab.as_str(), "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        redirect: redirect.to_string(),
        role: req.tab.required_role(),
        dominio,
    }))
}

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub repeat_password: String,
    pub phone: String,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub success: bool,
    pub redirect: String,
    pub user_id: u64,
}

/// POST /auth/sign-up
///
/// Self-registration always creates a student account.
pub async fn sign_up<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("El correo no es válido".to_string()));
    }

    if req.password != req.repeat_password {
        return Err(AppError::Validation("Las contraseñas no coinciden".to_string()));
    }

    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&req.password.len()) {
        return Err(AppError::Validation(format!(
            "La contraseña debe tener entre {} y {} caracteres",
            PASSWORD_MIN, PASSWORD_MAX
        )));
    }

    let phone = validate_phone(&req.phone)?;

    let password_hash =
        hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;
    let user_id = state
        .accounts
        .create_alumno_account(&email, &password_hash, &phone)?;

    let session = state.sessions.create(user_id, state.session_ttl)?;
    set_session_cookie(&cookies, &session.id.0, state.session_ttl);

    tracing::info!(user_id = user_id.0, "Student account created");

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            redirect: SIGN_UP_SUCCESS_PATH.to_string(),
            user_id: user_id.0,
        }),
    ))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /auth/logout
pub async fn logout<A, S, R>(
    State(state): State<Arc<AppState<A, S, R>>>,
    cookies: Cookies,
) -> Result<Json<LogoutResponse>, AppError>
where
    A: AccountStore,
    S: SessionStore,
    R: RosterStore,
{
    if let Some(session) = current_session(&cookies, state.sessions.as_ref())? {
        state.sessions.delete(&session.id)?;
        tracing::info!(user_id = session.user_id.0, "User logged out");
    }

    clear_session_cookie(&cookies);

    Ok(Json(LogoutResponse { success: true }))
}
