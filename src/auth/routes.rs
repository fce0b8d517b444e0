//! Authentication endpoints
//!
//! Signup, login, logout, and current-identity lookup. Sessions are
//! HMAC-signed tokens delivered as a cookie and also returned in the
//! response body for Bearer-token clients.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::middleware::CurrentUser;
use super::password::{hash_password, verify_password};
use super::session::{Session, create_session_token};
use crate::AppState;
use crate::api::{ProfileResponse, SessionResponse};
use crate::data::{EntityId, Role, UserProfile};
use crate::error::AppError;
use crate::metrics::USERS_TOTAL;

const MIN_PASSWORD_CHARS: usize = 8;
const MAX_USERNAME_CHARS: usize = 30;

/// Signup request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create auth router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/registro", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/yo", get(me))
}

fn validate_register_request(req: &RegisterRequest) -> Result<(String, String), AppError> {
    let username = req.username.trim().to_string();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_CHARS {
        return Err(AppError::Validation(format!(
            "el nombre de usuario es obligatorio (máximo {} caracteres)",
            MAX_USERNAME_CHARS
        )));
    }

    let email = req.email.trim().to_ascii_lowercase();
    if !email.contains('@') || email.len() < 3 {
        return Err(AppError::Validation("el email no es válido".to_string()));
    }

    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::Validation(format!(
            "la contraseña debe tener al menos {} caracteres",
            MIN_PASSWORD_CHARS
        )));
    }

    Ok((username, email))
}

fn build_session(state: &AppState, user: &UserProfile) -> Result<(Session, String), AppError> {
    let now = Utc::now();
    let session = Session {
        user_id: user.id.clone(),
        email: user.email.clone(),
        created_at: now,
        expires_at: now + Duration::seconds(state.config.auth.session_max_age),
    };
    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    Ok((session, token))
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build(("session", token))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .build()
}

/// POST /auth/registro
///
/// Creates a citizen profile and signs the caller in.
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let (username, email) = validate_register_request(&req)?;

    let user = UserProfile {
        id: EntityId::new().0,
        username,
        email,
        password_hash: hash_password(&req.password)?,
        role: Role::Citizen.as_str().to_string(),
        points: 0,
        created_at: Utc::now(),
    };

    if !state.db.insert_user(&user).await? {
        return Err(AppError::Validation(
            "el nombre de usuario o el email ya está en uso".to_string(),
        ));
    }
    USERS_TOTAL.inc();

    tracing::info!(username = %user.username, "User registered");

    let (_, token) = build_session(&state, &user)?;
    let jar = jar.add(session_cookie(&state, token.clone()));

    Ok((
        jar,
        Json(SessionResponse {
            token,
            perfil: ProfileResponse::from(&user),
        }),
    ))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let email = req.email.trim().to_ascii_lowercase();

    // Same rejection for unknown email and wrong password
    let user = state
        .db
        .get_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    tracing::info!(username = %user.username, "User logged in");

    let (_, token) = build_session(&state, &user)?;
    let jar = jar.add(session_cookie(&state, token.clone()));

    Ok((
        jar,
        Json(SessionResponse {
            token,
            perfil: ProfileResponse::from(&user),
        }),
    ))
}

/// POST /auth/logout
///
/// Sessions are stateless signed tokens; logout just clears the
/// cookie on the client.
async fn logout(
    _user: CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    let jar = jar.remove(Cookie::from("session"));
    Ok((jar, Json(serde_json::json!({ "success": true }))))
}

/// GET /auth/yo
///
/// Returns the caller's profile (role and points re-read from storage).
async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = user.load_profile(&state).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}
