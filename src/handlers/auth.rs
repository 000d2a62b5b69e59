use crate::config::AppConfig;
use crate::models::admin::{LoginRequest, LoginResponse, SessionClaims, SESSION_COOKIE, SESSION_HOURS};
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

pub const ADMIN_ROLE: &str = "admin";

pub fn login_routes() -> Router {
    Router::new().route("/api/admin/login", post(login))
}

pub fn logout_routes() -> Router {
    Router::new().route("/api/admin/logout", get(logout))
}

pub fn issue_session_token(
    username: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: username.to_string(),
        role: ADMIN_ROLE.to_string(),
        exp: (now + Duration::hours(SESSION_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn verify_session_token(
    token: &str,
    secret: &str,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    if token_data.claims.role != ADMIN_ROLE {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }

    Ok(token_data.claims)
}

/// Checks a login against the configured admin account. A bcrypt hash, when
/// configured, replaces the plain password.
pub fn credentials_match(config: &AppConfig, username: &str, password: &str) -> bool {
    if username != config.admin_username {
        return false;
    }

    match &config.admin_password_hash {
        Some(hash) => verify(password, hash).unwrap_or_else(|e| {
            tracing::error!("❌ ADMIN_PASSWORD_HASH is not a valid bcrypt hash: {}", e);
            false
        }),
        None => password == config.admin_password,
    }
}

fn login_error(status: StatusCode, message: &str) -> Response {
    (status, Json(LoginResponse::rejected(message))).into_response()
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let (username, password) = match payload {
        Some(Json(LoginRequest {
            username: Some(username),
            password: Some(password),
        })) => (username, password),
        _ => {
            return login_error(
                StatusCode::BAD_REQUEST,
                "Please provide username and password",
            )
        }
    };

    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return login_error(
            StatusCode::BAD_REQUEST,
            "Username and password cannot be empty",
        );
    }

    if !credentials_match(&state.config, username, &password) {
        tracing::warn!("🔒 Failed admin login for user '{}'", username);
        return login_error(StatusCode::UNAUTHORIZED, "Invalid username or password");
    }

    let token = match issue_session_token(username, &state.config.jwt_secret) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Error generating session token: {}", e);
            return login_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not start a session");
        }
    };

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.is_production());

    tracing::info!("🔓 Admin '{}' signed in", username);

    (
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            redirect: Some("/admin".to_string()),
        }),
    )
        .into_response()
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/"))
}
