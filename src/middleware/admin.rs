use crate::handlers::auth::verify_session_token;
use crate::models::admin::{SessionClaims, SESSION_COOKIE};
use crate::AppState;
use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;
use std::sync::Arc;

/// Reads the admin session from the cookie, or from a Bearer header.
pub fn current_session(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Option<SessionClaims> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim().to_string())
        })?;

    match verify_session_token(&token, &state.config.jwt_secret) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!("Admin session rejected: {}", e);
            None
        }
    }
}

pub async fn admin_middleware(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    match current_session(&state, &jar, request.headers()) {
        Some(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        None => Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin privileges required" })),
        )),
    }
}
