use axum::{
    extract::{ConnectInfo, MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

/// Structured access log for every request, keyed by a fresh request id.
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().clone();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_owned())
        .unwrap_or_else(|| "unknown".to_owned());
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %matched_path,
        uri = %uri,
        user_agent = %user_agent,
        remote_addr = %remote_addr,
        "incoming request"
    );

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    match status {
        500..=599 => tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status,
            duration_ms,
            "request completed (server error)"
        ),
        400..=499 => tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status,
            duration_ms,
            "request completed (client error)"
        ),
        300..=399 => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status,
            duration_ms,
            "request completed (redirect)"
        ),
        _ => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status,
            duration_ms,
            "request completed"
        ),
    }

    response
}
