use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Fixed-window request counter per client IP.
#[derive(Clone)]
pub struct RateLimiter {
    // IP -> (request_count, window_start)
    clients: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window_duration: Duration::from_secs(window_seconds),
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, 60)
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_duration.as_secs()
    }

    pub fn check_rate_limit(&self, client_ip: &str) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        match clients.get_mut(client_ip) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) > self.window_duration {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                clients.insert(client_ip.to_string(), (1, now));
                true
            }
        }
    }

    pub fn cleanup_expired(&self) {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        clients.retain(|_, (_, window_start)| now.duration_since(*window_start) <= self.window_duration);
    }
}

fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rejects with 429 once the caller's IP has used up its window.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let ip = client_ip(&request);

    if !limiter.check_rate_limit(&ip) {
        tracing::warn!("Rate limit exceeded for IP: {}", ip);
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "retry_after": limiter.window_seconds()
            })),
        ));
    }

    if rand::random::<u8>() < 10 {
        limiter.cleanup_expired();
    }

    Ok(next.run(request).await)
}
