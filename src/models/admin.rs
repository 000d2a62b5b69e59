use serde::{Deserialize, Serialize};

use super::generation::{GenerationRecord, GenerationStatistics};

pub const SESSION_COOKIE: &str = "admin_session";
pub const SESSION_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl LoginResponse {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            redirect: None,
        }
    }
}

/// JWT payload stored in the admin session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub success: bool,
    pub statistics: GenerationStatistics,
}

#[derive(Debug, Serialize)]
pub struct RecentGenerationsResponse {
    pub success: bool,
    pub generations: Vec<GenerationRecord>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub deleted: u64,
    pub days: i64,
}
