use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const GENERATION_TYPE_IMAGE: &str = "image";
pub const GENERATION_TYPE_VIDEO: &str = "video";
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";

/// Longest prompt kept on a generation record.
pub const MAX_RECORDED_PROMPT_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GenerationRecord {
    pub id: i64,
    pub generation_type: String,
    pub prompt: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub model_name: Option<String>,
    pub generation_time: Option<f64>,
    pub file_count: i32,
}

#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub generation_type: String,
    pub prompt: String,
    pub status: String,
    pub model_name: Option<String>,
    pub generation_time: Option<f64>,
    pub file_count: i32,
}

impl NewGeneration {
    pub fn new(generation_type: &str, prompt: &str, success: bool) -> Self {
        Self {
            generation_type: generation_type.to_string(),
            prompt: truncate_prompt(prompt),
            status: if success { STATUS_SUCCESS } else { STATUS_FAILED }.to_string(),
            model_name: None,
            generation_time: None,
            file_count: 0,
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn with_timing(mut self, seconds: f64, file_count: usize) -> Self {
        self.generation_time = Some(seconds);
        self.file_count = file_count as i32;
        self
    }
}

pub fn truncate_prompt(prompt: &str) -> String {
    prompt.chars().take(MAX_RECORDED_PROMPT_CHARS).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStatistics {
    pub total_generations: i64,
    pub today_generations: i64,
    pub image_generations: i64,
    pub video_generations: i64,
    pub success_rate: f64,
}

impl GenerationStatistics {
    /// Percentage of successful generations, rounded to two decimals.
    pub fn success_rate(success: i64, total: i64) -> f64 {
        if total <= 0 {
            return 0.0;
        }
        let rate = success as f64 / total as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_truncated_by_characters() {
        let long = "貓".repeat(600);
        let record = NewGeneration::new(GENERATION_TYPE_IMAGE, &long, true);
        assert_eq!(record.prompt.chars().count(), MAX_RECORDED_PROMPT_CHARS);
        assert_eq!(record.status, STATUS_SUCCESS);
    }

    #[test]
    fn test_success_rate_rounding() {
        assert_eq!(GenerationStatistics::success_rate(0, 0), 0.0);
        assert_eq!(GenerationStatistics::success_rate(2, 3), 66.67);
        assert_eq!(GenerationStatistics::success_rate(5, 5), 100.0);
    }
}
