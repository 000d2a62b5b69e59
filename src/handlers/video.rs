use crate::error::{ApiError, ApiResult};
use crate::handlers::prompt::require_prompt;
use crate::models::generation::{NewGeneration, GENERATION_TYPE_VIDEO};
use crate::models::media::{
    AspectRatio, PersonGeneration, VideoGenerationResult, VideoParams, MAX_VIDEO_DURATION,
    MIN_VIDEO_DURATION,
};
use crate::services::pricing::{calculate_video_cost, PricingError, VideoQuote, VideoQuoteRequest};
use crate::services::stats::record_quietly;
use crate::services::video_generation::VideoGenerator;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

pub fn video_routes() -> Router {
    Router::new()
        .route("/api/video/generate", post(generate_video))
        .route("/api/video/model-options", get(model_options))
        .route("/api/video/calculate-price", post(calculate_price))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGenerateRequest {
    pub prompt: Option<String>,
    pub aspect_ratio: Option<String>,
    pub duration: Option<i64>,
    pub person_generation: Option<String>,
    pub model: Option<String>,
}

impl VideoGenerateRequest {
    /// Validates the optional settings on top of an already checked prompt.
    pub fn into_params(self, prompt: String) -> ApiResult<VideoParams> {
        let mut params = VideoParams::new(prompt);

        if let Some(ratio) = self.aspect_ratio.as_deref() {
            params.aspect_ratio = AspectRatio::parse(ratio)
                .ok_or_else(|| ApiError::bad_request("aspectRatio must be 16:9 or 9:16"))?;
        }

        if let Some(duration) = self.duration {
            let allowed = MIN_VIDEO_DURATION as i64..=MAX_VIDEO_DURATION as i64;
            if !allowed.contains(&duration) {
                return Err(ApiError::bad_request(format!(
                    "duration must be between {} and {} seconds",
                    MIN_VIDEO_DURATION, MAX_VIDEO_DURATION
                )));
            }
            params.duration = duration as u32;
        }

        if let Some(person) = self.person_generation.as_deref() {
            params.person_generation = PersonGeneration::parse(person).ok_or_else(|| {
                ApiError::bad_request("personGeneration must be disallow or allow_adult")
            })?;
        }

        Ok(params)
    }
}

async fn generate_video(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<VideoGenerateRequest>>,
) -> ApiResult<Json<VideoGenerationResult>> {
    let Some(Json(mut req)) = payload else {
        return Err(ApiError::bad_request("Please provide a prompt"));
    };
    let prompt = require_prompt(req.prompt.take(), state.config.max_prompt_length)?;
    let use_openai = matches!(
        req.model.as_deref().map(|m| m.trim().to_lowercase()).as_deref(),
        Some("openai")
    );
    let params = req.into_params(prompt)?;

    let generator: &Arc<dyn VideoGenerator> = if use_openai {
        &state.openai_video
    } else {
        &state.veo
    };

    tracing::info!(
        "🎬 Generating {}s {} video with {}",
        params.duration,
        params.aspect_ratio.as_str(),
        generator.display_name()
    );

    let started = Instant::now();
    let result = generator.generate_videos(&params).await;
    let elapsed = started.elapsed().as_secs_f64();

    if !result.success {
        tracing::warn!(
            "⚠️ {} generation failed: {}",
            generator.display_name(),
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    record_quietly(
        &state.stats,
        NewGeneration::new(GENERATION_TYPE_VIDEO, &params.prompt, result.success)
            .with_model(generator.display_name())
            .with_timing(elapsed, result.file_count()),
    )
    .await;

    Ok(Json(result))
}

async fn model_options(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "models": [
            {
                "id": "veo",
                "name": state.veo.display_name(),
                "provider": "Google Vertex AI",
                "model": state.config.video_gen_model,
                "mock_mode": state.veo.is_mock(),
            },
            {
                "id": "openai",
                "name": state.openai_video.display_name(),
                "provider": "OpenAI",
                "model": state.config.openai_video_model,
                "mock_mode": state.openai_video.is_mock(),
            }
        ],
        "aspect_ratios": [AspectRatio::Landscape.as_str(), AspectRatio::Portrait.as_str()],
        "durations": (MIN_VIDEO_DURATION..=MAX_VIDEO_DURATION).collect::<Vec<_>>(),
        "person_generation": [PersonGeneration::Disallow.as_str(), PersonGeneration::AllowAdult.as_str()],
        "max_count": state.config.max_video_count,
        "default": "veo",
    }))
}

async fn calculate_price(
    payload: Option<Json<VideoQuoteRequest>>,
) -> Result<Json<VideoQuote>, (StatusCode, Json<PricingError>)> {
    let Some(Json(req)) = payload else {
        return Err((StatusCode::BAD_REQUEST, Json(PricingError::missing_params())));
    };

    calculate_video_cost(&req)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))
}
