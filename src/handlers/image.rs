use crate::error::{ApiError, ApiResult};
use crate::google_search_client::SearchError;
use crate::handlers::prompt::require_prompt;
use crate::models::generation::{NewGeneration, GENERATION_TYPE_IMAGE};
use crate::models::media::{ImageGenerationResult, ImageParams};
use crate::models::search::{DownloadRequest, DownloadResponse, SearchOptions, SearchRequest, SearchResponse};
use crate::services::image_generation::{
    ImageGenerator, DALLE_MAX_COUNT, DALLE_QUALITIES, DALLE_SIZES, DALLE_STYLES, IMAGEN_MAX_COUNT,
    IMAGEN_QUALITIES, IMAGEN_SIZES,
};
use crate::services::image_search::search_options;
use crate::services::pricing::{
    calculate_image_cost, pricing_tiers, ImageQuote, ImageQuoteRequest, PricingError,
};
use crate::services::stats::record_quietly;
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

pub fn image_routes() -> Router {
    Router::new()
        .route("/api/image/generate", post(generate_image))
        .route("/api/image/search", post(search_images))
        .route("/api/image/download", post(download_image))
        .route("/api/image/search-options", get(get_search_options))
        .route("/api/image/model-options", get(model_options))
        .route("/api/image/calculate-price", post(calculate_price))
        .route("/api/pricing", get(pricing))
}

#[derive(Debug, Deserialize)]
pub struct ImageGenerateRequest {
    pub prompt: Option<String>,
    pub count: Option<i64>,
    pub quality: Option<String>,
    pub size: Option<String>,
    pub style: Option<String>,
    pub model: Option<String>,
}

/// `dall-e-3`, `openai` or no model go to DALL-E; everything else to Imagen.
pub fn wants_dalle(model: Option<&str>) -> bool {
    matches!(
        model.map(|m| m.trim().to_lowercase()).as_deref(),
        None | Some("") | Some("dall-e-3") | Some("openai")
    )
}

async fn generate_image(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<ImageGenerateRequest>>,
) -> ApiResult<Json<ImageGenerationResult>> {
    let Some(Json(req)) = payload else {
        return Err(ApiError::bad_request("Please provide a prompt"));
    };
    let prompt = require_prompt(req.prompt, state.config.max_prompt_length)?;

    let max_count = state.config.max_image_count as i64;
    let count = req.count.unwrap_or(1);
    if !(1..=max_count).contains(&count) {
        return Err(ApiError::bad_request(format!(
            "Image count must be between 1 and {}",
            max_count
        )));
    }

    let mut params = ImageParams::new(prompt);
    params.count = count as u32;
    if let Some(quality) = req.quality {
        params.quality = quality;
    }
    if let Some(size) = req.size {
        params.size = size;
    }
    if let Some(style) = req.style {
        params.style = style;
    }

    let generator: &Arc<dyn ImageGenerator> = if wants_dalle(req.model.as_deref()) {
        &state.dalle
    } else {
        &state.imagen
    };

    tracing::info!(
        "🖼️ Generating {} image(s) with {}{}",
        params.count,
        generator.display_name(),
        if generator.is_mock() { " (mock)" } else { "" }
    );

    let started = Instant::now();
    let result = generator.generate_images(&params).await;
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
        NewGeneration::new(GENERATION_TYPE_IMAGE, &params.prompt, result.success)
            .with_model(generator.display_name())
            .with_timing(elapsed, result.file_count()),
    )
    .await;

    Ok(Json(result))
}

async fn search_images(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<SearchRequest>>,
) -> ApiResult<Json<SearchResponse>> {
    let Some(Json(req)) = payload else {
        return Err(ApiError::bad_request("Please provide a search keyword"));
    };
    let query = req.validate().map_err(ApiError::BadRequest)?;

    Ok(Json(state.image_search.search(&query).await))
}

async fn download_image(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<DownloadRequest>>,
) -> ApiResult<Json<DownloadResponse>> {
    let req = payload.map(|Json(req)| req);
    let image_url = req
        .as_ref()
        .and_then(|r| r.image_url.as_deref())
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Please provide an image URL"))?;
    let filename = req.as_ref().and_then(|r| r.filename.as_deref());

    match state.image_search.download(image_url, filename).await {
        Ok(response) => Ok(Json(response)),
        Err(SearchError::InvalidContent(msg)) => Err(ApiError::BadRequest(msg)),
        Err(e) => {
            tracing::error!("❌ Image download failed for {}: {}", image_url, e);
            Err(ApiError::upstream(format!("Download failed: {}", e)))
        }
    }
}

async fn get_search_options() -> Json<SearchOptions> {
    Json(search_options())
}

async fn model_options(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "models": [
            {
                "id": "imagen",
                "name": state.imagen.display_name(),
                "provider": "Google Vertex AI",
                "model": state.config.image_gen_model,
                "max_count": IMAGEN_MAX_COUNT,
                "sizes": IMAGEN_SIZES,
                "qualities": IMAGEN_QUALITIES,
                "mock_mode": state.imagen.is_mock(),
            },
            {
                "id": "dall-e-3",
                "name": state.dalle.display_name(),
                "provider": "OpenAI",
                "model": state.config.openai_image_model,
                "max_count": DALLE_MAX_COUNT,
                "sizes": DALLE_SIZES,
                "qualities": DALLE_QUALITIES,
                "styles": DALLE_STYLES,
                "mock_mode": state.dalle.is_mock(),
            }
        ],
        "default": "dall-e-3",
    }))
}

async fn calculate_price(
    payload: Option<Json<ImageQuoteRequest>>,
) -> Result<Json<ImageQuote>, (StatusCode, Json<PricingError>)> {
    let Some(Json(req)) = payload else {
        return Err((StatusCode::BAD_REQUEST, Json(PricingError::missing_params())));
    };

    calculate_image_cost(&req)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))
}

async fn pricing() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "pricing": pricing_tiers() }))
}
