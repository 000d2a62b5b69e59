use crate::error::{ApiError, ApiResult};
use crate::models::prompt::{
    AnalyzeRequest, ContentType, OptimizeResponse, PromptRequest, TranslateResponse,
};
use crate::services::prompt_analyzer::{
    extract_key_elements, validate_prompt_length, AnalyzeError,
};
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::json;
use std::sync::Arc;

pub fn prompt_routes() -> Router {
    Router::new()
        .route("/api/image/optimize-prompt", post(optimize_image_prompt))
        .route("/api/video/optimize-prompt", post(optimize_video_prompt))
        .route("/api/image/translate-prompt", post(translate_image_prompt))
        .route("/api/video/translate-prompt", post(translate_video_prompt))
        .route("/api/prompt/analyze", post(analyze_prompt))
        .route("/api/prompt/check-length", post(check_prompt_length))
}

/// Pulls a non-empty prompt no longer than `max_len` characters out of the body.
pub fn require_prompt(prompt: Option<String>, max_len: usize) -> ApiResult<String> {
    let prompt = prompt.ok_or_else(|| ApiError::bad_request("Please provide a prompt"))?;
    let prompt = prompt.trim();

    if prompt.is_empty() {
        return Err(ApiError::bad_request("Prompt cannot be empty"));
    }
    if prompt.chars().count() > max_len {
        return Err(ApiError::bad_request(format!(
            "Prompt cannot exceed {} characters",
            max_len
        )));
    }

    Ok(prompt.to_string())
}

async fn optimize(
    state: &AppState,
    payload: Option<Json<PromptRequest>>,
    content_type: ContentType,
) -> ApiResult<Json<OptimizeResponse>> {
    let prompt = require_prompt(
        payload.and_then(|Json(req)| req.prompt),
        state.config.max_prompt_length,
    )?;

    state
        .optimizer
        .optimize(&prompt, content_type)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("❌ {} prompt optimization failed: {}", content_type.as_str(), e);
            ApiError::upstream(format!("Optimization failed: {}", e))
        })
}

async fn translate(
    state: &AppState,
    payload: Option<Json<PromptRequest>>,
    content_type: ContentType,
) -> ApiResult<Json<TranslateResponse>> {
    let prompt = require_prompt(
        payload.and_then(|Json(req)| req.prompt),
        state.config.max_prompt_length,
    )?;

    state
        .optimizer
        .translate(&prompt, content_type)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("❌ {} prompt translation failed: {}", content_type.as_str(), e);
            ApiError::upstream(format!("Translation failed: {}", e))
        })
}

async fn optimize_image_prompt(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<PromptRequest>>,
) -> ApiResult<Json<OptimizeResponse>> {
    optimize(&state, payload, ContentType::Image).await
}

async fn optimize_video_prompt(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<PromptRequest>>,
) -> ApiResult<Json<OptimizeResponse>> {
    optimize(&state, payload, ContentType::Video).await
}

async fn translate_image_prompt(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<PromptRequest>>,
) -> ApiResult<Json<TranslateResponse>> {
    translate(&state, payload, ContentType::Image).await
}

async fn translate_video_prompt(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<PromptRequest>>,
) -> ApiResult<Json<TranslateResponse>> {
    translate(&state, payload, ContentType::Video).await
}

fn analyze_error_response(err: AnalyzeError) -> Response {
    let mut body = json!({
        "success": false,
        "error": err.message(),
        "error_code": err.code(),
    });
    if let AnalyzeError::PromptTooLong { current_length } = err {
        body["current_length"] = json!(current_length);
    }
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

async fn analyze_prompt(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<AnalyzeRequest>>,
) -> ApiResult<Response> {
    let Some(Json(req)) = payload else {
        return Err(ApiError::bad_request("Please provide a prompt"));
    };

    let content_type = match req.content_type.as_deref() {
        None => ContentType::Image,
        Some(value) => ContentType::parse(value)
            .ok_or_else(|| ApiError::bad_request("type must be 'image' or 'video'"))?,
    };

    let prompt = req.prompt.unwrap_or_default();
    match state.analyzer.analyze_safety(&prompt, content_type).await {
        Ok(analysis) => {
            let mut body = serde_json::to_value(&analysis)
                .map_err(|e| ApiError::internal(format!("Failed to encode analysis: {}", e)))?;
            body["success"] = json!(true);
            Ok(Json(body).into_response())
        }
        Err(e) => Ok(analyze_error_response(e)),
    }
}

async fn check_prompt_length(payload: Option<Json<PromptRequest>>) -> ApiResult<Json<serde_json::Value>> {
    let prompt = payload
        .and_then(|Json(req)| req.prompt)
        .ok_or_else(|| ApiError::bad_request("Please provide a prompt"))?;

    Ok(Json(json!({
        "success": true,
        "length_check": validate_prompt_length(&prompt),
        "key_elements": extract_key_elements(&prompt),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_prompt() {
        assert_eq!(require_prompt(Some("  cat ".into()), 10).unwrap(), "cat");
        assert!(matches!(require_prompt(None, 10), Err(ApiError::BadRequest(_))));
        assert!(matches!(require_prompt(Some("   ".into()), 10), Err(ApiError::BadRequest(_))));
        let err = require_prompt(Some("x".repeat(11)), 10).unwrap_err();
        assert_eq!(err.to_string(), "Prompt cannot exceed 10 characters");
    }

    #[test]
    fn test_too_long_analysis_reports_length() {
        let response = analyze_error_response(AnalyzeError::PromptTooLong { current_length: 2001 });
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
