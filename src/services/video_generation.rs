// src/services/video_generation.rs
use async_trait::async_trait;
use base64::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::models::media::{
    GeneratedVideo, VideoGenerationResult, VideoParams, MAX_VIDEO_DURATION, MIN_VIDEO_DURATION,
};
use crate::services::placeholder::{render_mock_video, safe_prompt_slug};
use crate::vertex_client::{PredictRequest, PredictResponse, Prediction, VertexClient, VertexError};

pub const MAX_VIDEO_PROMPT: usize = 2000;

/// Veo models tried in order when the preferred one is unavailable.
pub const VEO_FALLBACK_MODELS: [&str; 3] =
    ["veo-3.0-generate-preview", "veo-2.0-generate-001", "veo-001"];

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    fn display_name(&self) -> &'static str;

    fn is_mock(&self) -> bool;

    async fn generate_videos(&self, params: &VideoParams) -> VideoGenerationResult;
}

pub fn validate_video_params(params: &VideoParams) -> Result<(), String> {
    let prompt = params.prompt.trim();
    if prompt.is_empty() {
        return Err("Please provide a video description".to_string());
    }
    if prompt.chars().count() > MAX_VIDEO_PROMPT {
        return Err(format!(
            "Video description is too long (max {} characters)",
            MAX_VIDEO_PROMPT
        ));
    }
    if !(MIN_VIDEO_DURATION..=MAX_VIDEO_DURATION).contains(&params.duration) {
        return Err(format!(
            "Invalid video duration (supported: {}-{} seconds)",
            MIN_VIDEO_DURATION, MAX_VIDEO_DURATION
        ));
    }
    Ok(())
}

/// The fallback list with `configured` moved to the front when it is not
/// already one of the known models.
pub fn model_candidates(configured: &str) -> Vec<String> {
    let mut models: Vec<String> = VEO_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect();
    let configured = configured.trim();
    if !configured.is_empty() && !models.iter().any(|m| m == configured) {
        models.insert(0, configured.to_string());
    }
    models
}

fn timestamp_slug() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Renders one placeholder clip and wraps it in a mock result.
async fn mock_video_result(
    output_dir: &Path,
    file_prefix: &str,
    model: String,
    params: &VideoParams,
    api_type: Option<&str>,
) -> VideoGenerationResult {
    let start = Instant::now();
    let ratio = params.aspect_ratio.as_str();
    let filename = format!(
        "{}_mock_{}_{}s_{}.mp4",
        file_prefix,
        timestamp_slug(),
        params.duration,
        ratio.replace(':', "x")
    );
    let path = output_dir.join(&filename);

    tracing::info!("🎭 Generating mock video {} with {}", filename, model);

    let file_size = match render_mock_video(&path, params.aspect_ratio, params.duration).await {
        Ok(size) => size,
        Err(e) => {
            tracing::error!("❌ Mock video rendering failed: {}", e);
            return VideoGenerationResult::failure(format!("Could not create mock video: {}", e));
        }
    };

    VideoGenerationResult {
        success: true,
        videos: vec![GeneratedVideo {
            url: format!("/generated/{}", filename),
            path: path.display().to_string(),
            filename,
            aspect_ratio: ratio.to_string(),
            duration: params.duration,
            file_size,
            timestamp: chrono::Local::now().to_rfc3339(),
            model: model.clone(),
        }],
        total_count: Some(1),
        generation_time: Some(format!("{:.2}s", start.elapsed().as_secs_f64())),
        model: Some(model),
        prompt: Some(params.prompt.trim().to_string()),
        parameters: Some(params.parameters()),
        mock_mode: true,
        api_type: api_type.map(str::to_string),
        ..Default::default()
    }
}

#[derive(Debug, Serialize)]
struct VeoInstance<'a> {
    prompt: &'a str,
    config: VeoConfig,
}

#[derive(Debug, Serialize)]
struct VeoConfig {
    aspect_ratio: String,
    person_generation: &'static str,
    duration: String,
}

fn veo_request(params: &VideoParams) -> PredictRequest<VeoInstance<'_>, serde_json::Value> {
    PredictRequest {
        instances: vec![VeoInstance {
            prompt: params.prompt.trim(),
            config: VeoConfig {
                aspect_ratio: params.aspect_ratio.as_str().replace(':', "_"),
                person_generation: params.person_generation.vertex_value(),
                duration: format!("{}s", params.duration),
            },
        }],
        parameters: None,
    }
}

#[derive(Clone)]
pub struct VeoService {
    client: Option<VertexClient>,
    models: Vec<String>,
    output_dir: PathBuf,
}

impl VeoService {
    pub fn new(client: Option<VertexClient>, configured_model: &str, output_dir: PathBuf) -> Self {
        Self {
            client,
            models: model_candidates(configured_model),
            output_dir,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    fn primary_model(&self) -> &str {
        self.models
            .first()
            .map(String::as_str)
            .unwrap_or(VEO_FALLBACK_MODELS[0])
    }

    async fn generate_mock(&self, params: &VideoParams) -> VideoGenerationResult {
        let model = format!("{} (mock)", self.primary_model());
        mock_video_result(&self.output_dir, "veo", model, params, None).await
    }

    /// Walks the model list until one accepts the request. Quota and
    /// missing-model errors move on to the next model, anything else stops
    /// the walk. Falls back to a mock clip when no model produced output.
    pub async fn generate_with_fallback(
        &self,
        client: &VertexClient,
        params: &VideoParams,
    ) -> VideoGenerationResult {
        let request = veo_request(params);

        for (attempt, model) in self.models.iter().enumerate() {
            tracing::info!(
                "🎬 Veo attempt {}/{} with model {}",
                attempt + 1,
                self.models.len(),
                model
            );

            match client.predict(model, &request).await {
                Ok(response) => return self.save_predictions(client, model, response, params).await,
                Err(e) if e.is_resource_exhausted() => {
                    tracing::warn!("⚠️ Quota exhausted for {}: {}", model, e);
                }
                Err(e) if e.is_model_not_found() => {
                    tracing::warn!("⚠️ Model {} is unavailable: {}", model, e);
                }
                Err(e) => {
                    tracing::error!("❌ Veo request failed with {}: {}", model, e);
                    break;
                }
            }
        }

        tracing::warn!("⚠️ No Veo model produced a video, using mock mode");
        self.generate_mock(params).await
    }

    async fn prediction_bytes(
        &self,
        client: &VertexClient,
        prediction: &Prediction,
    ) -> Result<Option<Vec<u8>>, VertexError> {
        if let Some(uri) = prediction.video_uri.as_deref() {
            tracing::info!("🔗 Downloading video from {}", uri);
            return client.download(uri).await.map(Some);
        }
        if let Some(encoded) = prediction.video_bytes.as_deref() {
            return BASE64_STANDARD
                .decode(encoded)
                .map(Some)
                .map_err(|e| VertexError::Parse(e.to_string()));
        }
        Ok(None)
    }

    async fn save_predictions(
        &self,
        client: &VertexClient,
        model: &str,
        response: PredictResponse,
        params: &VideoParams,
    ) -> VideoGenerationResult {
        let start = Instant::now();

        if response.predictions.is_empty() {
            tracing::warn!("⚠️ Veo returned no predictions, using mock mode");
            return self.generate_mock(params).await;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            return VideoGenerationResult::failure(format!("Failed to prepare output directory: {}", e));
        }

        let slug = safe_prompt_slug(params.prompt.trim());
        let ts = timestamp_slug();
        let mut videos = Vec::new();

        for (i, prediction) in response.predictions.iter().enumerate() {
            let filename = format!("veo_vertex_{}_{}_{}.mp4", slug, ts, i);
            let path = self.output_dir.join(&filename);

            let file_size = match self.prediction_bytes(client, prediction).await {
                Ok(Some(bytes)) if !bytes.is_empty() => match tokio::fs::write(&path, &bytes).await {
                    Ok(()) => bytes.len() as u64,
                    Err(e) => {
                        tracing::error!("❌ Failed to save {}: {}", filename, e);
                        continue;
                    }
                },
                Ok(_) => {
                    tracing::warn!("⚠️ Prediction {} carried no video, rendering a placeholder", i);
                    match render_mock_video(&path, params.aspect_ratio, params.duration).await {
                        Ok(size) => size,
                        Err(e) => {
                            tracing::error!("❌ Placeholder for prediction {} failed: {}", i, e);
                            continue;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("❌ Could not fetch video {}: {}", i, e);
                    continue;
                }
            };

            tracing::info!("✅ Saved video {} ({} bytes)", filename, file_size);
            videos.push(GeneratedVideo {
                url: format!("/generated/{}", filename),
                path: path.display().to_string(),
                filename,
                aspect_ratio: params.aspect_ratio.as_str().to_string(),
                duration: params.duration,
                file_size,
                timestamp: chrono::Local::now().to_rfc3339(),
                model: model.to_string(),
            });
        }

        if videos.is_empty() {
            return VideoGenerationResult::failure("Could not save any generated videos");
        }

        VideoGenerationResult {
            success: true,
            total_count: Some(videos.len()),
            videos,
            generation_time: Some(format!("{:.2}s", start.elapsed().as_secs_f64())),
            model: Some(model.to_string()),
            prompt: Some(params.prompt.trim().to_string()),
            parameters: Some(params.parameters()),
            mock_mode: false,
            api_type: Some("Vertex AI Prediction".to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl VideoGenerator for VeoService {
    fn display_name(&self) -> &'static str {
        "Veo 3.0"
    }

    fn is_mock(&self) -> bool {
        self.client.is_none()
    }

    async fn generate_videos(&self, params: &VideoParams) -> VideoGenerationResult {
        if let Err(message) = validate_video_params(params) {
            return VideoGenerationResult::failure(message);
        }

        tracing::info!(
            "🎬 Video request: ratio {}, {}s, persons {}",
            params.aspect_ratio.as_str(),
            params.duration,
            params.person_generation.as_str()
        );

        match &self.client {
            Some(client) => self.generate_with_fallback(client, params).await,
            None => self.generate_mock(params).await,
        }
    }
}

/// OpenAI has no public video endpoint, so this backend always renders a
/// local placeholder clip.
#[derive(Debug, Clone)]
pub struct OpenAiVideoService {
    model: String,
    output_dir: PathBuf,
}

impl OpenAiVideoService {
    pub fn new(model: String, output_dir: PathBuf) -> Self {
        Self { model, output_dir }
    }
}

#[async_trait]
impl VideoGenerator for OpenAiVideoService {
    fn display_name(&self) -> &'static str {
        "OpenAI Video"
    }

    fn is_mock(&self) -> bool {
        true
    }

    async fn generate_videos(&self, params: &VideoParams) -> VideoGenerationResult {
        if let Err(message) = validate_video_params(params) {
            return VideoGenerationResult::failure(message);
        }

        let model = format!("{} (mock)", self.model);
        mock_video_result(&self.output_dir, "openai", model, params, Some("OpenAI")).await
    }
}
