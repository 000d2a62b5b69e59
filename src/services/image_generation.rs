// src/services/image_generation.rs
use async_trait::async_trait;
use base64::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::models::media::{GeneratedImage, ImageGenerationResult, ImageParameters, ImageParams};
use crate::openai_client::{ImagesRequest, OpenAiClient};
use crate::services::placeholder::{safe_prompt_slug, write_placeholder_image};
use crate::vertex_client::{PredictRequest, VertexClient};

pub const DALLE_MAX_PROMPT: usize = 4000;
pub const DALLE_MAX_COUNT: u32 = 4;
pub const DALLE_SIZES: [&str; 3] = ["1024x1024", "1024x1792", "1792x1024"];
pub const DALLE_QUALITIES: [&str; 2] = ["standard", "hd"];
pub const DALLE_STYLES: [&str; 2] = ["vivid", "natural"];

pub const IMAGEN_MAX_PROMPT: usize = 2000;
pub const IMAGEN_MAX_COUNT: u32 = 10;
pub const IMAGEN_BATCH_SIZE: u32 = 4;
pub const IMAGEN_SIZES: [&str; 3] = ["1024x1024", "1152x896", "896x1152"];
pub const IMAGEN_QUALITIES: [&str; 3] = ["standard", "high", "ultra"];

/// An image backend. Failures are reported inside the result rather than as
/// `Err` so callers can always return the result body.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Human-readable name recorded with each generation.
    fn display_name(&self) -> &'static str;

    fn is_mock(&self) -> bool;

    async fn generate_images(&self, params: &ImageParams) -> ImageGenerationResult;
}

fn timestamp_slug() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn elapsed_label(start: Instant) -> String {
    format!("{:.2}s", start.elapsed().as_secs_f64())
}

fn url_for(dir_url: &str, filename: &str) -> String {
    format!("{}/{}", dir_url.trim_end_matches('/'), filename)
}

pub fn validate_dalle_params(params: &ImageParams) -> Result<(), String> {
    let prompt = params.prompt.trim();
    if prompt.is_empty() {
        return Err("Please provide an image description".to_string());
    }
    if prompt.chars().count() > DALLE_MAX_PROMPT {
        return Err(format!(
            "Image description is too long (max {} characters)",
            DALLE_MAX_PROMPT
        ));
    }
    if !(1..=DALLE_MAX_COUNT).contains(&params.count) {
        return Err(format!("Image count must be between 1 and {}", DALLE_MAX_COUNT));
    }
    if !DALLE_SIZES.contains(&params.size.as_str()) {
        return Err(format!("Unsupported image size: {}", params.size));
    }
    if !DALLE_QUALITIES.contains(&params.quality.as_str()) {
        return Err(format!("Unsupported image quality: {}", params.quality));
    }
    if !DALLE_STYLES.contains(&params.style.as_str()) {
        return Err(format!("Unsupported image style: {}", params.style));
    }
    Ok(())
}

/// Maps a DALL-E error text to `(error_type, message, suggestion)`.
pub fn classify_dalle_error(error_text: &str) -> (&'static str, String, Option<String>) {
    let lower = error_text.to_lowercase();
    if error_text.contains("image_generation_user_error") || lower.contains("content_policy") {
        (
            "content_policy_violation",
            "The prompt does not meet the OpenAI content policy. Remove sensitive descriptions or use prompt optimization to get a safe alternative.".to_string(),
            Some("Try a safer, more positive description that avoids sensitive content.".to_string()),
        )
    } else if lower.contains("bad_request") || error_text.contains("400") {
        (
            "bad_request",
            "Invalid request parameters. Check the prompt and generation settings.".to_string(),
            Some("Make sure the prompt is appropriate and the size and quality settings are valid.".to_string()),
        )
    } else {
        (
            "general_error",
            format!("Image generation failed: {}", error_text),
            None,
        )
    }
}

#[derive(Clone)]
pub struct DalleService {
    client: Option<OpenAiClient>,
    model: String,
    output_dir: PathBuf,
    url_prefix: String,
}

impl DalleService {
    pub fn new(client: Option<OpenAiClient>, model: String, output_dir: PathBuf) -> Self {
        Self {
            client,
            model,
            output_dir,
            url_prefix: "/generated".to_string(),
        }
    }

    fn parameters(params: &ImageParams) -> ImageParameters {
        ImageParameters {
            count: params.count,
            size: params.size.clone(),
            quality: params.quality.clone(),
            style: Some(params.style.clone()),
            aspect_ratio: None,
        }
    }

    async fn generate_real(&self, client: &OpenAiClient, params: &ImageParams) -> ImageGenerationResult {
        let start = Instant::now();
        let prompt = params.prompt.trim();

        tracing::info!(
            "🎨 Generating {} image(s) with {} (size={}, quality={}, style={})",
            params.count,
            self.model,
            params.size,
            params.quality,
            params.style
        );

        let request = ImagesRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: params.count,
            size: params.size.clone(),
            quality: params.quality.clone(),
            style: params.style.clone(),
        };

        let response = match client.generate_images(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("❌ DALL-E generation failed: {}", e);
                let (error_type, message, suggestion) = classify_dalle_error(&e.to_string());
                return ImageGenerationResult {
                    suggestion,
                    ..ImageGenerationResult::failure_typed(message, error_type)
                };
            }
        };

        let slug = safe_prompt_slug(prompt);
        let ts = timestamp_slug();

        let downloads = response.data.iter().enumerate().map(|(i, item)| {
            let filename = format!("dalle_{}_{}_{}.png", slug, ts, i);
            let path = self.output_dir.join(&filename);
            async move {
                let url = item.url.as_deref()?;
                let bytes = match client.download(url).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!("⚠️ Failed to download generated image {}: {}", i, e);
                        return None;
                    }
                };
                if let Err(e) = tokio::fs::write(&path, &bytes).await {
                    tracing::warn!("⚠️ Failed to save {}: {}", path.display(), e);
                    return None;
                }
                Some((filename, path, bytes.len() as u64, item.revised_prompt.clone()))
            }
        });

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            return ImageGenerationResult::failure(format!("Failed to prepare output directory: {}", e));
        }

        let images: Vec<GeneratedImage> = futures::future::join_all(downloads)
            .await
            .into_iter()
            .flatten()
            .map(|(filename, path, file_size, revised_prompt)| GeneratedImage {
                url: url_for(&self.url_prefix, &filename),
                path: Some(path.display().to_string()),
                filename,
                size: params.size.clone(),
                quality: params.quality.clone(),
                style: Some(params.style.clone()),
                file_size,
                timestamp: Some(chrono::Local::now().to_rfc3339()),
                model: Some(self.model.clone()),
                revised_prompt,
                ..Default::default()
            })
            .collect();

        if images.is_empty() {
            return ImageGenerationResult::failure("Could not download any generated images");
        }

        tracing::info!("✅ Saved {} DALL-E image(s)", images.len());

        ImageGenerationResult {
            success: true,
            total_count: Some(images.len()),
            images,
            generation_time: Some(elapsed_label(start)),
            model: Some(self.model.clone()),
            prompt: Some(prompt.to_string()),
            parameters: Some(Self::parameters(params)),
            mock_mode: false,
            api_type: Some("OpenAI DALL-E".to_string()),
            ..Default::default()
        }
    }

    async fn generate_mock(&self, params: &ImageParams) -> ImageGenerationResult {
        let start = Instant::now();
        let prompt = params.prompt.trim();
        tracing::info!("🎭 DALL-E mock mode: drawing {} placeholder(s)", params.count);

        let model = format!("{} (mock)", self.model);
        let ts = timestamp_slug();
        let mut images = Vec::new();

        for i in 0..params.count {
            let filename = format!("dalle_mock_{}_{}.png", ts, i);
            let path = self.output_dir.join(&filename);
            match write_placeholder_image(&path, &params.size, prompt, i as u64).await {
                Ok(file_size) => images.push(GeneratedImage {
                    url: url_for(&self.url_prefix, &filename),
                    path: Some(path.display().to_string()),
                    filename,
                    size: params.size.clone(),
                    quality: params.quality.clone(),
                    style: Some(params.style.clone()),
                    file_size,
                    timestamp: Some(chrono::Local::now().to_rfc3339()),
                    model: Some(model.clone()),
                    ..Default::default()
                }),
                Err(e) => tracing::error!("❌ Failed to draw placeholder {}: {}", i, e),
            }
        }

        if images.is_empty() {
            return ImageGenerationResult::failure("Could not create any placeholder images");
        }

        ImageGenerationResult {
            success: true,
            total_count: Some(images.len()),
            images,
            generation_time: Some(elapsed_label(start)),
            model: Some(model),
            prompt: Some(prompt.to_string()),
            parameters: Some(Self::parameters(params)),
            mock_mode: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImageGenerator for DalleService {
    fn display_name(&self) -> &'static str {
        "DALL-E 3"
    }

    fn is_mock(&self) -> bool {
        self.client.is_none()
    }

    async fn generate_images(&self, params: &ImageParams) -> ImageGenerationResult {
        if let Err(message) = validate_dalle_params(params) {
            return ImageGenerationResult::failure(message);
        }

        match &self.client {
            Some(client) => self.generate_real(client, params).await,
            None => self.generate_mock(params).await,
        }
    }
}

pub fn validate_imagen_params(params: &ImageParams) -> Result<(), String> {
    let prompt = params.prompt.trim();
    if prompt.is_empty() {
        return Err("Please provide an image description".to_string());
    }
    if prompt.chars().count() > IMAGEN_MAX_PROMPT {
        return Err(format!(
            "Image description is too long (max {} characters)",
            IMAGEN_MAX_PROMPT
        ));
    }
    if !(1..=IMAGEN_MAX_COUNT).contains(&params.count) {
        return Err(format!("Image count must be between 1 and {}", IMAGEN_MAX_COUNT));
    }
    if !IMAGEN_QUALITIES.contains(&params.quality.as_str()) {
        return Err(format!("Unsupported image quality: {}", params.quality));
    }
    if !IMAGEN_SIZES.contains(&params.size.as_str()) {
        return Err(format!("Unsupported image size: {}", params.size));
    }
    Ok(())
}

pub fn size_to_aspect_ratio(size: &str) -> &'static str {
    match size {
        "1024x1024" => "1:1",
        "1152x896" => "4:3",
        "896x1152" => "3:4",
        _ => "1:1",
    }
}

/// Maps an Imagen error text to `(error_type, message)`.
pub fn classify_imagen_error(error_text: &str) -> (&'static str, String) {
    let lower = error_text.to_lowercase();
    if error_text.contains("429") || error_text.contains("Quota exceeded") {
        (
            "quota_exceeded",
            "Quota exhausted. Try again later or request a quota increase.".to_string(),
        )
    } else if error_text.contains("403") || lower.contains("permission") {
        (
            "permission_denied",
            "Permission denied. Check the Google Cloud project settings and that the API is enabled.".to_string(),
        )
    } else if error_text.contains("404") || lower.contains("not found") {
        (
            "model_not_found",
            "The model does not exist or is unavailable. Check the model version.".to_string(),
        )
    } else if lower.contains("safety") {
        (
            "safety_filter",
            "The prompt was blocked by the safety filter. Adjust it and try again.".to_string(),
        )
    } else {
        ("api_error", format!("Image generation failed: {}", error_text))
    }
}

fn imagen_batch_failure(generation_id: String, details: String) -> ImageGenerationResult {
    let (error_type, message) = classify_imagen_error(&details);
    ImageGenerationResult {
        generation_id: Some(generation_id),
        service: Some("vertex_ai".to_string()),
        error_details: Some(details),
        ..ImageGenerationResult::failure_typed(message, error_type)
    }
}

#[derive(Debug, Serialize)]
struct ImagenInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters<'a> {
    sample_count: u32,
    aspect_ratio: &'a str,
}

#[derive(Clone)]
pub struct ImagenService {
    client: Option<VertexClient>,
    model: String,
    output_dir: PathBuf,
    url_prefix: String,
    batch_pause: Duration,
}

impl ImagenService {
    pub fn new(client: Option<VertexClient>, model: String, output_dir: PathBuf) -> Self {
        Self {
            client,
            model,
            output_dir,
            url_prefix: "/generated/images".to_string(),
            batch_pause: Duration::from_secs(1),
        }
    }

    fn parameters(params: &ImageParams) -> ImageParameters {
        ImageParameters {
            count: params.count,
            size: params.size.clone(),
            quality: params.quality.clone(),
            style: None,
            aspect_ratio: Some(size_to_aspect_ratio(&params.size).to_string()),
        }
    }

    fn image_entry(
        &self,
        generation_id: &str,
        index: u32,
        filename: String,
        path: &Path,
        params: &ImageParams,
        file_size: u64,
        model_version: &str,
        batch_number: Option<usize>,
    ) -> GeneratedImage {
        GeneratedImage {
            image_id: Some(format!("{}_{}", generation_id, index)),
            url: url_for(&self.url_prefix, &filename),
            filepath: Some(path.display().to_string()),
            filename,
            size: params.size.clone(),
            quality: params.quality.clone(),
            file_size,
            created_at: Some(chrono::Local::now().to_rfc3339()),
            model_version: Some(model_version.to_string()),
            batch_number,
            ..Default::default()
        }
    }

    async fn generate_real(&self, client: &VertexClient, params: &ImageParams) -> ImageGenerationResult {
        let start = Instant::now();
        let generation_id = uuid::Uuid::new_v4().to_string();
        let prompt = params.prompt.trim();
        let aspect_ratio = size_to_aspect_ratio(&params.size);
        let batches = params.count.div_ceil(IMAGEN_BATCH_SIZE);

        tracing::info!(
            "🎨 Imagen generation {}: {} image(s) in {} batch(es), aspect {}",
            generation_id,
            params.count,
            batches,
            aspect_ratio
        );

        if let Err(e) = tokio::fs::create_dir_all(&self.output_dir).await {
            return ImageGenerationResult::failure(format!("Failed to prepare output directory: {}", e));
        }

        let mut images = Vec::new();

        for batch in 0..batches {
            let batch_count = IMAGEN_BATCH_SIZE.min(params.count - batch * IMAGEN_BATCH_SIZE);
            let request = PredictRequest {
                instances: vec![ImagenInstance { prompt }],
                parameters: Some(ImagenParameters {
                    sample_count: batch_count,
                    aspect_ratio,
                }),
            };

            let response = match client.predict(&self.model, &request).await {
                Ok(response) => response,
                Err(e) => {
                    let details = e.to_string();
                    tracing::error!("❌ Imagen batch {} failed: {}", batch + 1, details);
                    return imagen_batch_failure(generation_id, details);
                }
            };

            for (i, prediction) in response.predictions.iter().enumerate() {
                let Some(encoded) = prediction.bytes_base64_encoded.as_deref() else {
                    tracing::warn!("⚠️ Imagen prediction {} carried no image data", i);
                    continue;
                };
                let bytes = match BASE64_STANDARD.decode(encoded) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!("⚠️ Could not decode Imagen prediction {}: {}", i, e);
                        continue;
                    }
                };

                let index = batch * IMAGEN_BATCH_SIZE + i as u32 + 1;
                let filename = format!(
                    "imagen4_{}_{}_{}.png",
                    generation_id,
                    index,
                    chrono::Utc::now().timestamp()
                );
                let path = self.output_dir.join(&filename);
                if let Err(e) = tokio::fs::write(&path, &bytes).await {
                    tracing::error!("❌ Failed to save {}: {}", path.display(), e);
                    continue;
                }

                images.push(self.image_entry(
                    &generation_id,
                    index,
                    filename,
                    &path,
                    params,
                    bytes.len() as u64,
                    "imagen-4",
                    Some(batch as usize + 1),
                ));
            }

            if batch + 1 < batches {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        if images.is_empty() {
            return ImageGenerationResult {
                generation_id: Some(generation_id),
                service: Some("vertex_ai".to_string()),
                ..ImageGenerationResult::failure_typed("No images were returned by Imagen", "api_error")
            };
        }

        tracing::info!("✅ Imagen generation {} saved {} image(s)", generation_id, images.len());

        ImageGenerationResult {
            success: true,
            generation_id: Some(generation_id),
            total_count: Some(images.len()),
            images,
            generation_time: Some(elapsed_label(start)),
            model: Some(self.model.clone()),
            prompt: Some(prompt.to_string()),
            parameters: Some(Self::parameters(params)),
            mock_mode: false,
            api_type: Some("Vertex AI Imagen".to_string()),
            service: Some("vertex_ai".to_string()),
            batches_processed: Some(batches as usize),
            ..Default::default()
        }
    }

    async fn generate_mock(&self, params: &ImageParams) -> ImageGenerationResult {
        let start = Instant::now();
        let generation_id = uuid::Uuid::new_v4().to_string();
        let prompt = params.prompt.trim();
        tracing::info!("🎭 Imagen mock mode: drawing {} placeholder(s)", params.count);

        let mut images = Vec::new();
        for i in 1..=params.count {
            let filename = format!(
                "imagen4_mock_{}_{}_{}.png",
                generation_id,
                i,
                chrono::Utc::now().timestamp()
            );
            let path = self.output_dir.join(&filename);
            match write_placeholder_image(&path, &params.size, prompt, i as u64).await {
                Ok(file_size) => images.push(self.image_entry(
                    &generation_id,
                    i,
                    filename,
                    &path,
                    params,
                    file_size,
                    "imagen-4-mock",
                    None,
                )),
                Err(e) => tracing::error!("❌ Failed to draw placeholder {}: {}", i, e),
            }
        }

        if images.is_empty() {
            return ImageGenerationResult::failure("Could not create any placeholder images");
        }

        ImageGenerationResult {
            success: true,
            generation_id: Some(generation_id),
            total_count: Some(images.len()),
            images,
            generation_time: Some(elapsed_label(start)),
            model: Some(format!("{} (mock)", self.model)),
            prompt: Some(prompt.to_string()),
            parameters: Some(Self::parameters(params)),
            mock_mode: true,
            service: Some("mock".to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ImageGenerator for ImagenService {
    fn display_name(&self) -> &'static str {
        "Imagen 4"
    }

    fn is_mock(&self) -> bool {
        self.client.is_none()
    }

    async fn generate_images(&self, params: &ImageParams) -> ImageGenerationResult {
        if let Err(message) = validate_imagen_params(params) {
            return ImageGenerationResult::failure(message);
        }

        match &self.client {
            Some(client) => self.generate_real(client, params).await,
            None => self.generate_mock(params).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}_{}", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_dalle_validation() {
        let mut params = ImageParams::new("a walrus");
        assert!(validate_dalle_params(&params).is_ok());

        params.count = 5;
        assert!(validate_dalle_params(&params).unwrap_err().contains("between 1 and 4"));

        params.count = 1;
        params.size = "1152x896".into();
        assert!(validate_dalle_params(&params).unwrap_err().contains("size"));

        params.size = "1024x1792".into();
        params.style = "artistic".into();
        assert!(validate_dalle_params(&params).unwrap_err().contains("style"));
    }

    #[test]
    fn test_imagen_validation() {
        let mut params = ImageParams::new("a walrus");
        params.count = 10;
        params.quality = "ultra".into();
        params.size = "896x1152".into();
        assert!(validate_imagen_params(&params).is_ok());

        params.count = 11;
        assert!(validate_imagen_params(&params).is_err());

        params.count = 2;
        params.quality = "hd".into();
        assert!(validate_imagen_params(&params).is_err());
    }

    #[test]
    fn test_size_to_aspect_ratio() {
        assert_eq!(size_to_aspect_ratio("1152x896"), "4:3");
        assert_eq!(size_to_aspect_ratio("896x1152"), "3:4");
        assert_eq!(size_to_aspect_ratio("1792x1024"), "1:1");
    }

    #[test]
    fn test_classify_dalle_error() {
        let (kind, _, suggestion) =
            classify_dalle_error(r#"API error (400): {"error":{"code":"content_policy_violation"}}"#);
        assert_eq!(kind, "content_policy_violation");
        assert!(suggestion.is_some());

        assert_eq!(classify_dalle_error("API error (400): bad size").0, "bad_request");
        assert_eq!(classify_dalle_error("Connection error: reset").0, "general_error");
    }

    #[test]
    fn test_classify_imagen_error() {
        assert_eq!(classify_imagen_error("API error (429): slow down").0, "quota_exceeded");
        assert_eq!(classify_imagen_error("Permission denied on resource").0, "permission_denied");
        assert_eq!(classify_imagen_error("Model not found").0, "model_not_found");
        assert_eq!(classify_imagen_error("blocked by Safety settings").0, "safety_filter");
        assert_eq!(classify_imagen_error("weird").0, "api_error");
    }

    #[test]
    fn test_imagen_batch_failure_keeps_details() {
        let details = "Vertex AI returned 429: Quota exceeded for imagen".to_string();
        let result = imagen_batch_failure("gen1".into(), details.clone());
        assert!(!result.success);
        assert_eq!(result.error_type.as_deref(), Some("quota_exceeded"));
        assert_eq!(result.error_details.as_deref(), Some(details.as_str()));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error_details"], details);
        assert_eq!(json["service"], "vertex_ai");
    }

    #[tokio::test]
    async fn test_dalle_mock_writes_placeholders() {
        let dir = temp_dir("dalle_mock");
        let service = DalleService::new(None, "dall-e-3".into(), dir.clone());
        let mut params = ImageParams::new("a walrus");
        params.count = 2;

        let result = service.generate_images(&params).await;
        assert!(result.success);
        assert!(result.mock_mode);
        assert_eq!(result.images.len(), 2);
        assert_eq!(result.model.as_deref(), Some("dall-e-3 (mock)"));
        assert!(result.images[0].filename.starts_with("dalle_mock_"));
        assert!(result.images[0].url.starts_with("/generated/dalle_mock_"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_dalle_mock_still_validates() {
        let service = DalleService::new(None, "dall-e-3".into(), temp_dir("dalle_invalid"));
        let mut params = ImageParams::new("a walrus");
        params.count = 7;
        let result = service.generate_images(&params).await;
        assert!(!result.success);
        assert!(result.images.is_empty());
    }

    #[tokio::test]
    async fn test_imagen_mock_result_shape() {
        let dir = temp_dir("imagen_mock");
        let service = ImagenService::new(None, "imagen-4.0-fast-generate-preview-06-06".into(), dir.clone());
        let mut params = ImageParams::new("a walrus");
        params.count = 3;
        params.size = "1152x896".into();

        let result = service.generate_images(&params).await;
        assert!(result.success);
        assert_eq!(result.service.as_deref(), Some("mock"));
        assert_eq!(result.images.len(), 3);
        let generation_id = result.generation_id.clone().unwrap();
        assert_eq!(result.images[2].image_id.as_deref(), Some(format!("{}_3", generation_id).as_str()));
        assert!(result.images[0].url.starts_with("/generated/images/imagen4_mock_"));
        assert_eq!(
            result.parameters.as_ref().and_then(|p| p.aspect_ratio.as_deref()),
            Some("4:3")
        );
        let _ = std::fs::remove_dir_all(dir);
    }
}
