use gcp_auth::TokenProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Video predictions can take minutes.
const PREDICT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum VertexError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl VertexError {
    /// Quota or rate-limit rejections.
    pub fn is_resource_exhausted(&self) -> bool {
        match self {
            VertexError::Api { status, message } => {
                *status == 429
                    || message.contains("Quota exceeded")
                    || message.contains("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }

    pub fn is_model_not_found(&self) -> bool {
        let text = self.to_string().to_lowercase();
        matches!(self, VertexError::Api { status: 404, .. })
            || text.contains("not found")
            || text.contains("does not exist")
    }
}

#[derive(Debug, Serialize)]
pub struct PredictRequest<I: Serialize, P: Serialize> {
    pub instances: Vec<I>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<P>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// One prediction entry. Imagen fills the base64 image fields, Veo fills
/// the video fields.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Prediction {
    #[serde(rename = "bytesBase64Encoded")]
    pub bytes_base64_encoded: Option<String>,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(alias = "videoUri", alias = "gcsUri")]
    pub video_uri: Option<String>,
    #[serde(alias = "videoBytes")]
    pub video_bytes: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Clone)]
pub struct VertexClient {
    client: Client,
    auth: Arc<dyn TokenProvider>,
    project_id: String,
    location: String,
    timeout: Duration,
}

impl std::fmt::Debug for VertexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexClient")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .finish()
    }
}

impl VertexClient {
    /// Uses application default credentials (service account file,
    /// gcloud config, or the metadata server).
    pub async fn new(
        project_id: String,
        location: String,
        timeout: Duration,
    ) -> Result<Self, VertexError> {
        let auth = gcp_auth::provider()
            .await
            .map_err(|e| VertexError::Auth(e.to_string()))?;

        Ok(Self {
            client: Client::new(),
            auth,
            project_id,
            location,
            timeout,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn predict_url(&self, model: &str) -> String {
        format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}:predict",
            loc = self.location,
            project = self.project_id,
            model = model,
        )
    }

    async fn access_token(&self) -> Result<String, VertexError> {
        let token = self
            .auth
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| VertexError::Auth(e.to_string()))?;
        Ok(token.as_str().to_string())
    }

    /// Single predict call. Quota errors are returned to the caller rather
    /// than retried so model fallback can react to them.
    pub async fn predict<I, P>(
        &self,
        model: &str,
        request: &PredictRequest<I, P>,
    ) -> Result<PredictResponse, VertexError>
    where
        I: Serialize,
        P: Serialize,
    {
        let token = self.access_token().await?;
        let url = self.predict_url(model);

        tracing::debug!("Vertex AI predict: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .timeout(PREDICT_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| VertexError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VertexError::Request(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("Vertex AI error ({}) for {}: {}", status, model, text);
            return Err(VertexError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| VertexError::Parse(e.to_string()))
    }

    /// Downloads a generated asset. `gs://` URIs go through the storage JSON
    /// endpoint with the same OAuth token.
    pub async fn download(&self, uri: &str) -> Result<Vec<u8>, VertexError> {
        let request = match gcs_media_url(uri) {
            Some(url) => self.client.get(url).bearer_auth(self.access_token().await?),
            None => self.client.get(uri),
        };

        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| VertexError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VertexError::Api {
                status: status.as_u16(),
                message: format!("download failed for {}", uri),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VertexError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn gcs_media_url(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix("gs://")?;
    let (bucket, object) = rest.split_once('/')?;
    Some(format!(
        "https://storage.googleapis.com/storage/v1/b/{}/o/{}?alt=media",
        bucket,
        urlencoding::encode(object)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let quota = VertexError::Api {
            status: 429,
            message: "RESOURCE_EXHAUSTED".into(),
        };
        assert!(quota.is_resource_exhausted());
        assert!(!quota.is_model_not_found());

        let quota_text = VertexError::Api {
            status: 400,
            message: "Quota exceeded for aiplatform.googleapis.com".into(),
        };
        assert!(quota_text.is_resource_exhausted());

        let missing = VertexError::Api {
            status: 404,
            message: "Publisher model veo-001 not found".into(),
        };
        assert!(missing.is_model_not_found());
        assert!(!missing.is_resource_exhausted());

        let other = VertexError::Api {
            status: 400,
            message: "invalid argument".into(),
        };
        assert!(!other.is_model_not_found());
        assert!(!other.is_resource_exhausted());
    }

    #[test]
    fn test_prediction_parses_image_and_video_shapes() {
        let body = r#"{"predictions":[
            {"bytesBase64Encoded":"aGVsbG8=","mimeType":"image/png"},
            {"video_uri":"gs://bucket/out/video.mp4"},
            {"videoBytes":"AAAA"}
        ]}"#;
        let parsed: PredictResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.predictions.len(), 3);
        assert_eq!(parsed.predictions[0].mime_type.as_deref(), Some("image/png"));
        assert_eq!(
            parsed.predictions[1].video_uri.as_deref(),
            Some("gs://bucket/out/video.mp4")
        );
        assert_eq!(parsed.predictions[2].video_bytes.as_deref(), Some("AAAA"));
    }

    #[test]
    fn test_gcs_uri_mapping() {
        assert_eq!(
            gcs_media_url("gs://bucket/out/video.mp4").as_deref(),
            Some("https://storage.googleapis.com/storage/v1/b/bucket/o/out%2Fvideo.mp4?alt=media")
        );
        assert!(gcs_media_url("https://example.com/v.mp4").is_none());
    }
}
