use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::services::llm::{LlmError, LlmProvider};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl From<OpenAiError> for LlmError {
    fn from(err: OpenAiError) -> Self {
        match err {
            OpenAiError::Connection(e) => LlmError::Request(e),
            OpenAiError::Api { status, body } => LlmError::Api {
                status,
                message: body,
            },
            OpenAiError::Parse(e) => LlmError::Parse(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Serialize)]
pub struct ImagesRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
    pub quality: String,
    pub style: String,
}

#[derive(Debug, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
pub struct ImageData {
    pub url: Option<String>,
    pub revised_prompt: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: String, text_model: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            text_model,
            timeout,
        }
    }

    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, OpenAiError> {
        tracing::debug!(
            "OpenAI chat request: model={}, messages={}",
            request.model,
            request.messages.len()
        );
        self.post_with_retry("chat/completions", request).await
    }

    pub async fn generate_images(&self, request: &ImagesRequest) -> Result<ImagesResponse, OpenAiError> {
        tracing::debug!(
            "OpenAI image request: model={}, n={}, size={}",
            request.model,
            request.n,
            request.size
        );
        self.post_with_retry("images/generations", request).await
    }

    /// Fetches a generated asset (DALL-E returns short-lived URLs).
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, OpenAiError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| OpenAiError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                body: format!("download failed for {}", url),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OpenAiError::Connection(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn post_with_retry<B, T>(&self, path: &str, body: &B) -> Result<T, OpenAiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let backoff_config = ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let url = format!("{}/{}", self.base_url, path);

        // Retry on connection errors and 429/500/502/503
        let operation = || async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .timeout(self.timeout)
                .json(body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_connect() || e.is_timeout() {
                        tracing::warn!("OpenAI connection error (retrying): {}", e);
                        backoff::Error::transient(OpenAiError::Connection(e.to_string()))
                    } else {
                        backoff::Error::permanent(OpenAiError::Connection(e.to_string()))
                    }
                })?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| backoff::Error::permanent(OpenAiError::Connection(e.to_string())))?;

            if matches!(status.as_u16(), 429 | 500 | 502 | 503) {
                tracing::warn!("OpenAI returned {} (retrying)", status);
                return Err(backoff::Error::transient(OpenAiError::Api {
                    status: status.as_u16(),
                    body: text,
                }));
            }

            if !status.is_success() {
                tracing::error!("OpenAI permanent error ({}): {}", status, text);
                return Err(backoff::Error::permanent(OpenAiError::Api {
                    status: status.as_u16(),
                    body: text,
                }));
            }

            serde_json::from_str(&text)
                .map_err(|e| backoff::Error::permanent(OpenAiError::Parse(e.to_string())))
        };

        retry(backoff_config, operation).await
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.text_model
    }

    async fn chat(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user.to_string(),
        });

        let request = ChatRequest {
            model: self.text_model.clone(),
            messages,
            max_tokens,
            temperature,
        };

        let response = self.chat_completion(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_response_parses_revised_prompt() {
        let body = r#"{"created":1,"data":[{"url":"https://x/y.png","revised_prompt":"a calm walrus"}]}"#;
        let parsed: ImagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].revised_prompt.as_deref(), Some("a calm walrus"));
    }

    #[test]
    fn test_api_error_keeps_body_for_classification() {
        let err: LlmError = OpenAiError::Api {
            status: 400,
            body: r#"{"error":{"code":"content_policy_violation"}}"#.to_string(),
        }
        .into();
        assert!(err.to_string().contains("content_policy_violation"));
        assert!(err.to_string().contains("400"));
    }
}
