// src/services/llm.rs
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::prompt::LlmResponse;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

/// A text-generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model_name(&self) -> &str;

    fn is_mock(&self) -> bool {
        false
    }

    async fn chat(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError>;

    async fn generate_content(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(None, prompt, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE)
            .await
    }
}

/// Canned responses used when no vendor key is configured.
#[derive(Debug, Clone, Default)]
pub struct MockLlm;

#[async_trait]
impl LlmProvider for MockLlm {
    fn model_name(&self) -> &str {
        "mock"
    }

    fn is_mock(&self) -> bool {
        true
    }

    async fn chat(
        &self,
        _system: Option<&str>,
        user: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        let head: String = user.chars().take(50).collect();
        Ok(format!("Mock response: {}...", head))
    }
}

#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn mock() -> Self {
        Self::new(Arc::new(MockLlm))
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn is_mock(&self) -> bool {
        self.provider.is_mock()
    }

    pub async fn chat(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        self.provider
            .chat(system, user, max_tokens, temperature)
            .await
            .map(|content| content.trim().to_string())
    }

    pub async fn generate_content(&self, prompt: &str) -> LlmResponse {
        let mock_mode = self.provider.is_mock();
        match self.provider.generate_content(prompt).await {
            Ok(content) => LlmResponse {
                success: true,
                content: Some(content.trim().to_string()),
                model: Some(self.provider.model_name().to_string()),
                mock_mode,
                error: None,
            },
            Err(e) => {
                tracing::error!("❌ LLM call failed ({}): {}", self.provider.model_name(), e);
                LlmResponse {
                    success: false,
                    content: None,
                    model: Some(self.provider.model_name().to_string()),
                    mock_mode,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Returns scripted replies in order, then errors.
    pub struct ScriptedLlm {
        replies: Mutex<Vec<Result<String, String>>>,
    }

    impl ScriptedLlm {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            let mut replies: Vec<Result<String, String>> = replies
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn chat(
            &self,
            _system: Option<&str>,
            _user: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, LlmError> {
            match self.replies.lock().unwrap().pop() {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(LlmError::Api { status: 500, message }),
                None => Err(LlmError::EmptyResponse),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedLlm;
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_echoes_prompt_head() {
        let service = LlmService::mock();
        let prompt = "x".repeat(80);
        let response = service.generate_content(&prompt).await;
        assert!(response.success);
        assert!(response.mock_mode);
        assert_eq!(
            response.content.unwrap(),
            format!("Mock response: {}...", "x".repeat(50))
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let service = LlmService::new(Arc::new(ScriptedLlm::new(vec![Err("quota")])));
        let response = service.generate_content("hello").await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("quota"));
        assert_eq!(response.model.as_deref(), Some("scripted"));
    }
}
