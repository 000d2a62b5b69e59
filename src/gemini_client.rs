use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::llm::{LlmError, LlmProvider};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model,
            timeout,
        }
    }

    pub async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("Gemini API error ({}): {}", status, response_text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: response_text,
            });
        }

        tracing::debug!(
            "Gemini API response (truncated): {}...",
            response_text.chars().take(300).collect::<String>()
        );

        serde_json::from_str(&response_text).map_err(|e| LlmError::Parse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        system: Option<&str>,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(user.to_string()),
                }],
                role: Some("user".to_string()),
            }],
            system_instruction: system.map(|s| Content {
                parts: vec![Part {
                    text: Some(s.to_string()),
                }],
                role: None,
            }),
            generation_config: Some(GenerationConfig {
                max_output_tokens: max_tokens,
                temperature,
            }),
        };

        self.generate(&request)
            .await?
            .text()
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"world"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let parsed: GenerateContentResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.text().is_none());
    }
}
