use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
}

impl ContentType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub success: bool,
    pub original_prompt: String,
    pub optimizations: Vec<String>,
    pub style_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub success: bool,
    pub original_prompt: String,
    pub translated_prompt: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub mock_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub prompt: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub option_a: Suggestion,
    pub option_b: Suggestion,
    pub option_c: Suggestion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInfo {
    pub original_length: usize,
    pub content_type: String,
    pub analysis_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized_length: Option<usize>,
}

/// Outcome of a safety analysis, tagged by `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SafetyAnalysis {
    Safe {
        original_prompt: String,
        optimized_prompt: String,
        improvements: Vec<String>,
        mock_mode: bool,
        analysis_info: AnalysisInfo,
    },
    Unsafe {
        original_prompt: String,
        risk_analysis: String,
        suggestions: Suggestions,
        mock_mode: bool,
        analysis_info: AnalysisInfo,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthCheck {
    pub valid: bool,
    pub length: usize,
    pub max_length: usize,
    pub remaining: i64,
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parse() {
        assert_eq!(ContentType::parse(" Video "), Some(ContentType::Video));
        assert_eq!(ContentType::parse("audio"), None);
    }

    #[test]
    fn test_safety_analysis_is_tagged_by_status() {
        let analysis = SafetyAnalysis::Safe {
            original_prompt: "a cat".into(),
            optimized_prompt: "a fluffy cat".into(),
            improvements: vec![],
            mock_mode: true,
            analysis_info: AnalysisInfo {
                original_length: 5,
                content_type: "image".into(),
                analysis_timestamp: "2025-01-01T00:00:00".into(),
                optimized_length: Some(12),
            },
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["status"], "safe");
        assert_eq!(json["analysis_info"]["optimized_length"], 12);
    }
}
