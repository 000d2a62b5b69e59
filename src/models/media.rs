use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageParams {
    pub prompt: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_count() -> u32 {
    1
}

fn default_quality() -> String {
    "standard".to_string()
}

fn default_size() -> String {
    "1024x1024".to_string()
}

fn default_style() -> String {
    "vivid".to_string()
}

impl ImageParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            count: default_count(),
            quality: default_quality(),
            size: default_size(),
            style: default_style(),
        }
    }
}

/// One generated image. DALL-E and Imagen report slightly different fields,
/// so provider-specific ones are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    pub url: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    pub size: String,
    pub quality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageGenerationResult {
    pub success: bool,
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ImageParameters>,
    pub mock_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batches_processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Raw vendor error behind `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ImageGenerationResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn failure_typed(error: impl Into<String>, error_type: &str) -> Self {
        Self {
            error_type: Some(error_type.to_string()),
            ..Self::failure(error)
        }
    }

    pub fn file_count(&self) -> usize {
        self.images.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageParameters {
    pub count: u32,
    pub size: String,
    pub quality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "16:9" => Some(Self::Landscape),
            "9:16" => Some(Self::Portrait),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }

    /// Pixel dimensions used for locally rendered videos.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Landscape => (1280, 720),
            Self::Portrait => (720, 1280),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    Disallow,
    AllowAdult,
}

impl PersonGeneration {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "disallow" | "dont_allow" => Some(Self::Disallow),
            "allow_adult" | "allow_all" => Some(Self::AllowAdult),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disallow => "disallow",
            Self::AllowAdult => "allow_adult",
        }
    }

    pub fn vertex_value(&self) -> &'static str {
        match self {
            Self::Disallow => "PERSON_GENERATION_DONT_ALLOW",
            Self::AllowAdult => "PERSON_GENERATION_ALLOW_ALL",
        }
    }
}

pub const MIN_VIDEO_DURATION: u32 = 5;
pub const MAX_VIDEO_DURATION: u32 = 8;

#[derive(Debug, Clone)]
pub struct VideoParams {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub duration: u32,
    pub person_generation: PersonGeneration,
}

impl VideoParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::Landscape,
            duration: MIN_VIDEO_DURATION,
            person_generation: PersonGeneration::AllowAdult,
        }
    }

    pub fn parameters(&self) -> VideoParameters {
        VideoParameters {
            aspect_ratio: self.aspect_ratio.as_str().to_string(),
            duration: self.duration,
            person_generation: self.person_generation.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoParameters {
    pub aspect_ratio: String,
    pub duration: u32,
    pub person_generation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedVideo {
    pub url: String,
    pub filename: String,
    pub path: String,
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,
    pub duration: u32,
    pub file_size: u64,
    pub timestamp: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoGenerationResult {
    pub success: bool,
    #[serde(default)]
    pub videos: Vec<GeneratedVideo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<VideoParameters>,
    pub mock_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoGenerationResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn file_count(&self) -> usize {
        self.videos.len()
    }
}
