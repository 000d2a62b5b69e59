// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub database_url: Option<String>,

    pub openai_api_key: Option<String>,
    pub openai_text_model: String,
    pub openai_image_model: String,
    pub openai_video_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub llm_provider: String,

    pub google_cloud_project: Option<String>,
    pub google_cloud_location: String,
    pub image_gen_model: String,
    pub video_gen_model: String,

    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,

    pub admin_username: String,
    pub admin_password: String,
    /// bcrypt hash; takes precedence over `admin_password` when present
    pub admin_password_hash: Option<String>,
    pub jwt_secret: String,

    pub api_timeout: Duration,
    pub max_image_count: u32,
    pub max_video_count: u32,
    pub max_prompt_length: usize,
    pub rate_limit_per_minute: u32,

    pub generated_dir: PathBuf,
    pub download_dir: PathBuf,
}

pub const DEFAULT_JWT_SECRET: &str = "dev-secret-key-change-in-production";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            database_url: None,
            openai_api_key: None,
            openai_text_model: "gpt-4".to_string(),
            openai_image_model: "dall-e-3".to_string(),
            openai_video_model: "veo-2.0-generate-001".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            llm_provider: "openai".to_string(),
            google_cloud_project: None,
            google_cloud_location: "us-central1".to_string(),
            image_gen_model: "imagen-4.0-fast-generate-preview-06-06".to_string(),
            video_gen_model: "veo-3.0-generate-preview".to_string(),
            google_search_api_key: None,
            google_search_engine_id: None,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            admin_password_hash: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            api_timeout: Duration::from_secs(30),
            max_image_count: 10,
            max_video_count: 5,
            max_prompt_length: 2000,
            rate_limit_per_minute: 60,
            generated_dir: PathBuf::from("generated"),
            download_dir: PathBuf::from("static/downloaded_images"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT").unwrap_or(defaults.port),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            database_url: non_empty_env("DATABASE_URL"),
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            openai_text_model: non_empty_env("OPENAI_TEXT_GEN_MODEL")
                .unwrap_or(defaults.openai_text_model),
            openai_image_model: non_empty_env("OPENAI_IMAGE_GEN_MODEL")
                .unwrap_or(defaults.openai_image_model),
            openai_video_model: non_empty_env("OPENAI_VIDEO_GEN_MODEL")
                .unwrap_or(defaults.openai_video_model),
            gemini_api_key: non_empty_env("GEMINI_API_KEY"),
            gemini_model: non_empty_env("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            llm_provider: non_empty_env("LLM_PROVIDER")
                .map(|p| p.to_lowercase())
                .unwrap_or(defaults.llm_provider),
            google_cloud_project: non_empty_env("GOOGLE_CLOUD_PROJECT"),
            google_cloud_location: non_empty_env("GOOGLE_CLOUD_LOCATION")
                .unwrap_or(defaults.google_cloud_location),
            image_gen_model: non_empty_env("IMAGE_GEN_MODEL").unwrap_or(defaults.image_gen_model),
            video_gen_model: non_empty_env("VIDEO_GEN_MODEL").unwrap_or(defaults.video_gen_model),
            google_search_api_key: non_empty_env("GOOGLE_SEARCH_API_KEY"),
            google_search_engine_id: non_empty_env("GOOGLE_SEARCH_ENGINE_ID"),
            admin_username: non_empty_env("ADMIN_USERNAME").unwrap_or(defaults.admin_username),
            admin_password: non_empty_env("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            admin_password_hash: non_empty_env("ADMIN_PASSWORD_HASH"),
            jwt_secret: non_empty_env("JWT_SECRET")
                .or_else(|| non_empty_env("SECRET_KEY"))
                .unwrap_or(defaults.jwt_secret),
            api_timeout: parse_env("API_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.api_timeout),
            max_image_count: parse_env("MAX_IMAGE_COUNT").unwrap_or(defaults.max_image_count),
            max_video_count: parse_env("MAX_VIDEO_COUNT").unwrap_or(defaults.max_video_count),
            max_prompt_length: parse_env("MAX_PROMPT_LENGTH").unwrap_or(defaults.max_prompt_length),
            rate_limit_per_minute: parse_env("RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_per_minute),
            generated_dir: non_empty_env("GENERATED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.generated_dir),
            download_dir: non_empty_env("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn search_api_configured(&self) -> bool {
        self.google_search_api_key.is_some() && self.google_search_engine_id.is_some()
    }

    /// Subdirectory for Imagen output, served under `/generated/images/`
    pub fn generated_images_dir(&self) -> PathBuf {
        self.generated_dir.join("images")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.max_image_count, 10);
        assert_eq!(config.max_prompt_length, 2000);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.video_gen_model, "veo-3.0-generate-preview");
        assert_eq!(config.generated_images_dir(), PathBuf::from("generated/images"));
        assert!(!config.search_api_configured());
    }

    #[test]
    fn test_search_api_needs_both_credentials() {
        let config = AppConfig {
            google_search_api_key: Some("key".to_string()),
            ..AppConfig::default()
        };
        assert!(!config.search_api_configured());

        let config = AppConfig {
            google_search_engine_id: Some("cx".to_string()),
            ..config
        };
        assert!(config.search_api_configured());
    }
}
