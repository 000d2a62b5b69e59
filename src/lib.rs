pub mod config;
pub mod db;
pub mod error;
pub mod gemini_client;
pub mod google_search_client;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openai_client;
pub mod services;
pub mod vertex_client;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Extension, Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use config::AppConfig;
use gemini_client::GeminiClient;
use google_search_client::GoogleSearchClient;
use middleware::logging::request_logging_middleware;
use middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use openai_client::OpenAiClient;
use services::{
    DalleService, ImageGenerator, ImageSearchService, ImagenService, LlmProvider, LlmService,
    MemoryStatsStore, OpenAiVideoService, PromptAnalyzer, PromptOptimizer, StatsStore,
    VeoService, VideoGenerator,
};
use vertex_client::VertexClient;

/// Login attempts allowed per IP per minute.
pub const LOGIN_ATTEMPTS_PER_MINUTE: u32 = 10;

/// Vendor clients that could be built from the environment.
#[derive(Clone, Default)]
pub struct VendorClients {
    pub openai: Option<OpenAiClient>,
    pub gemini: Option<GeminiClient>,
    pub vertex: Option<VertexClient>,
}

impl VendorClients {
    pub async fn from_config(config: &AppConfig) -> Self {
        let openai = config.openai_api_key.clone().map(|key| {
            tracing::info!("✅ OpenAI client configured (text model: {})", config.openai_text_model);
            OpenAiClient::new(key, config.openai_text_model.clone(), config.api_timeout)
        });
        if openai.is_none() {
            tracing::warn!("⚠️ OPENAI_API_KEY not set, DALL-E and OpenAI chat run in mock mode");
        }

        let gemini = config.gemini_api_key.clone().map(|key| {
            tracing::info!("✅ Gemini client configured (model: {})", config.gemini_model);
            GeminiClient::new(key, config.gemini_model.clone(), config.api_timeout)
        });

        let vertex = match &config.google_cloud_project {
            Some(project) => match VertexClient::new(
                project.clone(),
                config.google_cloud_location.clone(),
                config.api_timeout,
            )
            .await
            {
                Ok(client) => {
                    tracing::info!(
                        "✅ Vertex AI client configured (project: {}, location: {})",
                        project,
                        config.google_cloud_location
                    );
                    Some(client)
                }
                Err(e) => {
                    tracing::error!("❌ Vertex AI credentials unavailable: {}", e);
                    None
                }
            },
            None => {
                tracing::warn!("⚠️ GOOGLE_CLOUD_PROJECT not set, Imagen and Veo run in mock mode");
                None
            }
        };

        Self {
            openai,
            gemini,
            vertex,
        }
    }

    /// Picks the text model named by `LLM_PROVIDER`, falling back to any
    /// configured vendor and finally to canned responses.
    fn llm(&self, preferred: &str) -> LlmService {
        let openai = self
            .openai
            .clone()
            .map(|c| Arc::new(c) as Arc<dyn LlmProvider>);
        let gemini = self
            .gemini
            .clone()
            .map(|c| Arc::new(c) as Arc<dyn LlmProvider>);

        let provider = if preferred == "gemini" {
            gemini.or(openai)
        } else {
            openai.or(gemini)
        };

        match provider {
            Some(provider) => LlmService::new(provider),
            None => {
                tracing::warn!("⚠️ No LLM vendor configured, prompt tools use mock responses");
                LlmService::mock()
            }
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub llm: LlmService,
    pub optimizer: PromptOptimizer,
    pub analyzer: PromptAnalyzer,
    pub dalle: Arc<dyn ImageGenerator>,
    pub imagen: Arc<dyn ImageGenerator>,
    pub veo: Arc<dyn VideoGenerator>,
    pub openai_video: Arc<dyn VideoGenerator>,
    pub image_search: ImageSearchService,
    pub stats: Arc<dyn StatsStore>,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        vendors: VendorClients,
        stats: Arc<dyn StatsStore>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let llm = vendors.llm(&config.llm_provider);
        let generated = config.generated_dir.clone();

        let dalle = DalleService::new(
            vendors.openai.clone(),
            config.openai_image_model.clone(),
            generated.clone(),
        );
        let imagen = ImagenService::new(
            vendors.vertex.clone(),
            config.image_gen_model.clone(),
            config.generated_images_dir(),
        );
        let veo = VeoService::new(vendors.vertex.clone(), &config.video_gen_model, generated.clone());
        let openai_video = OpenAiVideoService::new(config.openai_video_model.clone(), generated);

        let search_client = GoogleSearchClient::new(
            config.google_search_api_key.clone(),
            config.google_search_engine_id.clone(),
            config.api_timeout,
        );
        let image_search = ImageSearchService::new(search_client, config.download_dir.clone());

        Self {
            optimizer: PromptOptimizer::new(llm.clone()),
            analyzer: PromptAnalyzer::new(llm.clone()),
            llm,
            dalle: Arc::new(dalle),
            imagen: Arc::new(imagen),
            veo: Arc::new(veo),
            openai_video: Arc::new(openai_video),
            image_search,
            stats,
            db_pool,
            config,
        }
    }

    /// Every vendor in mock mode with an in-memory stats store.
    pub fn offline(config: AppConfig) -> Self {
        Self::new(
            config,
            VendorClients::default(),
            Arc::new(MemoryStatsStore::new()),
            None,
        )
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let generation_limiter = RateLimiter::per_minute(state.config.rate_limit_per_minute);
    let login_limiter = RateLimiter::per_minute(LOGIN_ATTEMPTS_PER_MINUTE);

    let generation_routes = Router::new()
        .merge(handlers::prompt::prompt_routes())
        .merge(handlers::image::image_routes())
        .merge(handlers::video::video_routes())
        .layer(from_fn_with_state(generation_limiter, rate_limit_middleware));

    let login_routes = handlers::auth::login_routes()
        .layer(from_fn_with_state(login_limiter, rate_limit_middleware));

    Router::new()
        .merge(handlers::ui::ui_routes())
        .merge(handlers::files::file_routes())
        .merge(handlers::tips::tips_routes())
        .merge(handlers::auth::logout_routes())
        .merge(handlers::admin::admin_routes())
        .merge(generation_routes)
        .merge(login_routes)
        .layer(from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
