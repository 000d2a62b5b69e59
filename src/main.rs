use media_generator::{
    build_router,
    config::{AppConfig, DEFAULT_JWT_SECRET},
    db,
    services::{MemoryStatsStore, PgStatsStore, StatsStore},
    AppState, VendorClients,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = AppConfig::from_env();
    log_configuration(&config);

    for dir in [
        config.generated_dir.clone(),
        config.generated_images_dir(),
        config.download_dir.clone(),
    ] {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("Failed to create {} directory: {}", dir.display(), e);
        }
    }

    let (stats, db_pool) = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            tracing::info!("✅ Generation statistics stored in Postgres");
            (Arc::new(PgStatsStore::new(pool.clone())) as Arc<dyn StatsStore>, Some(pool))
        }
        None => {
            tracing::warn!("⚠️ DATABASE_URL not set, generation statistics are kept in memory only");
            (Arc::new(MemoryStatsStore::new()) as Arc<dyn StatsStore>, None)
        }
    };

    let vendors = VendorClients::from_config(&config).await;
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, vendors, stats, db_pool));

    let app = build_router(state);

    // ConnectInfo gives the rate limiter the caller's address
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,media_generator=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,media_generator=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🎨 Media Generator starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

fn log_configuration(config: &AppConfig) {
    let mark = |on: bool| if on { "✅" } else { "❌" };

    tracing::info!(
        "Configuration - Database: {}, OpenAI: {}, Gemini: {}, Vertex AI: {}, Custom Search: {}",
        mark(config.database_url.is_some()),
        mark(config.openai_api_key.is_some()),
        mark(config.gemini_api_key.is_some()),
        mark(config.google_cloud_project.is_some()),
        mark(config.search_api_configured())
    );
    tracing::info!(
        "Limits - images per request: {}, prompt length: {}, requests/min: {}",
        config.max_image_count,
        config.max_prompt_length,
        config.rate_limit_per_minute
    );

    if config.is_production() {
        if config.jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("⚠️ JWT_SECRET is the development default; set a real secret");
        }
        if config.admin_password_hash.is_none() {
            tracing::warn!("⚠️ ADMIN_PASSWORD_HASH not set, admin login uses the plain ADMIN_PASSWORD");
        }
    }
}
