use crate::AppState;
use axum::{
    extract::Extension,
    response::{Html, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

pub fn ui_routes() -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/api/status", get(api_status))
        .route("/api/docs", get(api_documentation))
}

struct Endpoint {
    method: &'static str,
    path: &'static str,
    description: &'static str,
    body: Option<&'static str>,
    admin: bool,
}

const fn endpoint(method: &'static str, path: &'static str, description: &'static str) -> Endpoint {
    Endpoint {
        method,
        path,
        description,
        body: None,
        admin: false,
    }
}

const fn with_body(mut e: Endpoint, body: &'static str) -> Endpoint {
    e.body = Some(body);
    e
}

const fn admin(mut e: Endpoint) -> Endpoint {
    e.admin = true;
    e
}

const SECTIONS: &[(&str, &[Endpoint])] = &[
    (
        "✍️ Prompt Tools",
        &[
            with_body(endpoint("POST", "/api/image/optimize-prompt", "Six style variants of an image prompt"), r#"{"prompt": "a cat on a sofa"}"#),
            with_body(endpoint("POST", "/api/video/optimize-prompt", "Six style variants of a video prompt"), r#"{"prompt": "waves at dusk"}"#),
            with_body(endpoint("POST", "/api/image/translate-prompt", "Translate an image prompt to English"), r#"{"prompt": "海邊的夕陽"}"#),
            with_body(endpoint("POST", "/api/video/translate-prompt", "Translate a video prompt to English"), r#"{"prompt": "城市夜景"}"#),
            with_body(endpoint("POST", "/api/prompt/analyze", "Safety analysis with a rewrite or safe alternatives"), r#"{"prompt": "...", "type": "image"}"#),
            with_body(endpoint("POST", "/api/prompt/check-length", "Length check and key elements of a prompt"), r#"{"prompt": "..."}"#),
            endpoint("GET", "/api/prompt-tips?type=image", "Prompt writing tips for images or videos"),
        ],
    ),
    (
        "🖼️ Images",
        &[
            with_body(endpoint("POST", "/api/image/generate", "Generate images with Imagen 4 or DALL-E 3"), r#"{"prompt": "...", "count": 2, "size": "1024x1024", "model": "imagen"}"#),
            endpoint("GET", "/api/image/model-options", "Image models and their settings"),
            with_body(endpoint("POST", "/api/image/search", "Search web images"), r#"{"query": "walrus", "page": 1, "per_page": 12}"#),
            with_body(endpoint("POST", "/api/image/download", "Download a search result to local storage"), r#"{"image_url": "https://...", "filename": "walrus.jpg"}"#),
            endpoint("GET", "/api/image/search-options", "Size, type and orientation filters"),
            with_body(endpoint("POST", "/api/image/calculate-price", "Price quote for an image job"), r#"{"count": 4, "quality": "standard", "size": "1024x1024", "model": "imagen"}"#),
        ],
    ),
    (
        "🎬 Videos",
        &[
            with_body(endpoint("POST", "/api/video/generate", "Generate a video with Veo or OpenAI"), r#"{"prompt": "...", "aspectRatio": "16:9", "duration": 5, "personGeneration": "allow_adult"}"#),
            endpoint("GET", "/api/video/model-options", "Video models and their settings"),
            with_body(endpoint("POST", "/api/video/calculate-price", "Price quote for a video job"), r#"{"count": 1, "quality": "high", "duration": 8, "resolution": "1080p"}"#),
            endpoint("GET", "/api/pricing", "Published price tables"),
        ],
    ),
    (
        "🛡️ Admin",
        &[
            with_body(endpoint("POST", "/api/admin/login", "Start an admin session"), r#"{"username": "admin", "password": "..."}"#),
            endpoint("GET", "/api/admin/logout", "End the admin session"),
            admin(endpoint("GET", "/api/admin/statistics", "Generation totals and success rate")),
            admin(endpoint("GET", "/api/admin/recent-generations?limit=20", "Most recent generation records")),
            admin(with_body(endpoint("POST", "/api/admin/cleanup", "Delete records older than N days"), r#"{"days": 30}"#)),
        ],
    ),
    (
        "📁 Files & Service",
        &[
            endpoint("GET", "/generated/{path}", "Generated images and videos"),
            endpoint("GET", "/static/downloaded_images/{file}", "Downloaded search images"),
            endpoint("GET", "/api/status", "Service configuration snapshot"),
        ],
    ),
];

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn render_sections() -> String {
    let mut out = String::new();
    for (title, endpoints) in SECTIONS {
        out.push_str(&format!("    <div class=\"section\">\n        <h2>{}</h2>\n", title));
        for e in endpoints.iter() {
            out.push_str(&format!(
                "        <div class=\"endpoint\">\n            <span class=\"method {}\">{}</span>\n            <strong>{}</strong>{}<br>\n            {}",
                e.method.to_lowercase(),
                e.method,
                escape(e.path),
                if e.admin { " 🔒" } else { "" },
                e.description
            ));
            if let Some(body) = e.body {
                out.push_str(&format!("<br>\n            <strong>Body:</strong> <code>{}</code>", escape(body)));
            }
            out.push_str("\n        </div>\n");
        }
        out.push_str("    </div>\n");
    }
    out
}

async fn api_documentation() -> Html<String> {
    Html(format!(
        r###"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Media Generator - API Documentation</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; line-height: 1.6; }}
        .header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 2rem; border-radius: 10px; margin-bottom: 2rem; }}
        .endpoint {{ background: #f8f9fa; border-left: 4px solid #007bff; padding: 1rem; margin: 1rem 0; border-radius: 5px; }}
        .method {{ display: inline-block; padding: 0.25rem 0.5rem; border-radius: 3px; color: white; font-weight: bold; margin-right: 0.5rem; }}
        .get {{ background: #28a745; }}
        .post {{ background: #007bff; }}
        code {{ background: #e9ecef; padding: 0.2rem 0.4rem; border-radius: 3px; }}
        .section {{ margin: 2rem 0; }}
        .auth-note {{ background: #fff3cd; border: 1px solid #ffeaa7; padding: 1rem; border-radius: 5px; margin: 1rem 0; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>🎨 Media Generator API</h1>
        <p>Prompt tools, image and video generation, image search and usage statistics</p>
    </div>

    <div class="auth-note">
        <strong>🔒 Admin endpoints need a session.</strong><br>
        Sign in through <code>/api/admin/login</code>; the session travels in the <code>admin_session</code> cookie
        or as <code>Authorization: Bearer &lt;token&gt;</code>.
    </div>

{}
</body>
</html>
"###,
        render_sections()
    ))
}

async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    let database = match &state.db_pool {
        Some(pool) => match sqlx::query("SELECT 1").fetch_one(pool).await {
            Ok(_) => "healthy",
            Err(_) => "unhealthy",
        },
        None => "in_memory",
    };
    let mode = |mock: bool| if mock { "mock" } else { "configured" };
    let search_mode = if state.image_search.uses_api() {
        "custom_search_api"
    } else {
        "web_scraping"
    };

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "services": {
            "database": database,
            "llm": {
                "status": mode(state.llm.is_mock()),
                "model": state.llm.model_name(),
            },
            "imagen": mode(state.imagen.is_mock()),
            "dalle": mode(state.dalle.is_mock()),
            "veo": mode(state.veo.is_mock()),
            "openai_video": mode(state.openai_video.is_mock()),
            "image_search": search_mode,
        },
        "limits": {
            "max_image_count": state.config.max_image_count,
            "max_prompt_length": state.config.max_prompt_length,
            "rate_limit_per_minute": state.config.rate_limit_per_minute,
        },
        "endpoints": {
            "documentation": "/api/docs",
            "status": "/api/status",
            "admin": "/admin",
        }
    }))
}

async fn landing_page() -> Html<&'static str> {
    Html(
        r###"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>🎨 Media Generator</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh; display: flex; align-items: center; justify-content: center; }
        .card { background: white; padding: 3rem; border-radius: 12px; box-shadow: 0 10px 30px rgba(0,0,0,0.15); max-width: 560px; }
        h1 { margin-top: 0; }
        ul { line-height: 2; }
        a { color: #6f42c1; }
    </style>
</head>
<body>
    <div class="card">
        <h1>🎨 Media Generator</h1>
        <p>Generate images and short videos from text prompts, polish prompts in six styles, and search the web for reference images.</p>
        <ul>
            <li><a href="/api/docs">API documentation</a></li>
            <li><a href="/api/status">Service status</a></li>
            <li><a href="/api/prompt-tips?type=image">Image prompt tips</a> · <a href="/api/prompt-tips?type=video">Video prompt tips</a></li>
            <li><a href="/admin">Admin console</a></li>
        </ul>
    </div>
</body>
</html>
"###,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docs_list_every_section() {
        let html = render_sections();
        assert!(html.contains("/api/image/generate"));
        assert!(html.contains("/api/admin/statistics</strong> 🔒"));
        assert!(html.contains("<span class=\"method post\">POST</span>"));
        assert!(!html.contains("/api/image/generate</strong> 🔒"));
    }
}
