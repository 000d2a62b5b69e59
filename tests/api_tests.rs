//! Router tests against an offline app: every vendor in mock mode and an
//! in-memory stats store.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use media_generator::{build_router, config::AppConfig, AppState};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> AppConfig {
    let root = std::env::temp_dir().join(format!("media_generator_test_{}", uuid::Uuid::new_v4()));
    AppConfig {
        generated_dir: root.join("generated"),
        download_dir: root.join("downloads"),
        ..AppConfig::default()
    }
}

fn test_app(config: AppConfig) -> Router {
    build_router(Arc::new(AppState::offline(config)))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn login_cookie(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/login",
            json!({"username": "admin", "password": "admin123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_index_and_docs() {
    let app = test_app(test_config());

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/docs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_reports_mock_vendors() {
    let app = test_app(test_config());
    let (status, body) = send(&app, get("/api/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
    assert_eq!(body["services"]["database"], "in_memory");
    assert_eq!(body["services"]["imagen"], "mock");
    assert_eq!(body["services"]["llm"]["status"], "mock");
}

#[tokio::test]
async fn test_optimize_prompt_validation() {
    let app = test_app(test_config());

    let (status, body) = send(&app, post_json("/api/image/optimize-prompt", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please provide a prompt");

    let (status, body) =
        send(&app, post_json("/api/video/optimize-prompt", json!({"prompt": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Prompt cannot be empty");

    let long = "x".repeat(2001);
    let (status, _) =
        send(&app, post_json("/api/image/translate-prompt", json!({"prompt": long}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_optimize_prompt_returns_six_variants() {
    let app = test_app(test_config());
    let (status, body) = send(
        &app,
        post_json("/api/image/optimize-prompt", json!({"prompt": "a cat on a sofa"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["original_prompt"], "a cat on a sofa");
    assert_eq!(body["optimizations"].as_array().unwrap().len(), 6);
    assert_eq!(body["style_names"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_translate_prompt_in_mock_mode() {
    let app = test_app(test_config());
    let (status, body) = send(
        &app,
        post_json("/api/video/translate-prompt", json!({"prompt": "海邊的夕陽"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["language"], "en");
    assert!(!body["translated_prompt"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_analyze_prompt_safe_and_unsafe() {
    let app = test_app(test_config());

    let (status, body) = send(
        &app,
        post_json("/api/prompt/analyze", json!({"prompt": "a sunny beach", "type": "image"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "safe");
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &app,
        post_json("/api/prompt/analyze", json!({"prompt": "a bomb in the city", "type": "video"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unsafe");
    assert!(body["suggestions"]["option_a"]["prompt"].is_string());

    let (status, body) =
        send(&app, post_json("/api/prompt/analyze", json!({"prompt": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "EMPTY_PROMPT");
}

#[tokio::test]
async fn test_image_count_limits() {
    let app = test_app(test_config());

    for count in [0, 11] {
        let (status, body) = send(
            &app,
            post_json("/api/image/generate", json!({"prompt": "a walrus", "count": count})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Image count must be between 1 and 10");
    }
}

#[tokio::test]
async fn test_mock_dalle_generation_is_served_and_recorded() {
    let config = test_config();
    let app = test_app(config);

    let (status, body) = send(
        &app,
        post_json(
            "/api/image/generate",
            json!({"prompt": "a walrus on ice", "count": 2, "model": "dall-e-3"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["mock_mode"], true);

    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);

    let url = images[0]["url"].as_str().unwrap();
    assert!(url.starts_with("/generated/dalle_mock_"));
    let response = app.clone().oneshot(get(url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let cookie = login_cookie(&app).await;
    let request = Request::builder()
        .uri("/api/admin/recent-generations?limit=5")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let generation = &body["generations"][0];
    assert_eq!(generation["generation_type"], "image");
    assert_eq!(generation["model_name"], "DALL-E 3");
    assert_eq!(generation["status"], "success");
    assert_eq!(generation["file_count"], 2);
}

#[tokio::test]
async fn test_mock_imagen_generation() {
    let app = test_app(test_config());
    let (status, body) = send(
        &app,
        post_json(
            "/api/image/generate",
            json!({"prompt": "mountain lake", "count": 5, "model": "imagen"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["service"], "mock");
    assert_eq!(body["images"].as_array().unwrap().len(), 5);
    assert!(body["images"][0]["url"]
        .as_str()
        .unwrap()
        .starts_with("/generated/images/imagen4_mock_"));
}

#[tokio::test]
async fn test_image_model_defaults_to_dalle() {
    let app = test_app(test_config());
    let (status, body) = send(
        &app,
        post_json("/api/image/generate", json!({"prompt": "a lighthouse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["images"][0]["url"]
        .as_str()
        .unwrap()
        .starts_with("/generated/dalle_mock_"));

    let cookie = login_cookie(&app).await;
    let request = Request::builder()
        .uri("/api/admin/recent-generations?limit=1")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, request).await;
    assert_eq!(body["generations"][0]["model_name"], "DALL-E 3");

    let (_, body) = send(&app, get("/api/image/model-options")).await;
    assert_eq!(body["default"], "dall-e-3");
}

#[tokio::test]
async fn test_video_parameter_validation() {
    let app = test_app(test_config());

    let (status, _) = send(
        &app,
        post_json("/api/video/generate", json!({"prompt": "waves", "aspectRatio": "4:3"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json("/api/video/generate", json!({"prompt": "waves", "duration": 12})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json("/api/video/generate", json!({"prompt": "waves", "personGeneration": "all"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_api_requires_session() {
    let app = test_app(test_config());

    let (status, body) = send(&app, get("/api/admin/statistics")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin privileges required");

    let request = Request::builder()
        .uri("/api/admin/statistics")
        .header(header::AUTHORIZATION, "Bearer forged.token.value")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_login_flow() {
    let app = test_app(test_config());

    let (status, body) = send(&app, post_json("/api/admin/login", json!({"username": "admin"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide username and password");

    let (status, body) = send(
        &app,
        post_json("/api/admin/login", json!({"username": " ", "password": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username and password cannot be empty");

    // whitespace is a password like any other; it just has to be the right one
    let (status, body) = send(
        &app,
        post_json("/api/admin/login", json!({"username": "admin", "password": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid username or password");

    let (status, body) = send(
        &app,
        post_json("/api/admin/login", json!({"username": "admin", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let cookie = login_cookie(&app).await;
    let request = Request::builder()
        .uri("/api/admin/statistics")
        .header(header::COOKIE, cookie.clone())
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statistics"]["total_generations"], 0);
    assert_eq!(body["statistics"]["success_rate"], 0.0);

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/cleanup")
        .header(header::COOKIE, cookie.clone())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"days": 7}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 0);
    assert_eq!(body["days"], 7);

    let request = Request::builder()
        .uri("/admin/login")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin");
}

#[tokio::test]
async fn test_admin_pages_and_logout_redirect() {
    let app = test_app(test_config());

    let response = app.clone().oneshot(get("/admin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin/login");

    let response = app.clone().oneshot(get("/admin/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/admin/logout")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("admin_session="));
}

#[tokio::test]
async fn test_price_quotes() {
    let app = test_app(test_config());

    let (status, body) = send(
        &app,
        post_json(
            "/api/image/calculate-price",
            json!({"count": 1, "quality": "standard", "size": "1024x1024", "model": "dall-e-3"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cost_breakdown"]["unit_price"], "$0.04");

    let (status, body) = send(
        &app,
        post_json("/api/video/calculate-price", json!({"quality": "cinema"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_QUALITY");

    let (status, body) = send(&app, get("/api/pricing")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pricing"]["image_pricing"]["standard"].is_object());
}

#[tokio::test]
async fn test_catalogues_and_tips() {
    let app = test_app(test_config());

    let (status, body) = send(&app, get("/api/image/model-options")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, get("/api/video/model-options")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["durations"], json!([5, 6, 7, 8]));

    let (status, body) = send(&app, get("/api/image/search-options")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orientations"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, get("/api/prompt-tips?type=video")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "video");
    assert!(body["tips"]["camera_movements"].is_array());
}

#[tokio::test]
async fn test_search_and_download_validation() {
    let app = test_app(test_config());

    let (status, body) = send(&app, post_json("/api/image/search", json!({"query": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please provide a search keyword");

    let (status, _) = send(&app, post_json("/api/image/download", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json("/api/image/download", json!({"image_url": "file:///etc/passwd"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_rejects_huge_pages() {
    let app = test_app(test_config());

    for page in [json!(101), json!(4294967295u64), json!(4294967296u64), json!(i64::MAX)] {
        let (status, body) = send(
            &app,
            post_json("/api/image/search", json!({"query": "walrus", "page": page, "per_page": 30})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "page {}", page);
        assert_eq!(body["error"], "Page must be between 1 and 100");
    }
}

#[tokio::test]
async fn test_admin_cleanup_bounds_days() {
    let app = test_app(test_config());
    let cookie = login_cookie(&app).await;

    let cleanup = |days: Value| {
        Request::builder()
            .method("POST")
            .uri("/api/admin/cleanup")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, cookie.clone())
            .body(Body::from(json!({"days": days}).to_string()))
            .unwrap()
    };

    for days in [json!(0), json!(-5), json!(36501), json!(i64::MAX / 1000), json!(i64::MAX)] {
        let (status, body) = send(&app, cleanup(days.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "days {}", days);
        assert_eq!(body["error"], "days must be between 1 and 36500");
    }

    let (status, body) = send(&app, cleanup(json!(36500))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 0);
    assert_eq!(body["days"], 36500);
}

#[tokio::test]
async fn test_generated_files() {
    let config = test_config();
    let generated: PathBuf = config.generated_dir.clone();
    std::fs::create_dir_all(&generated).unwrap();
    std::fs::write(generated.join("clip.mp4"), b"not really a video").unwrap();
    let app = test_app(config);

    let response = app.clone().oneshot(get("/generated/clip.mp4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");

    let (status, body) = send(&app, get("/generated/missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "File not found");

    let (status, _) = send(&app, get("/static/downloaded_images/nothing.jpg")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generation_routes_are_rate_limited() {
    let config = AppConfig {
        rate_limit_per_minute: 2,
        ..test_config()
    };
    let app = test_app(config);

    for _ in 0..2 {
        let (status, _) = send(&app, post_json("/api/image/optimize-prompt", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = send(&app, post_json("/api/image/optimize-prompt", json!({}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["retry_after"], 60);

    // status and docs sit outside the limiter
    let (status, _) = send(&app, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
}
