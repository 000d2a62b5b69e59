use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

pub fn file_routes() -> Router {
    Router::new()
        .route("/generated/*path", get(serve_generated))
        .route("/static/downloaded_images/:file", get(serve_downloaded))
}

/// Joins a request path onto `root`, refusing anything that could leave it.
pub fn resolve_under(root: &FsPath, requested: &str) -> Option<PathBuf> {
    let relative = FsPath::new(requested);
    if requested.is_empty()
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

pub fn content_type_for(path: &FsPath) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

async fn stream_file(root: &FsPath, requested: &str) -> ApiResult<Response> {
    let file_path = resolve_under(root, requested).ok_or_else(|| {
        tracing::warn!("🚫 Rejected file path: {}", requested);
        ApiError::not_found("File not found")
    })?;

    let file = match tokio::fs::File::open(&file_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("File not found"))
        }
        Err(e) => {
            tracing::error!("Failed to open {} for streaming: {}", file_path.display(), e);
            return Err(ApiError::internal(format!("Failed to open file: {}", e)));
        }
    };

    let is_file = file.metadata().await.map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        return Err(ApiError::not_found("File not found"));
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&file_path))
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(axum::body::Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

async fn serve_generated(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    stream_file(&state.config.generated_dir, &path).await
}

async fn serve_downloaded(
    Extension(state): Extension<Arc<AppState>>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    stream_file(&state.config.download_dir, &file).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_under_rejects_traversal() {
        let root = FsPath::new("generated");
        assert_eq!(
            resolve_under(root, "images/a.png"),
            Some(PathBuf::from("generated/images/a.png"))
        );
        assert_eq!(resolve_under(root, "../secret.txt"), None);
        assert_eq!(resolve_under(root, "images/../../x"), None);
        assert_eq!(resolve_under(root, "/etc/passwd"), None);
        assert_eq!(resolve_under(root, ""), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(FsPath::new("a.PNG")), "image/png");
        assert_eq!(content_type_for(FsPath::new("clip.mp4")), "video/mp4");
        assert_eq!(content_type_for(FsPath::new("notes")), "application/octet-stream");
    }
}
