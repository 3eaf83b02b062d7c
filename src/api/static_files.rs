//! Static asset and upload serving.
//!
//! The stylesheet and other fixed assets are embedded in the binary;
//! member uploads live on disk under the configured uploads directory.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use rust_embed::RustEmbed;
use tokio::fs;

use crate::api::middleware::AppState;

/// Embedded site assets
#[derive(RustEmbed)]
#[folder = "static/"]
#[exclude = "uploads/*"]
struct StaticAssets;

/// Serve an embedded asset under `/static/`
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    let decoded = urlencoding::decode(&path).unwrap_or_else(|_| path.as_str().into());

    match StaticAssets::get(decoded.as_ref()) {
        Some(content) => build_response(decoded.as_ref(), &content.data),
        None => not_found(),
    }
}

/// Serve an uploaded image under `/uploads/`
pub async fn serve_upload(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let decoded = urlencoding::decode(&path).unwrap_or_else(|_| path.as_str().into());
    let name = decoded.as_ref();

    // Upload names are generated server-side; refuse anything that could
    // escape the uploads directory.
    if name.is_empty() || name.contains("..") || name.starts_with('/') {
        return not_found();
    }

    let file_path = state.config.uploads.dir.join(name);
    match fs::read(&file_path).await {
        Ok(contents) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, get_content_type(name))
            .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
            .body(Body::from(contents))
            .unwrap(),
        Err(_) => not_found(),
    }
}

/// Wrap file bytes in a response with content type and caching headers.
fn build_response(path: &str, data: &[u8]) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, get_content_type(path))
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(data.to_vec()))
        .unwrap()
}

/// Plain-text 404.
fn not_found() -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from("<html><body><h1>404 Not Found</h1></body></html>"))
        .unwrap()
}

/// Map a file extension to its MIME type.
fn get_content_type(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "webp" => "image/webp",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
