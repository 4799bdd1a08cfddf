//! Static file responder
//!
//! Maps a request path onto the content root. No caching, no ranges, no
//! directory listings. Anything that cannot be read is a 404.

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::AppState;
use super::error::json_error;

/// Content type for extensions missing from the table
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html; charset=utf-8"),
    ("htm", "text/html; charset=utf-8"),
    ("css", "text/css; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("txt", "text/plain; charset=utf-8"),
    ("xml", "application/xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("eot", "application/vnd.ms-fontobject"),
    ("pdf", "application/pdf"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
];

pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    let ext = ext.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Resolve a request path under `root`.
///
/// Returns `None` for anything that could escape the root.
pub fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;
    if decoded.contains('\0') || decoded.contains('\\') {
        return None;
    }

    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains(':') => return None,
            s => resolved.push(s),
        }
    }

    if decoded.ends_with('/') || decoded.is_empty() {
        resolved.push("index.html");
    }
    Some(resolved)
}

/// Follow symlinks and keep the target only if it still lies under `root`.
pub async fn contain_path(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = tokio::fs::canonicalize(root).await.ok()?;
    let target = tokio::fs::canonicalize(path).await.ok()?;
    target.starts_with(&root).then_some(target)
}

pub async fn serve_static(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return json_error(StatusCode::NOT_FOUND, "Not found");
    }

    let Some(path) = resolve_path(&state.content_root, uri.path()) else {
        tracing::debug!("Rejected static path {}", uri.path());
        return json_error(StatusCode::NOT_FOUND, "Not found");
    };
    let Some(path) = contain_path(&state.content_root, &path).await else {
        tracing::debug!("Static path {} is missing or outside the content root", path.display());
        return json_error(StatusCode::NOT_FOUND, "Not found");
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = HeaderValue::from_static(content_type_for(&path));
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(e) => {
            tracing::debug!("Static miss {}: {}", path.display(), e);
            json_error(StatusCode::NOT_FOUND, "Not found")
        }
    }
}
