//! Origin allow-list CORS
//!
//! A listed `Origin` (or none at all) is echoed back in
//! `Access-Control-Allow-Origin`. Unlisted origins are served without CORS
//! headers. `OPTIONS` never reaches a handler: it always gets a bare 200.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Arc<Vec<String>>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins: Arc::new(allowed_origins),
        }
    }

    /// Value for `Access-Control-Allow-Origin`, if any
    pub fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        match origin {
            None => Some("*".to_string()),
            Some(o) if self.allowed_origins.iter().any(|a| a == o) => Some(o.to_string()),
            Some(_) => None,
        }
    }
}

pub async fn cors(State(policy): State<CorsPolicy>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let allow = policy.allow_origin(origin.as_deref());

    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    if let Some(value) = allow.and_then(|v| HeaderValue::from_str(&v).ok()) {
        let headers = resp.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
    } else if let Some(origin) = origin {
        tracing::debug!("Origin {} not in allow-list", origin);
    }

    resp
}
