//! HTTP servers
//!
//! Two processes share this module:
//! - the site server: static files, `POST /lead` relay, `GET /health`, `POST /api/chat`
//! - the LMS API server: everything under `/lms/api`

use axum::{
    Router,
    middleware,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::chat::ChatEngine;
use crate::config::SiteConfig;
use crate::lms::{LmsStore, api::LmsState};
use crate::payments::{HostedCheckoutGateway, PaymentGateway};

pub mod cors;
pub mod error;
pub mod routes;
pub mod static_files;

pub use cors::CorsPolicy;

/// Site server state. Read-only after startup.
pub struct AppState {
    pub content_root: PathBuf,
    pub crm_endpoint: String,
    pub crm_api_key: String,
    pub chat: ChatEngine,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn from_config(config: &SiteConfig, chat: ChatEngine) -> Self {
        Self {
            content_root: config.site.content_root.clone(),
            crm_endpoint: config.crm.endpoint.clone(),
            crm_api_key: config.crm.api_key.clone(),
            chat,
            http: reqwest::Client::new(),
        }
    }
}

pub fn site_router(state: Arc<AppState>, cors_policy: CorsPolicy) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/lead", post(routes::forward_lead).fallback(error::not_found))
        .route("/api/chat", post(routes::chat))
        .fallback(static_files::serve_static)
        .layer(middleware::from_fn_with_state(cors_policy, cors::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: &SiteConfig, chat: ChatEngine) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(config, chat));
    if state.crm_api_key.is_empty() {
        tracing::warn!("CRM API key is empty; the CRM will likely reject forwarded leads");
    }

    let app = site_router(state, CorsPolicy::new(config.site.allowed_origins.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.site.port));
    tracing::info!(
        "Serving {} and relaying leads to {} on {}",
        config.site.content_root.display(),
        config.crm.endpoint,
        addr
    );

    serve(addr, app).await
}

pub async fn start_lms_server(config: &SiteConfig, store: LmsStore) -> anyhow::Result<()> {
    let gateway = HostedCheckoutGateway::from_config(&config.payments)
        .map(|g| Arc::new(g) as Arc<dyn PaymentGateway>);
    if gateway.is_none() {
        tracing::warn!("No payment gateway configured; create-link will answer 503");
    }

    let state = Arc::new(LmsState {
        store: Mutex::new(store),
        gateway,
    });

    let app = crate::lms::api::lms_router(state)
        .layer(middleware::from_fn_with_state(
            CorsPolicy::new(config.site.allowed_origins.clone()),
            cors::cors,
        ))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.lms.port));
    tracing::info!("LMS API on {} using {}", addr, config.lms.database.display());

    serve(addr, app).await
}

async fn serve(addr: SocketAddr, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server on {} shut down", addr);
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
