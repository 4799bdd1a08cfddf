//! # Codeschool - coding school website backend
//!
//! Everything the school's marketing site and learning platform need on the
//! server side:
//! - Static site responder and CRM lead relay sharing one port
//! - Rule-based chat engine behind the site's chat widget
//! - Checkout session model with coupon discounts and hosted payment links
//! - SQLite-backed LMS (courses, lessons, quizzes, XP, parent accounts)
//! - Idempotent fixture loader for LMS content

pub mod config;
pub mod chat;
pub mod checkout;
pub mod payments;
pub mod lms;
pub mod server;
pub mod ui;
pub mod output;

mod test_support;

// Re-exports for convenient access
pub use config::SiteConfig;
pub use chat::ChatEngine;
pub use checkout::{CheckoutSession, Discount};
pub use lms::{FixtureLoader, LmsStore};

/// Result type alias for Codeschool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Codeschool operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
