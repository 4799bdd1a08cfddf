//! Site configuration
//!
//! Loaded once at process start from `codeschool.toml` (when present), then
//! overridden from `CODESCHOOL_*` environment variables. The resulting
//! [`SiteConfig`] is handed to the routers explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub crm: CrmSection,
    pub lms: LmsSection,
    pub payments: PaymentsSection,
    pub chat: ChatSection,
    pub secrets: SecretsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub port: u16,
    pub content_root: PathBuf,
    pub allowed_origins: Vec<String>,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            port: 3000,
            content_root: PathBuf::from("public"),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmSection {
    pub endpoint: String,
    pub api_key: String,
}

impl Default for CrmSection {
    fn default() -> Self {
        Self {
            endpoint: "https://crm.example.com/api/leads".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LmsSection {
    pub port: u16,
    pub database: PathBuf,
    /// Base URL the checkout client uses to reach `/lms/api`.
    pub public_url: String,
}

impl Default for LmsSection {
    fn default() -> Self {
        Self {
            port: 3001,
            database: default_database_path_in(Path::new(".")),
            public_url: "http://localhost:3001".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsSection {
    /// Hosted checkout endpoint. Empty disables link creation.
    pub endpoint: String,
    pub api_key: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl Default for PaymentsSection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            currency: "ILS".to_string(),
            success_url: "http://localhost:3000/payment-success.html".to_string(),
            cancel_url: "http://localhost:3000/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChatSection {
    /// Optional TOML rule table replacing the built-in rules.
    pub rules_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SecretsSection {
    pub openai_api_key: Option<String>,
    pub cloudflare_api_token: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("codeschool.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join("data").join("lms.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SiteConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SiteConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Load the config file (or defaults) and apply environment overrides.
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<SiteConfig> {
    let mut config = match load_config(path)? {
        Some(config) => config,
        None => {
            tracing::info!("No config file found, using defaults");
            SiteConfig::default()
        }
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

impl SiteConfig {
    /// Apply `CODESCHOOL_*` (and the two third-party token) overrides.
    ///
    /// Takes a lookup function so tests can inject variables without
    /// touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("CODESCHOOL_PORT") {
            match port.parse() {
                Ok(port) => self.site.port = port,
                Err(e) => tracing::warn!("Invalid CODESCHOOL_PORT value {port:?}: {e}"),
            }
        }
        if let Some(root) = get("CODESCHOOL_CONTENT_ROOT") {
            self.site.content_root = PathBuf::from(root);
        }
        if let Some(origins) = get("CODESCHOOL_ALLOWED_ORIGINS") {
            self.site.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(endpoint) = get("CODESCHOOL_CRM_ENDPOINT") {
            self.crm.endpoint = endpoint;
        }
        if let Some(key) = get("CODESCHOOL_CRM_API_KEY") {
            self.crm.api_key = key;
        }
        if let Some(port) = get("CODESCHOOL_LMS_PORT") {
            match port.parse() {
                Ok(port) => self.lms.port = port,
                Err(e) => tracing::warn!("Invalid CODESCHOOL_LMS_PORT value {port:?}: {e}"),
            }
        }
        if let Some(db) = get("CODESCHOOL_LMS_DATABASE") {
            self.lms.database = PathBuf::from(db);
        }
        if let Some(endpoint) = get("CODESCHOOL_PAYMENT_ENDPOINT") {
            self.payments.endpoint = endpoint;
        }
        if let Some(key) = get("CODESCHOOL_PAYMENT_API_KEY") {
            self.payments.api_key = key;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.secrets.openai_api_key = Some(key);
        }
        if let Some(token) = get("CLOUDFLARE_API_TOKEN") {
            self.secrets.cloudflare_api_token = Some(token);
        }
    }
}

pub fn write_config(path: &Path, config: &SiteConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
