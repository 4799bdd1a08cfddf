//! Chat Engine - keyword rules behind the site's chat widget
//!
//! Each rule pairs a regular expression with a canned answer. Messages are
//! lowercased and tested against the rules in order; the first match wins.
//! When nothing matches, the fallback prompt is returned. No state is kept
//! between turns.

pub mod rules;

use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// One pattern → response rule
#[derive(Debug, Clone)]
pub struct ChatRule {
    pub pattern: Regex,
    pub response: String,
}

impl ChatRule {
    pub fn new(pattern: &str, response: impl Into<String>) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid chat pattern {:?}: {}", pattern, e)))?;
        Ok(Self {
            pattern,
            response: response.into(),
        })
    }
}

/// First-match-wins rule table
#[derive(Debug, Clone)]
pub struct ChatEngine {
    rules: Vec<ChatRule>,
    fallback: String,
}

#[derive(Deserialize)]
struct RuleFile {
    fallback: Option<String>,
    #[serde(default, rename = "rule")]
    rules: Vec<RuleDef>,
}

#[derive(Deserialize)]
struct RuleDef {
    pattern: String,
    response: String,
}

impl Default for ChatEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl ChatEngine {
    pub fn new(rules: Vec<ChatRule>, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// Engine with the built-in school rule table
    pub fn with_default_rules() -> Self {
        Self::new(rules::default_rules(), rules::FALLBACK)
    }

    /// Parse a TOML rule table (`[[rule]]` entries plus optional `fallback`).
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(contents)?;
        let rules = file
            .rules
            .into_iter()
            .map(|def| ChatRule::new(&def.pattern, def.response))
            .collect::<Result<Vec<_>>>()?;

        if rules.is_empty() {
            return Err(Error::Config("chat rule table has no rules".to_string()));
        }

        Ok(Self::new(
            rules,
            file.fallback.unwrap_or_else(|| rules::FALLBACK.to_string()),
        ))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let engine = Self::from_toml(&contents)?;
        tracing::info!("Loaded {} chat rules from {}", engine.rules.len(), path.display());
        Ok(engine)
    }

    /// Built-in rules, or the file's rules when a path is configured.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::with_default_rules()),
        }
    }

    /// Answer a single message.
    pub fn respond(&self, message: &str) -> &str {
        let normalized = message.trim().to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(&normalized))
            .map(|rule| rule.response.as_str())
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
