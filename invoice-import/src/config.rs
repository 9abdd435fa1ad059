//! Import configuration with builder pattern
//!
//! Settings come from `<config_dir>/invoice-import/config.toml` when present,
//! then environment variables (a `.env` file is honoured), then defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::import::intake::{MIME_CSV, MIME_ODS, MIME_XLS, MIME_XLSX};

pub const ENV_API_URL: &str = "INVOICE_IMPORT_API_URL";
pub const ENV_API_TOKEN: &str = "INVOICE_IMPORT_API_TOKEN";
pub const ENV_MAX_FILE_BYTES: &str = "INVOICE_IMPORT_MAX_FILE_BYTES";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub intake: IntakeConfig,
    pub submission: SubmissionConfig,
}

/// File intake limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Largest accepted file, inclusive
    pub max_file_bytes: u64,
    pub accepted_mime_types: Vec<String>,
}

/// Submission endpoint and request defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// URL that receives the batch POST; submission is unavailable without it
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    /// Currency code used when a record has none
    pub base_currency: String,
    pub timeout_secs: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 15 * 1024 * 1024,
            accepted_mime_types: vec![
                MIME_XLSX.to_string(),
                MIME_XLS.to_string(),
                MIME_ODS.to_string(),
                MIME_CSV.to_string(),
                "application/csv".to_string(),
                "text/comma-separated-values".to_string(),
            ],
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token: None,
            base_currency: "TRY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SubmissionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ImportConfig {
    pub fn builder() -> ImportConfigBuilder {
        ImportConfigBuilder::new()
    }

    /// Default location of the config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("invoice-import")
            .join("config.toml")
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Load from the default config file and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        // A missing .env is fine
        let _ = dotenvy::dotenv();

        let mut config = if path.exists() {
            log::debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.submission.endpoint = Some(url.trim().to_string());
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.submission.api_token = Some(token.trim().to_string());
        }
        if let Some(limit) = lookup(ENV_MAX_FILE_BYTES) {
            self.intake.max_file_bytes = limit
                .trim()
                .parse()
                .with_context(|| format!("{} must be a byte count, got '{}'", ENV_MAX_FILE_BYTES, limit))?;
        }
        Ok(())
    }
}

/// Builder for ImportConfig
#[derive(Debug)]
pub struct ImportConfigBuilder {
    config: ImportConfig,
}

impl ImportConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ImportConfig::default(),
        }
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.intake.max_file_bytes = bytes;
        self
    }

    pub fn accepted_mime_types(mut self, types: Vec<String>) -> Self {
        self.config.intake.accepted_mime_types = types;
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.submission.endpoint = Some(url.into());
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.submission.api_token = Some(token.into());
        self
    }

    pub fn base_currency(mut self, code: impl Into<String>) -> Self {
        self.config.submission.base_currency = code.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.submission.timeout_secs = secs;
        self
    }

    pub fn build(self) -> ImportConfig {
        self.config
    }
}

impl Default for ImportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
