//! Service configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Every section is `#[serde(default)]`, so a partial file (or no
//! file at all) yields a runnable development configuration with the
//! in-process usage store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OintmentError, Result};
use crate::usage::PlanLimits;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ointment.toml";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: 127.0.0.1).
    pub bind: String,
    pub port: u16,
    /// Dashboard origin allowed by CORS. `None` disables the CORS layer.
    pub cors_origin: Option<String>,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            cors_origin: None,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Usage store settings. Leaving `url` unset selects the in-process store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

/// Marketplace verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// HMAC key for purchase tokens and webhook signatures.
    pub shared_secret: Option<String>,
    /// User reported by `GET /usage-overview` when no `userId` is given.
    pub demo_user_id: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            demo_user_id: "demo-user".to_string(),
        }
    }
}

/// Optional overrides of the marketplace plan limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOverrides {
    pub max_sessions: Option<u32>,
    pub max_project_submissions_per_month: Option<u32>,
    pub max_runs_per_core: Option<u32>,
}

impl PlanOverrides {
    /// Default limits with any configured overrides applied.
    pub fn limits(&self) -> PlanLimits {
        let defaults = PlanLimits::default();
        PlanLimits {
            max_sessions: self.max_sessions.unwrap_or(defaults.max_sessions),
            max_project_submissions_per_month: self
                .max_project_submissions_per_month
                .unwrap_or(defaults.max_project_submissions_per_month),
            max_runs_per_core: self.max_runs_per_core.unwrap_or(defaults.max_runs_per_core),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub marketplace: MarketplaceConfig,
    pub plan: PlanOverrides,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from `path` (or [`DEFAULT_CONFIG_FILE`] if it exists), then apply
    /// process environment overrides.
    ///
    /// An explicitly given path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with an explicit environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load_from_path(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Parse a TOML config file without applying environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| OintmentError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| OintmentError::Config(format!("parse {}: {e}", path.display())))
    }

    /// Apply overrides from `lookup` (normally `std::env::var`). Empty
    /// values count as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = get("OINTMENT_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = get("OINTMENT_PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid OINTMENT_PORT"),
            }
        }
        if let Some(url) = get("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(secret) = get("MARKETPLACE_SHARED_SECRET") {
            self.marketplace.shared_secret = Some(secret);
        }
        if let Some(user) = get("OINTMENT_DEMO_USER_ID") {
            self.marketplace.demo_user_id = user;
        }
        if let Some(format) = get("OINTMENT_LOG_FORMAT") {
            match format.trim().to_ascii_lowercase().as_str() {
                "json" => self.log_format = LogFormat::Json,
                "pretty" => self.log_format = LogFormat::Pretty,
                other => tracing::warn!(value = %other, "Ignoring invalid OINTMENT_LOG_FORMAT"),
            }
        }
    }

    /// `bind:port` listen address.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
