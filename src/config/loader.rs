//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Config file (`hookforge.toml` in the working directory, or an explicit path)
//! 3. Deployment variables `PORT` and `DATABASE_PATH`
//! 4. Environment variables (`HOOKFORGE_*` prefix, `__` between sections)
//!
//! Provider API keys also fall back to `GEMINI_API_KEY` / `OPENAI_API_KEY`
//! inside the providers themselves.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::types::{HookError, Result};

const DEFAULT_CONFIG_FILE: &str = "hookforge.toml";
const ENV_PREFIX: &str = "HOOKFORGE_";

/// Output format for `config show`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → file → deployment vars → `HOOKFORGE_*`
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config: Config = Self::figment(path)?
            .extract()
            .map_err(|e| HookError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Build the merged figment without extracting it.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let file = match path {
            Some(path) if !path.exists() => {
                return Err(HookError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Some(Self::default_config_path()).filter(|p| p.exists()),
        };

        if let Some(file) = file {
            debug!("Loading config from: {}", file.display());
            figment = figment.merge(Toml::file(file));
        }

        // PORT -> server.port, DATABASE_PATH -> storage.path
        figment = figment
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
            .merge(
                Env::raw()
                    .only(&["DATABASE_PATH"])
                    .map(|_| "storage.path".into()),
            );

        // e.g. HOOKFORGE_LLM__TIMEOUT_SECS -> llm.timeout_secs
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        Ok(figment)
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Render the effective configuration. API keys are never included.
    pub fn render(config: &Config, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Json => Ok(serde_json::to_string_pretty(config)?),
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| HookError::Config(e.to_string()))
            }
        }
    }
}
