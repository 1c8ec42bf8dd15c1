//! Configuration Types
//!
//! All configuration structures with sensible defaults. Secrets have no
//! defaults and are never serialized.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::agents::{AgentDefinition, AgentRegistry, PromptBuilder};
use crate::ai::ProviderConfig;
use crate::constants::{prompt, server, storage};
use crate::pipeline::StatusRetryPolicy;
use crate::storage::PoolConfig;
use crate::types::{HookError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// SQLite database and pool settings
    pub storage: StorageConfig,

    /// LLM provider settings
    pub llm: ProviderConfig,

    /// Orchestrator and queue settings
    pub pipeline: PipelineConfig,

    /// Replaces the built-in agent catalog when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<AgentDefinition>>,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `HookError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(HookError::Config(
                "server.port must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(HookError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(HookError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.storage.pool.max_size == 0 {
            return Err(HookError::Config(
                "storage.pool.max_size must be greater than 0".to_string(),
            ));
        }

        if self.storage.pool.connection_timeout_secs == 0 {
            return Err(HookError::Config(
                "storage.pool.connection_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let pipeline = &self.pipeline;
        if pipeline.max_input_chars == 0 || pipeline.ideas_per_agent == 0 {
            return Err(HookError::Config(
                "pipeline.max_input_chars and pipeline.ideas_per_agent must be greater than 0"
                    .to_string(),
            ));
        }

        if pipeline.status_retry.max_attempts == 0 {
            return Err(HookError::Config(
                "pipeline.status_retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if pipeline.status_retry.min_delay_ms > pipeline.status_retry.max_delay_ms {
            return Err(HookError::Config(format!(
                "pipeline.status_retry.min_delay_ms ({}) exceeds max_delay_ms ({})",
                pipeline.status_retry.min_delay_ms, pipeline.status_retry.max_delay_ms
            )));
        }

        if pipeline.queue_capacity == 0 {
            return Err(HookError::Config(
                "pipeline.queue_capacity must be greater than 0".to_string(),
            ));
        }

        if self.agents.is_some() {
            self.registry()?;
        }

        Ok(())
    }

    pub fn prompt_builder(&self) -> PromptBuilder {
        PromptBuilder::new(
            self.pipeline.max_input_chars,
            self.pipeline.ideas_per_agent,
        )
    }

    /// Effective agent catalog: configured personas, or the built-in four.
    pub fn registry(&self) -> Result<AgentRegistry> {
        match &self.agents {
            Some(definitions) => {
                AgentRegistry::from_definitions(definitions.clone(), self.prompt_builder())
            }
            None => Ok(AgentRegistry::builtin(self.prompt_builder())),
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body
    pub body_limit_bytes: usize,
    /// Extra static files served under `/static`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
            body_limit_bytes: server::BODY_LIMIT_BYTES,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub path: PathBuf,
    pub pool: PoolConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(storage::DEFAULT_DB_PATH),
            pool: PoolConfig::default(),
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Characters of site text and of comment text kept in each prompt
    pub max_input_chars: usize,
    pub ideas_per_agent: usize,
    /// Backoff for the final status write
    pub status_retry: StatusRetryPolicy,
    /// Jobs buffered between intake and worker
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_input_chars: prompt::MAX_INPUT_CHARS,
            ideas_per_agent: prompt::IDEAS_PER_AGENT,
            status_retry: StatusRetryPolicy::default(),
            queue_capacity: server::QUEUE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.generation_timeout(), Duration::from_secs(120));
        assert_eq!(config.registry().unwrap().len(), 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.status_retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_catalog() {
        let mut config = Config::default();
        config.agents = Some(vec![]);
        assert!(config.validate().is_err());

        config.agents = Some(vec![
            AgentDefinition::new("Twin", "a", "b"),
            AgentDefinition::new("Twin", "c", "d"),
        ]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate agent name"));
    }

    #[test]
    fn test_serialized_config_omits_api_key() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(!toml.contains("sk-secret"));
        assert!(toml.contains("[server]"));
    }
}
