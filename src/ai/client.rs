//! Generation client
//!
//! Wraps a shared provider with the per-call timeout. Every way a call can
//! go wrong (transport, provider status, timeout) comes back as an `Err`
//! the orchestrator absorbs per agent.

use std::time::Duration;

use serde_json::Value;

use super::provider::{LlmResponse, SharedProvider};
use super::timeout::with_timeout;
use crate::types::Result;

#[derive(Clone)]
pub struct GenerationClient {
    provider: SharedProvider,
    timeout: Duration,
}

impl GenerationClient {
    pub fn new(provider: SharedProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Send one prompt; the raw body is returned undecoded.
    pub async fn generate(&self, prompt: &str, schema: &Value, label: &str) -> Result<LlmResponse> {
        with_timeout(
            self.timeout,
            self.provider.generate(prompt, schema),
            &format!("{} generation via {}", label, self.provider.name()),
        )
        .await
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("timeout", &self.timeout)
            .finish()
    }
}
