//! Ollama Local LLM Provider
//!
//! `/api/generate` with `format: "json"` and streaming off, so one reply
//! carries the whole document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage,
    error_from_response, probe, prompt_utils,
};
use crate::types::{ErrorCategory, HookError, LlmError, Result};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3:latest";
const PROVIDER: &str = "ollama";

#[derive(Debug)]
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = endpoint(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HookError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            client,
        })
    }

    fn read_reply(&self, reply: GenerateReply, elapsed: Duration) -> Result<LlmResponse> {
        if !reply.done {
            return Err(HookError::Llm(LlmError::with_provider(
                ErrorCategory::ParseError,
                "Ollama reply is incomplete",
                PROVIDER,
            )));
        }

        Ok(LlmResponse::with_metrics(
            reply.response,
            TokenUsage::new(reply.prompt_eval_count, reply.eval_count),
            ResponseTiming::from_duration(elapsed),
            ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        ))
    }
}

/// Normalize the endpoint; only http(s) is accepted, remote hosts are logged.
fn endpoint(raw: &str) -> Result<String> {
    let url = url::Url::parse(raw)
        .map_err(|e| HookError::Config(format!("Invalid Ollama endpoint URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(HookError::Config(format!(
            "Ollama endpoint must use http or https, got: {}",
            url.scheme()
        )));
    }

    if let Some(host) = url.host_str()
        && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
    {
        warn!("Ollama endpoint is not local: {}", host);
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        info!("Generating with Ollama (model: {})", self.model);

        let start_time = Instant::now();
        let request = GenerateRequest {
            model: &self.model,
            prompt: prompt_utils::build_schema_prompt(prompt, schema),
            stream: false,
            format: "json",
            options: Options {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.api_base))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let category = if e.is_connect() || e.is_timeout() {
                    ErrorCategory::Network
                } else {
                    ErrorCategory::Unknown
                };
                HookError::Llm(LlmError::with_provider(
                    category,
                    format!("Ollama request to {} failed: {}", self.api_base, e),
                    PROVIDER,
                ))
            })?;

        if !response.status().is_success() {
            return Err(error_from_response(response, PROVIDER).await);
        }

        let reply: GenerateReply = response.json().await.map_err(|e| {
            HookError::Llm(LlmError::with_provider(
                ErrorCategory::ParseError,
                format!("Failed to parse Ollama reply: {}", e),
                PROVIDER,
            ))
        })?;

        let result = self.read_reply(reply, start_time.elapsed())?;
        debug!("Received {} chars from Ollama", result.content.len());
        Ok(result)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(probe(self.client.get(format!("{}/api/tags", self.api_base)), PROVIDER).await)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'static str,
    options: Options,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
    #[serde(default = "reply_done")]
    done: bool,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

fn reply_done() -> bool {
    true
}
