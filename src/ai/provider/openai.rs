//! OpenAI API Provider
//!
//! Chat Completions in `json_object` mode. The system message pins the
//! answer to a single JSON document; the idea contract rides in the user
//! message.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{
    ErrorClassifier, LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming,
    TokenUsage, error_from_response, probe, prompt_utils,
};
use crate::constants::network as net_constants;
use crate::types::{ErrorCategory, HookError, LlmError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const PROVIDER: &str = "openai";

const SYSTEM_PROMPT: &str =
    "You are a content strategist. Always respond with a single valid JSON document.";

pub struct OpenAiProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                HookError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or llm.api_key in config"
                        .to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HookError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: config
                .api_base
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request<'a>(&'a self, user_prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: JsonMode {
                kind: "json_object",
            },
        }
    }

    /// Pull the message text out of a completion.
    ///
    /// A completion cut off by the token limit is reported as a parse error
    /// since its JSON cannot be whole.
    fn read_completion(&self, completion: ChatResponse, elapsed: Duration) -> Result<LlmResponse> {
        let choice = completion.choices.into_iter().next().ok_or_else(|| {
            parse_error("OpenAI response has no choices".to_string())
        })?;

        if choice.finish_reason.as_deref() == Some("length") {
            return Err(parse_error(format!(
                "OpenAI stopped at the {} token limit before finishing the document",
                self.max_tokens
            )));
        }

        let content = choice
            .message
            .content
            .filter(|text| !text.is_empty())
            .ok_or_else(|| parse_error("OpenAI message has no content".to_string()))?;

        let usage = completion
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse::with_metrics(
            content,
            usage,
            ResponseTiming::from_duration(elapsed),
            ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        ))
    }
}

fn parse_error(message: String) -> HookError {
    HookError::Llm(LlmError::with_provider(
        ErrorCategory::ParseError,
        message,
        PROVIDER,
    ))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        info!("Generating with OpenAI (model: {})", self.model);

        let start_time = Instant::now();
        let user_prompt = prompt_utils::build_schema_prompt(prompt, schema);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_request(&user_prompt))
            .send()
            .await
            .map_err(|e| HookError::Llm(ErrorClassifier::classify_transport(&e, PROVIDER)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, PROVIDER).await);
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| parse_error(format!("Failed to parse OpenAI response envelope: {}", e)))?;

        let result = self.read_completion(completion, start_time.elapsed())?;
        debug!("Received {} chars from OpenAI", result.content.len());
        Ok(result)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let request = self
            .client
            .get(format!("{}/models/{}", self.api_base, self.model))
            .bearer_auth(self.api_key.expose_secret());
        Ok(probe(request, PROVIDER).await)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: usize,
    response_format: JsonMode,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct JsonMode {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
