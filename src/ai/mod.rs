//! AI Integration Layer
//!
//! Provider backends, the timeout-bounded generation client and the
//! strict decoder for the idea document.

pub mod client;
pub mod decode;
pub mod provider;
pub mod timeout;

pub use client::GenerationClient;
pub use decode::{decode_ideas, ideas_schema};
pub use provider::{
    GeminiProvider, LlmProvider, LlmResponse, OllamaProvider, OpenAiProvider, ProviderConfig,
    ResponseMetadata, ResponseTiming, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::with_timeout;
