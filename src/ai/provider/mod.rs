//! LLM Provider Abstraction
//!
//! Defines the `LlmProvider` trait for structured JSON output generation.
//! The orchestrator never talks to a concrete API directly; it goes through
//! this seam so tests can script responses.

mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::Result;

// =============================================================================
// LLM Response
// =============================================================================

/// LLM response: structured content plus usage metrics for logging.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated content (structured JSON)
    pub content: Value,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Wall-clock time of the call, milliseconds
    pub elapsed_ms: u64,
    /// Model that produced the response
    pub model: String,
}

impl LlmResponse {
    /// Create response with content only (usage unknown)
    pub fn content_only(content: Value) -> Self {
        Self {
            content,
            usage: TokenUsage::default(),
            elapsed_ms: 0,
            model: String::new(),
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Shared LLM provider handle passed through the orchestrator.
pub type SharedProvider = Arc<dyn LlmProvider>;

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// LLM provider trait for structured output generation.
///
/// `schema` is a JSON Schema the response must match; providers embed it in
/// the system prompt and enable JSON response mode where supported. Schema
/// conformance is re-checked by the caller via deserialization.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate structured output matching `schema`
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared provider from configuration.
///
/// Inability to construct a handle is fatal and propagates to the caller.
pub fn create_provider(config: &LlmConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        _ => Err(crate::types::FathomError::Config(format!(
            "Unknown provider: {}. Supported: openai",
            config.provider
        ))),
    }
}
