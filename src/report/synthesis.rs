//! Synthesis API Client
//!
//! Dedicated client for the final report synthesis: an Anthropic Messages
//! call with streaming enabled, relaying markdown to the progress sink in
//! bounded chunks as it arrives. The [`SynthesisApi`] trait is the seam;
//! when no key is configured the assembler never constructs a client and
//! falls back to the primary model.

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::SynthesisConfig;
use crate::constants::report::STREAM_CHUNK_CHARS;
use crate::progress::SafeSink;
use crate::types::{ApiTestResult, FathomError, Result};

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_REPORT_TOKENS: usize = 8192;

/// Report synthesis capability.
#[async_trait]
pub trait SynthesisApi: Send + Sync {
    /// Produce the report markdown, streaming chunks to `sink` as they
    /// arrive. Returns the complete markdown.
    async fn synthesize(
        &self,
        prompt: &str,
        sink: &SafeSink,
        cancel: &CancelToken,
    ) -> Result<String>;

    /// One minimal call to verify the API is reachable with this key.
    async fn smoke_test(&self) -> ApiTestResult;
}

// =============================================================================
// Anthropic Client
// =============================================================================

/// Anthropic Messages client for report synthesis
pub struct AnthropicSynthesis {
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicSynthesis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicSynthesis")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicSynthesis {
    /// Build a client from config. Returns `None` when no key is set -
    /// the assembler then uses the primary-model fallback.
    pub fn from_config(config: &SynthesisConfig) -> Option<Result<Self>> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())?;

        Some(Self::build(api_key, config))
    }

    fn build(api_key: String, config: &SynthesisConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FathomError::Synthesis(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            model: config.model.clone(),
            client,
        })
    }

    fn request_body(&self, prompt: &str, stream: bool, max_tokens: usize) -> Value {
        json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "stream": stream,
            "messages": [{"role": "user", "content": prompt}],
        })
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/messages", API_BASE))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| FathomError::Synthesis(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FathomError::Synthesis(format!(
                "API error ({}): {}",
                status, body
            )));
        }
        Ok(response)
    }

    /// Pull the text delta out of one SSE `data:` payload, if it is one.
    fn delta_text(event: &str) -> Option<String> {
        let payload: Value = serde_json::from_str(event).ok()?;
        if payload.get("type")?.as_str()? != "content_block_delta" {
            return None;
        }
        let delta = payload.get("delta")?;
        if delta.get("type")?.as_str()? != "text_delta" {
            return None;
        }
        Some(delta.get("text")?.as_str()?.to_string())
    }
}

/// Drain the complete UTF-8 prefix of `buffer` as a string, leaving any
/// trailing bytes of a multi-byte character split across network chunks
/// for the next read. Genuinely invalid bytes are a hard error.
fn drain_complete_utf8(buffer: &mut Vec<u8>) -> Result<String> {
    let valid_up_to = match std::str::from_utf8(buffer) {
        Ok(_) => buffer.len(),
        Err(e) if e.error_len().is_some() => {
            return Err(FathomError::Synthesis(
                "stream is not valid UTF-8".to_string(),
            ));
        }
        Err(e) => e.valid_up_to(),
    };
    let taken: Vec<u8> = buffer.drain(..valid_up_to).collect();
    // Cannot fail: `taken` is exactly the prefix validated above
    Ok(String::from_utf8(taken).unwrap_or_default())
}

#[async_trait]
impl SynthesisApi for AnthropicSynthesis {
    async fn synthesize(
        &self,
        prompt: &str,
        sink: &SafeSink,
        cancel: &CancelToken,
    ) -> Result<String> {
        debug!(model = %self.model, "starting streaming synthesis");

        let body = self.request_body(prompt, true, MAX_REPORT_TOKENS);
        let response = self.post(&body).await?;

        let mut stream = response.bytes_stream();
        let mut pending_bytes: Vec<u8> = Vec::new();
        let mut line_buffer = String::new();
        let mut markdown = String::new();
        let mut pending_chunk = String::new();

        while let Some(chunk) = stream.next().await {
            cancel.check("report synthesis")?;
            let bytes =
                chunk.map_err(|e| FathomError::Synthesis(format!("stream error: {}", e)))?;
            // Chunk boundaries can split a multi-byte character; decode only
            // the complete prefix and keep the remainder for the next chunk
            pending_bytes.extend_from_slice(&bytes);
            line_buffer.push_str(&drain_complete_utf8(&mut pending_bytes)?);

            while let Some(newline) = line_buffer.find('\n') {
                let line = line_buffer[..newline].trim().to_string();
                line_buffer.drain(..=newline);

                let Some(event) = line.strip_prefix("data:") else {
                    continue;
                };
                if let Some(text) = Self::delta_text(event.trim()) {
                    markdown.push_str(&text);
                    pending_chunk.push_str(&text);
                    if pending_chunk.len() >= STREAM_CHUNK_CHARS {
                        sink.progress(std::mem::take(&mut pending_chunk)).await;
                    }
                }
            }
        }

        if !pending_chunk.is_empty() {
            sink.progress(pending_chunk).await;
        }
        if !pending_bytes.is_empty() {
            warn!(
                bytes = pending_bytes.len(),
                "stream ended mid-character, trailing bytes dropped"
            );
        }

        if markdown.trim().is_empty() {
            return Err(FathomError::Synthesis(
                "stream produced no content".to_string(),
            ));
        }
        Ok(markdown)
    }

    async fn smoke_test(&self) -> ApiTestResult {
        let body = self.request_body(
            "Reply with the single word: ready",
            false,
            32,
        );

        match self.post(&body).await {
            Ok(response) => match response.json::<Value>().await {
                Ok(payload) => {
                    let text = payload
                        .get("content")
                        .and_then(|c| c.get(0))
                        .and_then(|block| block.get("text"))
                        .and_then(|t| t.as_str())
                        .unwrap_or_default();
                    ApiTestResult {
                        success: !text.is_empty(),
                        message: format!("synthesis API responded: {}", text),
                    }
                }
                Err(e) => ApiTestResult {
                    success: false,
                    message: format!("unreadable response: {}", e),
                },
            },
            Err(e) => {
                warn!(error = %e, "synthesis smoke test failed");
                ApiTestResult {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }
}
