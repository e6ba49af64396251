//! Typed Structured-Output Primitive
//!
//! Every LLM call in the orchestrator goes through [`generate_object`]: it
//! names a JSON Schema, sends the prompt, and either returns a fully
//! deserialized value or a typed failure. Callers never see partially
//! parsed JSON.
//!
//! Retryable failures (rate limit, network, parse) get one in-place retry
//! with the category's recommended delay before the error is surfaced; the
//! research loop then applies its documented local fallback.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::provider::LlmProvider;
use crate::types::{FathomError, Result};

/// Generate a typed value from the LLM.
///
/// `operation` names the call for logs and error context ("plan",
/// "saturation", ...). The schema travels to the provider; conformance is
/// enforced here by deserialization into `T`.
pub async fn generate_object<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    operation: &str,
    prompt: &str,
    schema: &Value,
) -> Result<T> {
    match attempt::<T>(provider, operation, prompt, schema).await {
        Ok(value) => Ok(value),
        Err(err) if err.is_recoverable() => {
            let delay = match &err {
                FathomError::Llm(llm) => llm.recommended_delay(),
                _ => std::time::Duration::from_millis(500),
            };
            warn!(
                operation,
                error = %err,
                retry_in_ms = delay.as_millis() as u64,
                "LLM call failed, retrying once"
            );
            tokio::time::sleep(delay).await;
            attempt::<T>(provider, operation, prompt, schema).await
        }
        Err(err) => Err(err),
    }
}

async fn attempt<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    operation: &str,
    prompt: &str,
    schema: &Value,
) -> Result<T> {
    let response = provider.generate(prompt, schema).await?;
    debug!(
        operation,
        model = %response.model,
        tokens = response.usage.total(),
        elapsed_ms = response.elapsed_ms,
        "LLM call completed"
    );
    serde_json::from_value(response.content)
        .map_err(|e| FathomError::schema_mismatch(operation, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{LlmResponse, TokenUsage};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        value: u32,
    }

    /// Provider that fails N times before succeeding
    struct FlakyProvider {
        failures: AtomicUsize,
        content: Value,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(FathomError::Llm(crate::types::LlmError::new(
                    crate::types::ErrorCategory::Transient,
                    "temporary failure",
                )));
            }
            Ok(LlmResponse {
                content: self.content.clone(),
                usage: TokenUsage::default(),
                elapsed_ms: 1,
                model: "mock".to_string(),
            })
        }

        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "mock"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_once_then_success() {
        let provider = FlakyProvider {
            failures: AtomicUsize::new(1),
            content: json!({"value": 7}),
        };
        let answer: Answer =
            generate_object(&provider, "test", "prompt", &Value::Null).await.unwrap();
        assert_eq!(answer, Answer { value: 7 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_surface_error() {
        let provider = FlakyProvider {
            failures: AtomicUsize::new(2),
            content: json!({"value": 7}),
        };
        let result: Result<Answer> =
            generate_object(&provider, "test", "prompt", &Value::Null).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schema_mismatch_retries_then_fails() {
        let provider = FlakyProvider {
            failures: AtomicUsize::new(0),
            content: json!({"wrong_field": true}),
        };
        let result: Result<Answer> =
            generate_object(&provider, "test", "prompt", &Value::Null).await;
        assert!(matches!(
            result.unwrap_err(),
            FathomError::SchemaMismatch { .. }
        ));
    }
}
