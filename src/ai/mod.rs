//! AI Integration Layer
//!
//! LLM plumbing shared by every research stage.
//!
//! ## Modules
//!
//! - `provider`: LLM provider abstraction and implementations
//! - `generate`: typed structured-output primitive used for every call
//! - `validation`: JSON repair for malformed provider output
//! - `tokenizer`: token estimation and content trimming
//! - `timeout`: unified timeout helpers

pub mod generate;
pub mod provider;
pub mod timeout;
pub mod tokenizer;
pub mod validation;

pub use generate::generate_object;
pub use provider::{
    LlmProvider, LlmResponse, OpenAiProvider, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::with_timeout;
pub use tokenizer::{estimate_tokens, fits_budget, trim_content, trim_to_token_budget};
pub use validation::{JsonRepairer, extract_json_from_response};
