//! LLM Response Validation
//!
//! JSON repair for malformed provider output. Schema conformance itself is
//! enforced by typed deserialization in [`crate::ai::generate`].

mod json_repair;

pub use json_repair::{JsonRepairer, extract_json_from_response};
