//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/fathom/) and project (.fathom/) level
//! configuration plus `FATHOM_*` environment overrides.

use serde::{Deserialize, Serialize};

use crate::constants::{network, tokens};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Research loop settings
    pub research: ResearchConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Web search/scrape service settings
    pub search: SearchConfig,

    /// Report synthesis settings
    pub synthesis: SynthesisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            research: ResearchConfig::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `FathomError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        self.research.validate()?;

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::types::FathomError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(crate::types::FathomError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.search.timeout_secs == 0 || self.search.result_limit == 0 {
            return Err(crate::types::FathomError::Config(
                "search timeout_secs and result_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Research Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Sub-queries issued per depth iteration (1..=5)
    pub breadth: u32,

    /// Refinement rounds per sub-question (1..=3)
    pub depth: u32,

    /// Wall-clock budget in minutes
    pub max_duration_minutes: u64,

    /// Tokenizer context window for assembled search content
    pub context_window_tokens: usize,

    /// Per-page content cap in characters
    pub content_trim_chars: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            breadth: 3,
            depth: 2,
            max_duration_minutes: 30,
            context_window_tokens: tokens::CONTEXT_WINDOW,
            content_trim_chars: tokens::CONTENT_TRIM_CHARS,
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(1..=5).contains(&self.breadth) {
            return Err(crate::types::FathomError::Config(format!(
                "breadth must be between 1 and 5, got {}",
                self.breadth
            )));
        }
        if !(1..=3).contains(&self.depth) {
            return Err(crate::types::FathomError::Config(format!(
                "depth must be between 1 and 3, got {}",
                self.depth
            )));
        }
        if self.max_duration_minutes == 0 {
            return Err(crate::types::FathomError::Config(
                "max_duration_minutes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Wall-clock budget as a duration
    pub fn budget(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.max_duration_minutes * 60)
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type: "openai" or any OpenAI-compatible endpoint
    pub provider: String,

    /// Model name (provider-specific)
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// API key; never serialized to output
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            timeout_secs: network::LLM_TIMEOUT_SECS,
            temperature: 0.0,
            api_key: None,
            api_base: None,
            max_tokens: 4096,
        }
    }
}

// =============================================================================
// Search Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// API key for the search/scrape service; never serialized
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL
    pub api_base: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum pages requested per search call
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            timeout_secs: network::SEARCH_TIMEOUT_SECS,
            result_limit: network::SEARCH_RESULT_LIMIT,
        }
    }
}

// =============================================================================
// Synthesis Configuration
// =============================================================================

/// Settings for the dedicated report-synthesis API. When `api_key` is
/// absent the assembler transparently falls back to the primary model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Synthesis API key; never serialized
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Synthesis model name
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-20250514".to_string(),
            timeout_secs: network::SYNTHESIS_TIMEOUT_SECS,
        }
    }
}
