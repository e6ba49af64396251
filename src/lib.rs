//! Fathom - Time-Budgeted Deep Research Orchestrator
//!
//! Given a free-text query and a wall-clock budget, drives an LLM and a
//! web-search/scrape service to produce a structured markdown report.
//!
//! ## Core Loop
//!
//! - **Plan**: decompose the query into components with sub-questions and
//!   success criteria
//! - **Quick pass**: shallow concurrent sweep seeding every component
//! - **Rebalance**: reorder by importance, assign depth multipliers
//! - **Full pass**: sequential deep research, breadth/depth scaled to the
//!   time actually remaining, with saturation-based early exit
//! - **Report**: per-component sections synthesized into one document
//!
//! ## Quick Start
//!
//! ```ignore
//! use fathom::{Orchestrator, ResearchOptions};
//! use fathom::config::Config;
//!
//! let config = Config::default();
//! let llm = fathom::ai::create_provider(&config.llm)?;
//! let search = std::sync::Arc::new(fathom::search::FirecrawlClient::new(config.search.clone())?);
//! let orchestrator = Orchestrator::new(llm, search, None, fathom::progress::SafeSink::null(), config);
//! let output = orchestrator.run(ResearchOptions::new("impact of four-day workweek")).await?;
//! ```
//!
//! ## Modules
//!
//! - [`research`]: planner, scheduler, deep-research loop, evaluators
//! - [`ai`]: LLM provider seam, typed structured output, trimming
//! - [`search`]: web search/scrape service seam
//! - [`report`]: section building and report synthesis
//! - [`progress`]: typed progress events and safe sinks
//! - [`config`]: figment-layered configuration

pub mod ai;
pub mod cancel;
pub mod config;
pub mod constants;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod research;
pub mod search;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use cancel::CancelToken;
pub use config::{Config, ConfigLoader};
pub use orchestrator::{Orchestrator, ResearchOptions};
pub use types::{
    ApiTestResult, Component, ComponentResult, FathomError, FeedbackResponse, ResearchOutput,
    ResearchPlan, Result, TimeStats,
};

// =============================================================================
// Capability Re-exports
// =============================================================================

pub use ai::{LlmProvider, SharedProvider, create_provider};
pub use progress::{ConsoleSink, ProgressSink, ProgressUpdate, SafeSink};
pub use report::{AnthropicSynthesis, SynthesisApi};
pub use search::{FirecrawlClient, SearchService, SharedSearch};
