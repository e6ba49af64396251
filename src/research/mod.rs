//! Research Core
//!
//! The plan-driven, time-budgeted research loop:
//!
//! - `planner`: query → validated plan (minimal fallback on LLM failure)
//! - `importance`: 0-100 relevance score per component
//! - `rebalance`: sequencing by importance + depth multipliers
//! - `state`: time-state machine and rolling timing stats
//! - `scheduler`: skip-or-continue decisions under time pressure
//! - `quick_pass`: concurrent shallow pass seeding every component
//! - `component`: sequential per-component research
//! - `deep`: the per-question search/summarize/analyze loop
//! - `subquery`: gap-biased sub-query generation
//! - `saturation`: criteria coverage evaluation
//! - `quality`: post-component gap-closing follow-ups
//! - `schemas`: JSON Schemas and prompts for every LLM call

pub mod component;
pub mod deep;
pub mod importance;
pub mod planner;
pub mod quality;
pub mod quick_pass;
pub mod rebalance;
pub mod saturation;
pub mod scheduler;
pub mod schemas;
pub mod state;
pub mod subquery;

pub use component::{ComponentRun, research_component, run_config_with_recommendations};
pub use deep::{DeepResearchReport, DeepResearchRequest, run_deep_research};
pub use importance::score_components;
pub use planner::create_plan;
pub use quality::improve_component;
pub use quick_pass::{QuickPassOutcome, run_quick_pass};
pub use rebalance::rebalance;
pub use saturation::{GapMap, SaturationResult, evaluate_saturation, is_neutral_gap};
pub use scheduler::{ScheduleDecision, should_continue_component};
pub use state::{Deadline, ResearchState, ResearchStats};
pub use subquery::{generate_sub_queries, sanitize_query, simplify_query};

use crate::ai::provider::SharedProvider;
use crate::cancel::CancelToken;
use crate::config::{ResearchConfig, SearchConfig};
use crate::progress::SafeSink;
use crate::search::SharedSearch;

/// Handles and knobs shared by every research stage. Cheap to clone; the
/// orchestrator builds one and threads it through the run.
#[derive(Clone)]
pub struct ResearchContext {
    pub llm: SharedProvider,
    pub search: SharedSearch,
    pub sink: SafeSink,
    pub cancel: CancelToken,
    /// Per-request search timeout, seconds
    pub search_timeout_secs: u64,
    /// Pages requested per search call
    pub search_result_limit: usize,
    /// Per-page content cap, characters
    pub content_trim_chars: usize,
    /// Token budget for assembled search content
    pub context_window_tokens: usize,
}

impl ResearchContext {
    pub fn new(
        llm: SharedProvider,
        search: SharedSearch,
        sink: SafeSink,
        cancel: CancelToken,
        research: &ResearchConfig,
        search_config: &SearchConfig,
    ) -> Self {
        Self {
            llm,
            search,
            sink,
            cancel,
            search_timeout_secs: search_config.timeout_secs,
            search_result_limit: search_config.result_limit,
            content_trim_chars: research.content_trim_chars,
            context_window_tokens: research.context_window_tokens,
        }
    }
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::ResearchContext;
    use crate::ai::provider::{LlmProvider, LlmResponse, TokenUsage};
    use crate::cancel::CancelToken;
    use crate::progress::SafeSink;
    use crate::search::{PageResult, SearchOptions, SearchResponse, SearchService};
    use crate::types::{ErrorCategory, FathomError, LlmError, Result};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted LLM: returns queued responses in order, then errors.
    pub struct MockLlm {
        responses: Mutex<VecDeque<Value>>,
        always_fail: bool,
        /// Every prompt received, in call order
        pub prompts: Mutex<Vec<String>>,
    }

    impl MockLlm {
        pub fn scripted(responses: Vec<Value>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                always_fail: false,
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Fails every call with a non-retryable error (no retry sleeps)
        pub fn failing() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                always_fail: true,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        async fn generate(&self, prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.always_fail {
                return Err(FathomError::Llm(LlmError::new(
                    ErrorCategory::Auth,
                    "mock llm configured to fail",
                )));
            }
            match self.responses.lock().unwrap().pop_front() {
                Some(content) => Ok(LlmResponse {
                    content,
                    usage: TokenUsage::default(),
                    elapsed_ms: 1,
                    model: "mock".to_string(),
                }),
                None => Err(FathomError::Llm(LlmError::new(
                    ErrorCategory::Unavailable,
                    "mock llm script exhausted",
                ))),
            }
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock"
        }
    }

    /// Scripted search service.
    pub struct MockSearch {
        mode: SearchMode,
        /// Every query received, in call order
        pub calls: Mutex<Vec<String>>,
    }

    enum SearchMode {
        /// Same pages for every call
        Always(Vec<PageResult>),
        /// Queued responses, empty afterwards
        Scripted(Mutex<VecDeque<SearchResponse>>),
        /// Network failure on every call
        Failing,
    }

    impl MockSearch {
        /// Every call returns these (url, markdown) pages
        pub fn always(pages: Vec<(&str, &str)>) -> Self {
            Self {
                mode: SearchMode::Always(
                    pages
                        .into_iter()
                        .map(|(url, markdown)| PageResult {
                            url: Some(url.to_string()),
                            markdown: Some(markdown.to_string()),
                        })
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn scripted(responses: Vec<SearchResponse>) -> Self {
            Self {
                mode: SearchMode::Scripted(Mutex::new(responses.into())),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                mode: SearchMode::Failing,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SearchService for MockSearch {
        async fn search(&self, query: &str, _options: &SearchOptions) -> Result<SearchResponse> {
            self.calls.lock().unwrap().push(query.to_string());
            match &self.mode {
                SearchMode::Always(pages) => Ok(SearchResponse { data: pages.clone() }),
                SearchMode::Scripted(queue) => {
                    Ok(queue.lock().unwrap().pop_front().unwrap_or_default())
                }
                SearchMode::Failing => {
                    Err(FathomError::Search("mock network failure".to_string()))
                }
            }
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    /// Context over mock handles with default knobs
    pub fn context(llm: Arc<MockLlm>, search: Arc<MockSearch>) -> ResearchContext {
        ResearchContext {
            llm,
            search,
            sink: SafeSink::null(),
            cancel: CancelToken::new(),
            search_timeout_secs: 15,
            search_result_limit: 5,
            content_trim_chars: 25_000,
            context_window_tokens: 120_000,
        }
    }
}
