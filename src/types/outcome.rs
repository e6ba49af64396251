//! Research Outcomes
//!
//! Per-component results and the aggregate output returned to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::plan::ResearchPlan;

// =============================================================================
// Component Result
// =============================================================================

/// Accumulated findings for one researched component.
///
/// Created when research on the component starts and accumulates until the
/// component completes; `time_spent_ms` is the sum of its iteration times.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentResult {
    /// Factual learnings extracted by the summarizer
    pub learnings: Vec<String>,
    /// URLs of pages that contributed content
    #[serde(rename = "visitedUrls")]
    pub visited_urls: Vec<String>,
    /// Component-level narrative summary
    pub summary: String,
    /// Total research time spent on this component, milliseconds
    #[serde(rename = "timeSpent")]
    pub time_spent_ms: u64,
}

impl ComponentResult {
    /// Merge learnings and URLs from another result, skipping duplicates.
    pub fn absorb(&mut self, other: &ComponentResult) {
        for learning in &other.learnings {
            if !self.learnings.contains(learning) {
                self.learnings.push(learning.clone());
            }
        }
        for url in &other.visited_urls {
            if !self.visited_urls.contains(url) {
                self.visited_urls.push(url.clone());
            }
        }
        self.time_spent_ms += other.time_spent_ms;
    }
}

// =============================================================================
// Time Stats
// =============================================================================

/// Timing summary across the whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeStats {
    /// Wall-clock time of the whole run, milliseconds
    #[serde(rename = "totalTime")]
    pub total_time_ms: u64,
    /// Per-component time spent, milliseconds
    #[serde(rename = "componentTimes")]
    pub component_times: HashMap<String, u64>,
    /// Components researched to completion
    #[serde(rename = "completedComponents")]
    pub completed_components: Vec<String>,
    /// Components skipped by the scheduler
    #[serde(rename = "skippedComponents")]
    pub skipped_components: Vec<String>,
    /// Mean time of a deep-research iteration, milliseconds
    #[serde(rename = "averageIterationTimeMs")]
    pub average_iteration_time_ms: u64,
}

// =============================================================================
// API Test Result
// =============================================================================

/// Outcome of the synthesis-API smoke test (`test_anthropic_mode`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTestResult {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Research Output
// =============================================================================

/// Aggregate output of a research run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchOutput {
    /// All learnings across components (quick pass + full pass)
    pub learnings: Vec<String>,
    /// All visited URLs across components
    #[serde(rename = "visitedUrls")]
    pub visited_urls: Vec<String>,
    /// The (rebalanced) plan the run executed
    #[serde(rename = "researchPlan")]
    pub research_plan: Option<ResearchPlan>,
    /// Per-component results keyed by component name
    #[serde(rename = "componentResults")]
    pub component_results: HashMap<String, ComponentResult>,
    /// Timing summary
    #[serde(rename = "timeStats")]
    pub time_stats: TimeStats,
    /// Final markdown report, when one was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Present only when `test_anthropic_mode` ran
    #[serde(rename = "apiTestResult", skip_serializing_if = "Option::is_none")]
    pub api_test_result: Option<ApiTestResult>,
}

impl ResearchOutput {
    /// Append a learning if it is not already present.
    pub fn push_learning(&mut self, learning: impl Into<String>) {
        let learning = learning.into();
        if !self.learnings.contains(&learning) {
            self.learnings.push(learning);
        }
    }

    /// Append a URL if it is not already present.
    pub fn push_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !self.visited_urls.contains(&url) {
            self.visited_urls.push(url);
        }
    }
}
