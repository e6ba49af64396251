//! Quick-Pass Runner
//!
//! The initial shallow sweep: every component's first sub-question is
//! researched concurrently at breadth 2 / depth 1 to seed learnings before
//! the plan is rebalanced. Workers are fully independent - each accumulates
//! into its own report and the results are merged only after all have
//! settled, so there is no shared mutable state under contention. A failed
//! worker yields an empty result and never aborts the others.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::{info, warn};

use super::ResearchContext;
use super::deep::{DeepResearchRequest, run_deep_research};
use super::saturation::GapMap;
use super::state::Deadline;
use crate::constants::research::{QUICK_PASS_BREADTH, QUICK_PASS_DEPTH};
use crate::types::{ComponentResult, ResearchPlan};

/// Everything the quick pass produced.
#[derive(Debug, Default)]
pub struct QuickPassOutcome {
    /// Per-component seed results (empty summary by design)
    pub results: HashMap<String, ComponentResult>,
    /// Iteration times across all workers, for the stats seed
    pub iteration_times: Vec<u64>,
}

/// Run the concurrent shallow pass over every component.
pub async fn run_quick_pass(
    ctx: &ResearchContext,
    deadline: Deadline,
    plan: &ResearchPlan,
    existing_learnings: &[String],
) -> QuickPassOutcome {
    ctx.sink
        .progress(format!(
            "Quick pass: investigating {} components in parallel",
            plan.components.len()
        ))
        .await;

    let workers = plan.components.iter().map(|component| {
        let query = component.sub_questions[0].clone();
        let existing = existing_learnings.to_vec();
        async move {
            let report = run_deep_research(
                ctx,
                deadline,
                DeepResearchRequest {
                    query,
                    breadth: QUICK_PASS_BREADTH,
                    depth: QUICK_PASS_DEPTH,
                    main_topic: Some(&plan.main_objective),
                    component: Some(component),
                    gaps: GapMap::new(),
                    existing_learnings: existing,
                },
            )
            .await;
            (component.name.clone(), report)
        }
    });

    let mut outcome = QuickPassOutcome::default();
    for (name, report) in join_all(workers).await {
        match report {
            Ok(report) => {
                info!(
                    component = %name,
                    learnings = report.learnings.len(),
                    "quick pass worker finished"
                );
                outcome.iteration_times.extend(&report.iteration_times);
                outcome.results.insert(
                    name,
                    ComponentResult {
                        learnings: report.learnings,
                        visited_urls: report.visited_urls,
                        summary: String::new(),
                        time_spent_ms: report.iteration_times.iter().sum(),
                    },
                );
            }
            Err(e) => {
                // Isolated failure: keep a partial (empty) result
                warn!(component = %name, error = %e, "quick pass worker failed");
                outcome.results.insert(name, ComponentResult::default());
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::{MockLlm, MockSearch, context};
    use crate::types::plan::Component;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn plan() -> ResearchPlan {
        ResearchPlan {
            main_objective: "four day workweek".to_string(),
            components: vec![
                Component::new("A", "d")
                    .with_sub_question("first question a")
                    .with_criterion("c"),
                Component::new("B", "d")
                    .with_sub_question("first question b")
                    .with_criterion("c"),
            ],
            sequencing: vec!["A".to_string(), "B".to_string()],
            potential_pivots: vec![],
        }
    }

    #[tokio::test]
    async fn test_every_component_gets_a_result() {
        // Mocks complete without yielding, so join_all polls workers to
        // completion in order and the scripted triplets line up per worker
        let llm = Arc::new(MockLlm::scripted(vec![
            json!({"queries": [{"query": "seed question data", "reasoning": ""}]}),
            json!({"learnings": ["learning one"]}),
            json!({"summary": "s", "valuable": true, "gaps": [], "shouldContinue": true, "nextSearchTopic": ""}),
            json!({"queries": [{"query": "seed question data", "reasoning": ""}]}),
            json!({"learnings": ["learning two"]}),
            json!({"summary": "s", "valuable": true, "gaps": [], "shouldContinue": true, "nextSearchTopic": ""}),
        ]));
        let body = "d".repeat(300);
        let search = Arc::new(MockSearch::always(vec![("https://example.org/p", body.as_str())]));
        let ctx = context(llm, search);

        let outcome = run_quick_pass(
            &ctx,
            Deadline::new(Duration::from_secs(600)),
            &plan(),
            &[],
        )
        .await;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.iteration_times.len(), 2);
        for result in outcome.results.values() {
            assert_eq!(result.learnings.len(), 1);
            assert!(result.summary.is_empty());
            assert_eq!(result.visited_urls, vec!["https://example.org/p"]);
        }
    }

    #[tokio::test]
    async fn test_worker_failure_is_isolated() {
        // Search fails for every call: both workers fail, both still get
        // (empty) results and the pass itself never errors
        let llm = Arc::new(MockLlm::scripted(vec![
            json!({"queries": [{"query": "seed question data", "reasoning": ""}]}),
            json!({"queries": [{"query": "seed question data", "reasoning": ""}]}),
        ]));
        let search = Arc::new(MockSearch::failing());
        let ctx = context(llm, search);

        let outcome = run_quick_pass(
            &ctx,
            Deadline::new(Duration::from_secs(600)),
            &plan(),
            &[],
        )
        .await;

        assert_eq!(outcome.results.len(), 2);
        for result in outcome.results.values() {
            assert!(result.learnings.is_empty());
            assert!(result.summary.is_empty());
        }
        assert!(outcome.iteration_times.is_empty());
    }
}
