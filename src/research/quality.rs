//! Quality Evaluator
//!
//! After a component completes, and only when at least three minutes of
//! budget remain, asks the LLM whether the success criteria are actually
//! met. If not, up to two focused follow-up queries run at breadth 2 /
//! depth 1 against a gap map derived from the missing elements, and the
//! component summary is refreshed.
//!
//! Everything here is best-effort: any failure leaves the component result
//! exactly as it was.

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ResearchContext;
use super::component::summarize_component;
use super::deep::{DeepResearchRequest, run_deep_research};
use super::saturation::GapMap;
use super::schemas::{ResearchPrompts, ResearchSchemas};
use super::state::{Deadline, ResearchStats};
use super::subquery::sanitize_query;
use crate::ai::generate_object;
use crate::constants::research::MAX_QUALITY_FOLLOW_UPS;
use crate::constants::time::{COMPONENT_BREAK_MS, QUALITY_MIN_REMAINING_MS};
use crate::types::ComponentResult;
use crate::types::plan::Component;

#[derive(Debug, Deserialize)]
struct QualityPayload {
    #[serde(rename = "meetsQuality")]
    meets_quality: bool,
    #[serde(rename = "missingElements", default)]
    missing_elements: Vec<String>,
    #[serde(rename = "additionalQueries", default)]
    additional_queries: Vec<String>,
}

/// Close quality gaps for a finished component, budget permitting.
pub async fn improve_component(
    ctx: &ResearchContext,
    deadline: Deadline,
    component: &Component,
    main_topic: &str,
    result: &mut ComponentResult,
    stats: &mut ResearchStats,
) {
    if deadline.is_nearly_exhausted(QUALITY_MIN_REMAINING_MS) {
        debug!(component = %component.name, "skipping quality pass: under 3 minutes left");
        return;
    }

    let prompt = ResearchPrompts::quality(component, &result.summary, &result.learnings);
    let schema = ResearchSchemas::quality();

    let payload =
        match generate_object::<QualityPayload>(ctx.llm.as_ref(), "quality", &prompt, &schema)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(component = %component.name, error = %e, "quality evaluation failed");
                return;
            }
        };

    if payload.meets_quality {
        debug!(component = %component.name, "quality criteria met");
        return;
    }

    info!(
        component = %component.name,
        missing = payload.missing_elements.len(),
        "quality gaps found, running follow-up queries"
    );

    // Gap map keyed by the missing elements themselves
    let gaps: GapMap = payload
        .missing_elements
        .iter()
        .map(|element| (element.clone(), element.clone()))
        .collect();

    let mut improved = false;
    for query in payload
        .additional_queries
        .into_iter()
        .take(MAX_QUALITY_FOLLOW_UPS)
    {
        if deadline.is_nearly_exhausted(COMPONENT_BREAK_MS) || ctx.cancel.is_cancelled() {
            break;
        }
        let Some(query) = sanitize_query(&query) else {
            continue;
        };

        match run_deep_research(
            ctx,
            deadline,
            DeepResearchRequest {
                query,
                breadth: 2,
                depth: 1,
                main_topic: Some(main_topic),
                component: Some(component),
                gaps: gaps.clone(),
                existing_learnings: result.learnings.clone(),
            },
        )
        .await
        {
            Ok(report) => {
                for learning in &report.learnings {
                    if !result.learnings.contains(learning) {
                        result.learnings.push(learning.clone());
                        improved = true;
                    }
                }
                for url in &report.visited_urls {
                    if !result.visited_urls.contains(url) {
                        result.visited_urls.push(url.clone());
                    }
                }
                for iteration_ms in &report.iteration_times {
                    stats.record_iteration(*iteration_ms);
                    result.time_spent_ms += iteration_ms;
                }
            }
            Err(e) => {
                // Follow-ups are optional; stop rather than fail the component
                warn!(component = %component.name, error = %e, "follow-up query failed");
                break;
            }
        }
    }

    if improved {
        result.summary = summarize_component(ctx, component, &result.learnings).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::{MockLlm, MockSearch, context};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn component() -> Component {
        Component::new("Costs", "implementation costs")
            .with_sub_question("what does it cost")
            .with_criterion("cost figures")
    }

    fn base_result() -> ComponentResult {
        ComponentResult {
            learnings: vec!["some firms report savings".to_string()],
            visited_urls: vec![],
            summary: "initial summary".to_string(),
            time_spent_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_skipped_under_three_minutes() {
        let llm = Arc::new(MockLlm::failing());
        let search = Arc::new(MockSearch::always(vec![]));
        let ctx = context(llm.clone(), search);
        let mut result = base_result();
        let mut stats = ResearchStats::new();

        improve_component(
            &ctx,
            Deadline::new(Duration::from_secs(60)),
            &component(),
            "topic",
            &mut result,
            &mut stats,
        )
        .await;

        assert_eq!(llm.call_count(), 0);
        assert_eq!(result.summary, "initial summary");
    }

    #[tokio::test]
    async fn test_meets_quality_changes_nothing() {
        let llm = Arc::new(MockLlm::scripted(vec![json!({
            "meetsQuality": true,
            "missingElements": [],
            "additionalQueries": []
        })]));
        let search = Arc::new(MockSearch::always(vec![]));
        let ctx = context(llm, search.clone());
        let mut result = base_result();
        let mut stats = ResearchStats::new();

        improve_component(
            &ctx,
            Deadline::new(Duration::from_secs(600)),
            &component(),
            "topic",
            &mut result,
            &mut stats,
        )
        .await;

        assert_eq!(result.learnings.len(), 1);
        assert_eq!(search.call_count(), 0);
    }

    #[tokio::test]
    async fn test_follow_ups_merge_and_refresh_summary() {
        let llm = Arc::new(MockLlm::scripted(vec![
            // quality verdict with one follow-up
            json!({
                "meetsQuality": false,
                "missingElements": ["per-employee cost figures"],
                "additionalQueries": ["workweek cost per employee"]
            }),
            // deep research for the follow-up: sub-queries, summarize, analysis
            json!({"queries": [{"query": "workweek cost employee", "reasoning": ""}]}),
            json!({"learnings": ["average cost fell 8 percent"]}),
            json!({"summary": "s", "valuable": true, "gaps": [], "shouldContinue": true, "nextSearchTopic": ""}),
            // refreshed component summary
            json!({"summary": "updated with cost figures"}),
        ]));
        let body = "e".repeat(300);
        let search = Arc::new(MockSearch::always(vec![("https://example.org/c", body.as_str())]));
        let ctx = context(llm, search);
        let mut result = base_result();
        let mut stats = ResearchStats::new();

        improve_component(
            &ctx,
            Deadline::new(Duration::from_secs(600)),
            &component(),
            "four day workweek",
            &mut result,
            &mut stats,
        )
        .await;

        assert!(result.learnings.contains(&"average cost fell 8 percent".to_string()));
        assert_eq!(result.summary, "updated with cost figures");
        assert_eq!(stats.completed_iterations, 1);
    }

    #[tokio::test]
    async fn test_quality_failure_leaves_result_untouched() {
        let llm = Arc::new(MockLlm::failing());
        let search = Arc::new(MockSearch::always(vec![]));
        let ctx = context(llm, search.clone());
        let mut result = base_result();
        let mut stats = ResearchStats::new();

        improve_component(
            &ctx,
            Deadline::new(Duration::from_secs(600)),
            &component(),
            "topic",
            &mut result,
            &mut stats,
        )
        .await;

        assert_eq!(result.learnings.len(), 1);
        assert_eq!(result.summary, "initial summary");
        assert_eq!(search.call_count(), 0);
    }
}
