//! Component Researcher
//!
//! Runs the sequential deep research for one component of the full pass.
//! The first sub-question is skipped - the quick pass already consumed it -
//! and every subsequent sub-question gets breadth/depth scaled to the time
//! actually left for it. Saturation is evaluated after each sub-question;
//! the loop exits as soon as the criteria are covered well enough.

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ResearchContext;
use super::deep::{DeepResearchRequest, run_deep_research};
use super::saturation::{GapMap, INITIAL_GAP, evaluate_saturation, neutral_gap_map};
use super::schemas::{ResearchPrompts, ResearchSchemas};
use super::state::{Deadline, ResearchStats};
use crate::ai::generate_object;
use crate::constants::research::SATURATION_COMPONENT_THRESHOLD;
use crate::constants::time::{COMPONENT_BREAK_MS, DEGRADE_HALF_MS, DEGRADE_MINIMAL_MS};
use crate::progress::ProgressUpdate;
use crate::types::plan::Component;
use crate::types::{ComponentResult, Result};

/// Per-component knobs resolved by the orchestrator before the run.
#[derive(Debug, Clone)]
pub struct ComponentRun {
    /// Configured breadth before degradation
    pub breadth: u32,
    /// Configured depth before the multiplier
    pub depth: u32,
    /// Depth multiplier from the rebalancer, already clamped
    pub multiplier: f64,
    /// Scheduler asked for minimal research
    pub minimal: bool,
}

impl ComponentRun {
    /// Effective breadth/depth for a sub-question given the time left for it.
    fn effective(&self, time_per_question_ms: u64) -> (u32, u32) {
        if self.minimal || time_per_question_ms < DEGRADE_MINIMAL_MS {
            return (1, 1);
        }
        if time_per_question_ms < DEGRADE_HALF_MS {
            return ((self.breadth / 2).max(1), 1);
        }
        let depth = ((self.depth as f64 * self.multiplier).round() as u32).max(1);
        (self.breadth, depth)
    }
}

/// Research one component to saturation or budget exhaustion.
///
/// `seed` is the quick-pass result for this component, merged exactly once;
/// its learnings also become deduplication context for the new research.
/// Search failures propagate - the orchestrator treats the component as
/// failed and moves on.
pub async fn research_component(
    ctx: &ResearchContext,
    deadline: Deadline,
    component: &Component,
    run: &ComponentRun,
    main_topic: &str,
    seed: Option<ComponentResult>,
    stats: &mut ResearchStats,
) -> Result<ComponentResult> {
    let mut result = ComponentResult::default();
    let mut component_iterations: u32 = 0;
    if let Some(seed) = seed {
        component_iterations = 1;
        result.absorb(&seed);
    }

    let planned_iterations = component.sub_questions.len() as u32 * run.depth.max(1);
    let mut gaps: GapMap = neutral_gap_map(component, INITIAL_GAP);

    // First sub-question was consumed by the quick pass
    let pending: Vec<&String> = component.sub_questions.iter().skip(1).collect();
    let total_pending = pending.len();

    for (index, sub_question) in pending.into_iter().enumerate() {
        let remaining_ms = deadline.remaining_ms();
        if remaining_ms < COMPONENT_BREAK_MS {
            debug!(component = %component.name, "stopping sub-question loop: budget exhausted");
            break;
        }
        ctx.cancel.check("component research")?;

        let remaining_questions = (total_pending - index) as u64;
        let time_per_question_ms = remaining_ms / remaining_questions.max(1);
        let (breadth, depth) = run.effective(time_per_question_ms);

        debug!(
            component = %component.name,
            sub_question = %sub_question,
            breadth,
            depth,
            time_per_question_ms,
            "researching sub-question"
        );

        let report = run_deep_research(
            ctx,
            deadline,
            DeepResearchRequest {
                query: sub_question.clone(),
                breadth,
                depth,
                main_topic: Some(main_topic),
                component: Some(component),
                gaps: gaps.clone(),
                existing_learnings: result.learnings.clone(),
            },
        )
        .await?;

        for learning in &report.learnings {
            if !result.learnings.contains(learning) {
                result.learnings.push(learning.clone());
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
        component_iterations += report.iteration_times.len() as u32;

        let saturation = evaluate_saturation(
            ctx.llm.as_ref(),
            component,
            &result.learnings,
            component_iterations,
            planned_iterations,
        )
        .await;
        gaps = saturation.gap_details.clone();

        ctx.sink
            .emit(ProgressUpdate::ResearchSaturation {
                content: saturation.reasoning.clone(),
                component: component.name.clone(),
                coverage: saturation.coverage_percentage,
                saturated: saturation.is_saturated,
            })
            .await;

        if saturation.is_saturated
            || saturation.coverage_percentage >= SATURATION_COMPONENT_THRESHOLD
        {
            info!(
                component = %component.name,
                coverage = saturation.coverage_percentage,
                "component saturated, stopping early"
            );
            break;
        }
    }

    result.summary = summarize_component(ctx, component, &result.learnings).await;
    Ok(result)
}

#[derive(Debug, Deserialize)]
struct ComponentSummaryPayload {
    summary: String,
}

/// Component-level narrative summary with a fixed-text fallback.
pub(crate) async fn summarize_component(
    ctx: &ResearchContext,
    component: &Component,
    learnings: &[String],
) -> String {
    let prompt = ResearchPrompts::component_summary(component, learnings);
    let schema = ResearchSchemas::component_summary();

    match generate_object::<ComponentSummaryPayload>(
        ctx.llm.as_ref(),
        "component_summary",
        &prompt,
        &schema,
    )
    .await
    {
        Ok(payload) => payload.summary,
        Err(e) => {
            warn!(component = %component.name, error = %e, "summary failed, using fallback");
            format!("Findings for {}", component.name)
        }
    }
}

/// Map the orchestrator's recommended breadth/depth (from the scheduler's
/// LLM branch) onto a run config.
pub fn run_config_with_recommendations(
    breadth: u32,
    depth: u32,
    multiplier: f64,
    minimal: bool,
    recommended: (Option<u32>, Option<u32>),
) -> ComponentRun {
    let mut run = ComponentRun {
        breadth,
        depth,
        multiplier,
        minimal,
    };
    if let Some(recommended_breadth) = recommended.0 {
        run.breadth = recommended_breadth.clamp(1, 5);
    }
    if let Some(recommended_depth) = recommended.1 {
        run.depth = recommended_depth.clamp(1, 3);
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::{MockLlm, MockSearch, context};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn component() -> Component {
        Component::new("Adoption", "who adopted the four day workweek")
            .with_sub_question("which companies adopted")
            .with_sub_question("which countries trialed")
            .with_criterion("named adopters")
            .with_criterion("trial outcomes")
    }

    fn run() -> ComponentRun {
        ComponentRun {
            breadth: 2,
            depth: 1,
            multiplier: 1.0,
            minimal: false,
        }
    }

    #[test]
    fn test_degradation_thresholds() {
        let run = ComponentRun {
            breadth: 4,
            depth: 2,
            multiplier: 1.5,
            minimal: false,
        };
        // Under 30s: 1/1
        assert_eq!(run.effective(20_000), (1, 1));
        // Under 60s: half breadth, depth 1
        assert_eq!(run.effective(45_000), (2, 1));
        // Comfortable: configured breadth, depth x multiplier rounded
        assert_eq!(run.effective(120_000), (4, 3));
    }

    #[test]
    fn test_minimal_overrides_everything() {
        let run = ComponentRun {
            breadth: 4,
            depth: 3,
            multiplier: 2.0,
            minimal: true,
        };
        assert_eq!(run.effective(600_000), (1, 1));
    }

    #[test]
    fn test_depth_multiplier_floor() {
        let run = ComponentRun {
            breadth: 2,
            depth: 1,
            multiplier: 0.5,
            minimal: false,
        };
        // 1 * 0.5 rounds to 1, never 0
        assert_eq!(run.effective(120_000), (2, 1));
    }

    #[test]
    fn test_recommendations_clamped_and_used() {
        // The scheduler clears `minimal` when it carries recommendations,
        // so the clamped values must actually drive the research shape
        let run = run_config_with_recommendations(3, 2, 1.0, false, (Some(9), Some(0)));
        assert_eq!(run.breadth, 5);
        assert_eq!(run.depth, 1);
        assert_eq!(run.effective(600_000), (5, 1));
    }

    #[tokio::test]
    async fn test_saturated_component_stops_after_first_sub_question() {
        let llm = Arc::new(MockLlm::scripted(vec![
            // sub-queries for "which countries trialed"
            json!({"queries": [{"query": "country workweek trials", "reasoning": ""}]}),
            // summarize
            json!({"learnings": ["Iceland trialed 4-day weeks 2015-2019"]}),
            // analysis
            json!({"summary": "s", "valuable": true, "gaps": [], "shouldContinue": true, "nextSearchTopic": ""}),
            // saturation: saturated immediately
            json!({
                "isSaturated": true,
                "coveragePercentage": 80,
                "coveredCriteria": ["named adopters", "trial outcomes"],
                "remainingCriteria": [],
                "reasoning": "criteria covered"
            }),
            // component summary
            json!({"summary": "Adoption is well documented."}),
        ]));
        let body = "c".repeat(400);
        let search = Arc::new(MockSearch::always(vec![("https://example.org/i", body.as_str())]));
        let ctx = context(llm, search);
        let deadline = Deadline::new(Duration::from_secs(600));
        let mut stats = ResearchStats::new();

        let seed = ComponentResult {
            learnings: vec!["quick pass learning".to_string()],
            visited_urls: vec!["https://example.org/seed".to_string()],
            summary: String::new(),
            time_spent_ms: 500,
        };

        let result = research_component(
            &ctx,
            deadline,
            &component(),
            &run(),
            "four day workweek",
            Some(seed),
            &mut stats,
        )
        .await
        .unwrap();

        // Seed merged once, new learning appended
        assert_eq!(result.learnings[0], "quick pass learning");
        assert!(result.learnings.contains(&"Iceland trialed 4-day weeks 2015-2019".to_string()));
        assert_eq!(result.summary, "Adoption is well documented.");
        // Seed time + one iteration
        assert_eq!(
            result.time_spent_ms,
            500 + stats.iteration_times.iter().sum::<u64>()
        );
        assert_eq!(stats.completed_iterations, 1);
    }

    #[tokio::test]
    async fn test_summary_fallback_on_llm_failure() {
        let llm = Arc::new(MockLlm::failing());
        let search = Arc::new(MockSearch::always(vec![]));
        let ctx = context(llm, search);

        let summary = summarize_component(&ctx, &component(), &[]).await;
        assert_eq!(summary, "Findings for Adoption");
    }

    #[tokio::test]
    async fn test_exhausted_deadline_produces_summary_only() {
        // Deadline already exhausted: loop never runs, summary still set
        let llm = Arc::new(MockLlm::scripted(vec![
            json!({"summary": "Nothing researched yet."}),
        ]));
        let search = Arc::new(MockSearch::always(vec![]));
        let ctx = context(llm, search.clone());
        let mut stats = ResearchStats::new();

        let result = research_component(
            &ctx,
            Deadline::new(Duration::ZERO),
            &component(),
            &run(),
            "topic",
            None,
            &mut stats,
        )
        .await
        .unwrap();

        assert!(result.learnings.is_empty());
        assert_eq!(result.summary, "Nothing researched yet.");
        assert_eq!(search.call_count(), 0);
    }
}
