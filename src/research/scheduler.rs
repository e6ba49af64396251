//! Component Scheduler
//!
//! Before each component of the full pass, decides whether researching it
//! still fits the budget. The decision ladder is cheap-first: fixed
//! thresholds, then arithmetic over rolling iteration times, and only when
//! those cannot justify continuing, an LLM judgment call. An LLM error
//! defaults to continuing - skipping work is the decision that needs
//! evidence.

use serde::Deserialize;
use tracing::{debug, warn};

use super::schemas::{ResearchPrompts, ResearchSchemas};
use super::state::{ResearchState, ResearchStats};
use crate::ai::generate_object;
use crate::ai::provider::LlmProvider;
use crate::constants::time::{COMFORT_REMAINING_MS, ESTIMATE_SUBQUESTION_CAP};
use crate::types::plan::Component;

/// Outcome of the scheduling decision for one component.
#[derive(Debug, Clone)]
pub struct ScheduleDecision {
    /// Whether to research the component at all
    pub should_continue: bool,
    /// Continue, but with minimal breadth/depth
    pub minimal: bool,
    /// Why, for the progress stream
    pub reasoning: String,
    /// Breadth suggested by the LLM branch, if any
    pub recommended_breadth: Option<u32>,
    /// Depth suggested by the LLM branch, if any
    pub recommended_depth: Option<u32>,
}

impl ScheduleDecision {
    fn go(reasoning: impl Into<String>) -> Self {
        Self {
            should_continue: true,
            minimal: false,
            reasoning: reasoning.into(),
            recommended_breadth: None,
            recommended_depth: None,
        }
    }

    fn go_minimal(reasoning: impl Into<String>) -> Self {
        Self {
            minimal: true,
            ..Self::go(reasoning)
        }
    }
}

#[derive(Debug, Deserialize)]
struct SchedulePayload {
    #[serde(rename = "shouldContinue")]
    should_continue: bool,
    #[serde(default)]
    reasoning: String,
    #[serde(rename = "recommendedBreadth", default)]
    recommended_breadth: Option<u32>,
    #[serde(rename = "recommendedDepth", default)]
    recommended_depth: Option<u32>,
}

/// Decide whether to research `component` given the current state.
///
/// Call with a freshly ticked state.
pub async fn should_continue_component(
    llm: &dyn LlmProvider,
    state: &ResearchState,
    stats: &ResearchStats,
    component: &Component,
) -> ScheduleDecision {
    // 1. Plenty of budget: no analysis needed
    if state.remaining_ms > COMFORT_REMAINING_MS {
        return ScheduleDecision::go("ample time remaining");
    }

    // 2. Nothing to reserve time for
    if state.remaining_count() <= 1 {
        return ScheduleDecision::go("last remaining component");
    }

    // 3-4. Timing estimates
    let recent_iteration_ms = stats.recent_iteration_time_ms();
    let estimated_component_ms = match stats.average_component_time_ms() {
        0 => {
            recent_iteration_ms
                * component.sub_questions.len().min(ESTIMATE_SUBQUESTION_CAP) as u64
        }
        average => average,
    };

    // 5. Reserve one iteration each for the other queued components
    let others = (state.remaining_count() - 1) as u64;
    let reservation = others * recent_iteration_ms;
    if state.remaining_ms >= recent_iteration_ms + reservation {
        return ScheduleDecision::go("one iteration fits alongside the reservation");
    }

    // 6. Even share still covers one iteration: continue minimally
    if state.remaining_ms / state.remaining_count() as u64 >= recent_iteration_ms {
        return ScheduleDecision::go_minimal("even time share covers a minimal iteration");
    }

    // 7. Ask the LLM, defaulting to continue on error
    debug!(
        component = %component.name,
        remaining_ms = state.remaining_ms,
        recent_iteration_ms,
        estimated_component_ms,
        "arithmetic inconclusive, deferring to LLM"
    );

    let prompt = ResearchPrompts::schedule_decision(
        component,
        state.remaining_ms,
        state.remaining_count(),
        recent_iteration_ms,
        estimated_component_ms,
    );
    let schema = ResearchSchemas::schedule_decision();

    match generate_object::<SchedulePayload>(llm, "schedule_decision", &prompt, &schema).await {
        Ok(payload) => ScheduleDecision {
            should_continue: payload.should_continue,
            // An explicit breadth/depth recommendation replaces the blanket
            // minimal mode; otherwise a continue verdict means bare-minimum
            // research
            minimal: payload.should_continue
                && payload.recommended_breadth.is_none()
                && payload.recommended_depth.is_none(),
            reasoning: if payload.reasoning.is_empty() {
                "LLM scheduling decision".to_string()
            } else {
                payload.reasoning
            },
            recommended_breadth: payload.recommended_breadth,
            recommended_depth: payload.recommended_depth,
        },
        Err(e) => {
            warn!(error = %e, "scheduling decision failed, defaulting to continue");
            ScheduleDecision::go_minimal("scheduler unavailable, continuing by default")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::state::Deadline;
    use crate::research::testing::MockLlm;
    use crate::types::ResearchPlan;
    use serde_json::json;
    use std::time::Duration;

    fn component(sub_questions: usize) -> Component {
        let mut c = Component::new("A", "d").with_criterion("c");
        for i in 0..sub_questions {
            c = c.with_sub_question(format!("q{}", i));
        }
        c
    }

    fn plan(names: &[&str]) -> ResearchPlan {
        ResearchPlan {
            main_objective: "obj".to_string(),
            components: names
                .iter()
                .map(|n| {
                    Component::new(*n, "d")
                        .with_sub_question("q")
                        .with_criterion("c")
                })
                .collect(),
            sequencing: names.iter().map(|n| n.to_string()).collect(),
            potential_pivots: vec![],
        }
    }

    fn state_with_remaining_ms(names: &[&str], remaining_ms: u64) -> ResearchState {
        let deadline = Deadline::new(Duration::from_millis(remaining_ms));
        let mut state = ResearchState::init(&plan(names), deadline);
        state.tick();
        state
    }

    #[tokio::test]
    async fn test_ample_time_continues_without_llm() {
        let llm = MockLlm::failing();
        let state = state_with_remaining_ms(&["A", "B"], 10 * 60 * 1000);
        let stats = ResearchStats::new();

        let decision = should_continue_component(&llm, &state, &stats, &component(2)).await;
        assert!(decision.should_continue);
        assert!(!decision.minimal);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_last_component_always_continues() {
        let llm = MockLlm::failing();
        // 10s left, one component: continues regardless of estimates
        let state = state_with_remaining_ms(&["A"], 10 * 1000);
        let stats = ResearchStats::new();

        let decision = should_continue_component(&llm, &state, &stats, &component(5)).await;
        assert!(decision.should_continue);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reservation_branch_continues() {
        let llm = MockLlm::failing();
        // 2 components, recent iterations ~30s, 90s left:
        // 30s own + 30s reservation = 60s <= 90s
        let state = state_with_remaining_ms(&["A", "B"], 90 * 1000);
        let mut stats = ResearchStats::new();
        for _ in 0..3 {
            stats.record_iteration(30 * 1000);
        }

        let decision = should_continue_component(&llm, &state, &stats, &component(2)).await;
        assert!(decision.should_continue);
        assert!(!decision.minimal);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_exact_boundary_stays_arithmetic() {
        let llm = MockLlm::failing();
        // remaining just above count * recent: the even-share backstop keeps
        // the decision out of the LLM branch
        let state = state_with_remaining_ms(&["A", "B", "C"], 95 * 1000);
        let mut stats = ResearchStats::new();
        for _ in 0..3 {
            stats.record_iteration(30 * 1000);
        }

        let decision = should_continue_component(&llm, &state, &stats, &component(2)).await;
        assert!(decision.should_continue);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_branch_skip() {
        let llm = MockLlm::scripted(vec![json!({
            "shouldContinue": false,
            "reasoning": "not enough time to do it justice"
        })]);
        // 2 components, recent 60s (default), 70s left: 60+60=120 > 70,
        // 70/2=35 < 60 -> LLM branch
        let state = state_with_remaining_ms(&["A", "B"], 70 * 1000);
        let stats = ResearchStats::new();

        let decision = should_continue_component(&llm, &state, &stats, &component(2)).await;
        assert!(!decision.should_continue);
        assert!(decision.reasoning.contains("not enough time"));
    }

    #[tokio::test]
    async fn test_llm_branch_continue_with_recommendations() {
        let llm = MockLlm::scripted(vec![json!({
            "shouldContinue": true,
            "reasoning": "squeeze in one pass",
            "recommendedBreadth": 1,
            "recommendedDepth": 1
        })]);
        let state = state_with_remaining_ms(&["A", "B"], 70 * 1000);
        let stats = ResearchStats::new();

        let decision = should_continue_component(&llm, &state, &stats, &component(2)).await;
        assert!(decision.should_continue);
        // Explicit recommendations override blanket minimal mode
        assert!(!decision.minimal);
        assert_eq!(decision.recommended_breadth, Some(1));
        assert_eq!(decision.recommended_depth, Some(1));
    }

    #[tokio::test]
    async fn test_llm_continue_without_recommendations_is_minimal() {
        let llm = MockLlm::scripted(vec![json!({
            "shouldContinue": true,
            "reasoning": "worth a shallow look"
        })]);
        let state = state_with_remaining_ms(&["A", "B"], 70 * 1000);
        let stats = ResearchStats::new();

        let decision = should_continue_component(&llm, &state, &stats, &component(2)).await;
        assert!(decision.should_continue);
        assert!(decision.minimal);
    }

    #[tokio::test]
    async fn test_llm_error_defaults_to_continue() {
        let llm = MockLlm::failing();
        let state = state_with_remaining_ms(&["A", "B"], 70 * 1000);
        let stats = ResearchStats::new();

        let decision = should_continue_component(&llm, &state, &stats, &component(2)).await;
        assert!(decision.should_continue);
        assert!(decision.minimal);
        assert_eq!(llm.call_count(), 1);
    }
}
