//! Research Planner
//!
//! Turns a free-text query (plus optional clarifying Q&A) into a validated
//! [`ResearchPlan`]. LLM failure never propagates: the caller gets a
//! minimal single-component plan instead.

use tracing::{info, warn};

use super::schemas::{ResearchPrompts, ResearchSchemas};
use crate::ai::generate_object;
use crate::ai::provider::LlmProvider;
use crate::types::plan::{FeedbackResponse, ResearchPlan};

/// Create a research plan for `query`.
///
/// Falls back to [`ResearchPlan::minimal`] when the LLM fails or returns a
/// structurally invalid plan that cannot be repaired.
pub async fn create_plan(
    llm: &dyn LlmProvider,
    query: &str,
    feedback: &[FeedbackResponse],
) -> ResearchPlan {
    let prompt = ResearchPrompts::plan(query, feedback);
    let schema = ResearchSchemas::plan();

    match generate_object::<ResearchPlan>(llm, "plan", &prompt, &schema).await {
        Ok(mut plan) => {
            if plan.validate().is_err() {
                let repaired = plan.repair_sequencing();
                if plan.validate().is_err() {
                    warn!("planner returned unrepairable plan, using minimal fallback");
                    return ResearchPlan::minimal(query);
                }
                if repaired {
                    warn!("planner sequencing repaired from component order");
                }
            }
            info!(
                components = plan.components.len(),
                "research plan created"
            );
            plan
        }
        Err(e) => {
            warn!(error = %e, "planner failed, using minimal fallback plan");
            ResearchPlan::minimal(query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::MockLlm;
    use serde_json::json;

    #[tokio::test]
    async fn test_valid_plan_passes_through() {
        let llm = MockLlm::scripted(vec![json!({
            "mainObjective": "obj",
            "components": [{
                "name": "Productivity",
                "description": "desc",
                "subQuestions": ["q1", "q2"],
                "successCriteria": ["c1"]
            }],
            "sequencing": ["Productivity"],
            "potentialPivots": ["pivot"]
        })]);

        let plan = create_plan(&llm, "query", &[]).await;
        assert_eq!(plan.components.len(), 1);
        assert_eq!(plan.sequencing, vec!["Productivity"]);
        assert_eq!(plan.potential_pivots, vec!["pivot"]);
    }

    #[tokio::test]
    async fn test_broken_sequencing_is_repaired() {
        let llm = MockLlm::scripted(vec![json!({
            "mainObjective": "obj",
            "components": [
                {"name": "A", "description": "d", "subQuestions": ["q"], "successCriteria": ["c"]},
                {"name": "B", "description": "d", "subQuestions": ["q"], "successCriteria": ["c"]}
            ],
            "sequencing": ["A", "Missing"],
            "potentialPivots": []
        })]);

        let plan = create_plan(&llm, "query", &[]).await;
        assert_eq!(plan.sequencing, vec!["A", "B"]);
        assert!(plan.validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_failure_yields_minimal_plan() {
        let llm = MockLlm::failing();
        let plan = create_plan(&llm, "what is rust", &[]).await;
        assert_eq!(plan.components.len(), 1);
        assert_eq!(plan.components[0].name, "Basic Research");
        assert_eq!(plan.components[0].sub_questions[0], "what is rust");
    }

    #[tokio::test]
    async fn test_empty_components_yield_minimal_plan() {
        let llm = MockLlm::scripted(vec![json!({
            "mainObjective": "obj",
            "components": [],
            "sequencing": [],
            "potentialPivots": []
        })]);

        let plan = create_plan(&llm, "query", &[]).await;
        assert_eq!(plan.components[0].name, "Basic Research");
    }
}
