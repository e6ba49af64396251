//! Component Importance Scoring
//!
//! Assigns each component a 0-100 relevance score, intended (but not
//! required) to sum to about 100. Scores only bias depth multipliers and
//! sequencing; no invariant binds their exact sum.

use std::collections::HashMap;

use tracing::warn;

use serde::Deserialize;

use super::schemas::{ResearchPrompts, ResearchSchemas};
use crate::ai::generate_object;
use crate::ai::provider::LlmProvider;
use crate::types::ResearchPlan;

#[derive(Debug, Deserialize)]
struct ImportancePayload {
    scores: HashMap<String, f64>,
}

/// Score each component's relevance to the main objective.
///
/// On LLM failure, or when the response misses components, the missing
/// entries get the equal allocation `100 / |components|`.
pub async fn score_components(
    llm: &dyn LlmProvider,
    plan: &ResearchPlan,
) -> HashMap<String, f64> {
    let equal_share = 100.0 / plan.components.len() as f64;

    let prompt = ResearchPrompts::importance(&plan.main_objective, &plan.components);
    let schema = ResearchSchemas::importance();

    let scores = match generate_object::<ImportancePayload>(llm, "importance", &prompt, &schema)
        .await
    {
        Ok(payload) => payload.scores,
        Err(e) => {
            warn!(error = %e, "importance scoring failed, using equal allocation");
            HashMap::new()
        }
    };

    plan.components
        .iter()
        .map(|c| {
            let score = scores
                .get(&c.name)
                .copied()
                .filter(|s| s.is_finite() && *s >= 0.0)
                .unwrap_or(equal_share);
            (c.name.clone(), score)
        })
        .collect()
}
