//! Saturation Evaluator
//!
//! After each iteration, scores how well the accumulated learnings cover a
//! component's success criteria and names the specific gaps. The gap map
//! feeds the sub-query generator; the coverage percentage drives early
//! exit from the component and depth loops.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use super::schemas::{ResearchPrompts, ResearchSchemas};
use crate::ai::generate_object;
use crate::ai::provider::LlmProvider;
use crate::constants::research::MINIMAL_ITERATION_GATE;
use crate::types::plan::Component;

// =============================================================================
// Gap Map
// =============================================================================

/// Per-criterion description of what information is still missing.
pub type GapMap = HashMap<String, String>;

/// Neutral gap value: no iterations have meaningfully run yet.
pub const NO_COVERAGE_YET: &str = "No coverage yet";
/// Neutral gap value: seeded before the first evaluation.
pub const INITIAL_GAP: &str = "Initial gap";
/// Neutral gap value: evaluator failed, research continues blind.
pub const UNKNOWN_GAP: &str = "Unknown gap; continuing";

/// Whether a gap entry is one of the reserved neutral values (carries no
/// targeting information for the sub-query generator).
pub fn is_neutral_gap(description: &str) -> bool {
    description == NO_COVERAGE_YET || description == INITIAL_GAP || description == UNKNOWN_GAP
}

/// Gap map marking every criterion with the same neutral value.
pub fn neutral_gap_map(component: &Component, value: &str) -> GapMap {
    component
        .success_criteria
        .iter()
        .map(|c| (c.clone(), value.to_string()))
        .collect()
}

// =============================================================================
// Saturation Result
// =============================================================================

/// Outcome of one saturation evaluation.
#[derive(Debug, Clone)]
pub struct SaturationResult {
    /// Further iterations are unlikely to surface new coverage
    pub is_saturated: bool,
    /// Integer coverage percent, always within 0..=100
    pub coverage_percentage: u8,
    /// Criteria the learnings already satisfy
    pub covered_criteria: Vec<String>,
    /// Criteria still open
    pub remaining_criteria: Vec<String>,
    /// Why this assessment holds
    pub reasoning: String,
    /// Per-criterion gap descriptions
    pub gap_details: GapMap,
}

impl SaturationResult {
    /// Continue-semantics result with every criterion marked `gap_value`.
    fn continue_with(component: &Component, reasoning: impl Into<String>, gap_value: &str) -> Self {
        Self {
            is_saturated: false,
            coverage_percentage: 0,
            covered_criteria: Vec::new(),
            remaining_criteria: component.success_criteria.clone(),
            reasoning: reasoning.into(),
            gap_details: neutral_gap_map(component, gap_value),
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

#[derive(Debug, Deserialize)]
struct SaturationPayload {
    #[serde(rename = "isSaturated")]
    is_saturated: bool,
    #[serde(rename = "coveragePercentage")]
    coverage_percentage: i64,
    #[serde(rename = "coveredCriteria", default)]
    covered_criteria: Vec<String>,
    #[serde(rename = "remainingCriteria", default)]
    remaining_criteria: Vec<String>,
    #[serde(rename = "gapDetails", default)]
    gap_details: HashMap<String, String>,
    #[serde(default)]
    reasoning: String,
}

/// Evaluate saturation for a component.
///
/// `completed_iterations` counts this component's finished deep-research
/// iterations; `planned_iterations` is `|sub_questions| × depth`. Below 10%
/// of planned, the evaluation short-circuits without an LLM call.
pub async fn evaluate_saturation(
    llm: &dyn LlmProvider,
    component: &Component,
    learnings: &[String],
    completed_iterations: u32,
    planned_iterations: u32,
) -> SaturationResult {
    let gate = (MINIMAL_ITERATION_GATE * planned_iterations.max(1) as f64).ceil() as u32;
    if completed_iterations < gate {
        return SaturationResult::continue_with(
            component,
            format!(
                "only {}/{} planned iterations completed",
                completed_iterations, planned_iterations
            ),
            NO_COVERAGE_YET,
        );
    }

    let prompt = ResearchPrompts::saturation(component, learnings);
    let schema = ResearchSchemas::saturation();

    let payload =
        match generate_object::<SaturationPayload>(llm, "saturation", &prompt, &schema).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(component = %component.name, error = %e, "saturation evaluation failed");
                return SaturationResult::continue_with(
                    component,
                    "saturation evaluator unavailable",
                    UNKNOWN_GAP,
                );
            }
        };

    // Criteria lists are constrained to the component's actual criteria
    let known = |c: &String| component.success_criteria.contains(c);
    let covered: Vec<String> = payload.covered_criteria.into_iter().filter(known).collect();
    let remaining: Vec<String> = payload
        .remaining_criteria
        .into_iter()
        .filter(known)
        .filter(|c| !covered.contains(c))
        .collect();

    // Every remaining criterion gets a gap entry, neutral when the LLM
    // omitted one
    let mut gap_details = GapMap::new();
    for criterion in &remaining {
        let description = payload
            .gap_details
            .get(criterion)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_GAP.to_string());
        gap_details.insert(criterion.clone(), description);
    }

    SaturationResult {
        is_saturated: payload.is_saturated,
        coverage_percentage: payload.coverage_percentage.clamp(0, 100) as u8,
        covered_criteria: covered,
        remaining_criteria: remaining,
        reasoning: payload.reasoning,
        gap_details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::MockLlm;
    use serde_json::json;

    fn component() -> Component {
        Component::new("A", "desc")
            .with_sub_question("q1")
            .with_sub_question("q2")
            .with_criterion("criterion one")
            .with_criterion("criterion two")
    }

    #[tokio::test]
    async fn test_gate_short_circuits_without_llm() {
        // MockLlm::failing would error if called; the gate must not call it
        let llm = MockLlm::failing();
        let result = evaluate_saturation(&llm, &component(), &[], 0, 10).await;

        assert!(!result.is_saturated);
        assert_eq!(result.coverage_percentage, 0);
        assert_eq!(result.remaining_criteria.len(), 2);
        for gap in result.gap_details.values() {
            assert_eq!(gap, NO_COVERAGE_YET);
        }
    }

    #[tokio::test]
    async fn test_coverage_clamped_to_100() {
        let llm = MockLlm::scripted(vec![json!({
            "isSaturated": true,
            "coveragePercentage": 250,
            "coveredCriteria": ["criterion one"],
            "remainingCriteria": ["criterion two"],
            "reasoning": "mostly done"
        })]);

        let result = evaluate_saturation(&llm, &component(), &["l".to_string()], 2, 4).await;
        assert_eq!(result.coverage_percentage, 100);
        assert!(result.is_saturated);
    }

    #[tokio::test]
    async fn test_unknown_criteria_filtered() {
        let llm = MockLlm::scripted(vec![json!({
            "isSaturated": false,
            "coveragePercentage": 40,
            "coveredCriteria": ["criterion one", "invented criterion"],
            "remainingCriteria": ["criterion two", "another invention"],
            "gapDetails": {"criterion two": "needs 2024 figures"},
            "reasoning": "partial"
        })]);

        let result = evaluate_saturation(&llm, &component(), &["l".to_string()], 2, 4).await;
        assert_eq!(result.covered_criteria, vec!["criterion one"]);
        assert_eq!(result.remaining_criteria, vec!["criterion two"]);
        assert_eq!(result.gap_details["criterion two"], "needs 2024 figures");
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_failure_means_continue() {
        let llm = MockLlm::failing();
        let result = evaluate_saturation(&llm, &component(), &["l".to_string()], 2, 4).await;

        assert!(!result.is_saturated);
        assert_eq!(result.coverage_percentage, 0);
        for gap in result.gap_details.values() {
            assert_eq!(gap, UNKNOWN_GAP);
        }
    }

    #[test]
    fn test_neutral_gap_values() {
        assert!(is_neutral_gap(NO_COVERAGE_YET));
        assert!(is_neutral_gap(INITIAL_GAP));
        assert!(is_neutral_gap(UNKNOWN_GAP));
        assert!(!is_neutral_gap("needs pricing data"));
    }
}
