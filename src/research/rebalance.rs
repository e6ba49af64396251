//! Plan Rebalancer
//!
//! After the quick pass, reorders the plan's sequencing by descending
//! importance and computes a final depth multiplier per component. The
//! multiplier's reference mean is `100 / |components|`, not the actual
//! mean of returned scores; clamping to [0.5, 2.0] contains skew when the
//! LLM violates the "sum ≈ 100" hint.

use std::collections::HashMap;

use tracing::debug;

use crate::constants::research::{MULTIPLIER_MAX, MULTIPLIER_MIN};
use crate::types::ResearchPlan;

/// Reorder `plan.sequencing` by descending importance score and return the
/// per-component depth multipliers. Ties keep their existing relative
/// order, so equal scores leave the sequencing unchanged.
///
/// `overrides` are caller-supplied multipliers that win over computed ones.
pub fn rebalance(
    plan: &mut ResearchPlan,
    scores: &HashMap<String, f64>,
    overrides: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    let equal_share = 100.0 / plan.components.len() as f64;

    plan.sequencing.sort_by(|a, b| {
        let score_a = scores.get(a).copied().unwrap_or(equal_share);
        let score_b = scores.get(b).copied().unwrap_or(equal_share);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut multipliers = HashMap::new();
    for name in &plan.sequencing {
        let multiplier = if let Some(override_value) = overrides.get(name) {
            override_value.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX)
        } else {
            let score = scores.get(name).copied().unwrap_or(equal_share);
            (0.5 + (score / equal_share) * 0.75).clamp(MULTIPLIER_MIN, MULTIPLIER_MAX)
        };
        debug!(component = %name, multiplier, "depth multiplier assigned");
        multipliers.insert(name.clone(), multiplier);
    }

    multipliers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::plan::Component;

    fn plan_with(names: &[&str]) -> ResearchPlan {
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

    #[test]
    fn test_sort_by_descending_importance() {
        let mut plan = plan_with(&["A", "B", "C"]);
        let scores = HashMap::from([
            ("A".to_string(), 10.0),
            ("B".to_string(), 60.0),
            ("C".to_string(), 30.0),
        ]);

        rebalance(&mut plan, &scores, &HashMap::new());
        assert_eq!(plan.sequencing, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_equal_scores_leave_sequencing_unchanged() {
        let mut plan = plan_with(&["A", "B", "C"]);
        let scores = HashMap::from([
            ("A".to_string(), 33.3),
            ("B".to_string(), 33.3),
            ("C".to_string(), 33.3),
        ]);

        rebalance(&mut plan, &scores, &HashMap::new());
        assert_eq!(plan.sequencing, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_multiplier_formula() {
        let mut plan = plan_with(&["A", "B"]);
        // Equal share = 50. A at exactly the mean: 0.5 + 1.0 * 0.75 = 1.25
        let scores = HashMap::from([("A".to_string(), 50.0), ("B".to_string(), 50.0)]);

        let multipliers = rebalance(&mut plan, &scores, &HashMap::new());
        assert!((multipliers["A"] - 1.25).abs() < 1e-9);
        assert!((multipliers["B"] - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_clamped() {
        let mut plan = plan_with(&["A", "B"]);
        // A far above mean would compute > 2.0, B at zero computes 0.5
        let scores = HashMap::from([("A".to_string(), 500.0), ("B".to_string(), 0.0)]);

        let multipliers = rebalance(&mut plan, &scores, &HashMap::new());
        assert_eq!(multipliers["A"], 2.0);
        assert_eq!(multipliers["B"], 0.5);
    }

    #[test]
    fn test_override_wins_and_is_clamped() {
        let mut plan = plan_with(&["A", "B"]);
        let scores = HashMap::from([("A".to_string(), 50.0), ("B".to_string(), 50.0)]);
        let overrides = HashMap::from([("A".to_string(), 1.8), ("B".to_string(), 9.0)]);

        let multipliers = rebalance(&mut plan, &scores, &overrides);
        assert_eq!(multipliers["A"], 1.8);
        assert_eq!(multipliers["B"], 2.0);
    }
}
