//! Research Plan Model
//!
//! The plan is produced once by the planner, optionally mutated once by the
//! rebalancer, and immutable afterwards. The orchestrator is its sole owner;
//! quick-pass workers only ever see a borrowed component.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::error::{FathomError, Result};

// =============================================================================
// Component
// =============================================================================

/// A named slice of the research plan with its own sub-questions and
/// success criteria.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Unique component name, used as the key everywhere downstream
    pub name: String,
    /// What this component investigates
    pub description: String,
    /// Individually searchable sub-questions (at least one)
    #[serde(rename = "subQuestions")]
    pub sub_questions: Vec<String>,
    /// Criteria that define completion (at least one)
    #[serde(rename = "successCriteria")]
    pub success_criteria: Vec<String>,
}

impl Component {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sub_questions: Vec::new(),
            success_criteria: Vec::new(),
        }
    }

    pub fn with_sub_question(mut self, question: impl Into<String>) -> Self {
        self.sub_questions.push(question.into());
        self
    }

    pub fn with_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.success_criteria.push(criterion.into());
        self
    }
}

// =============================================================================
// Research Plan
// =============================================================================

/// Full research program for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// The overall objective driving every component
    #[serde(rename = "mainObjective")]
    pub main_objective: String,
    /// Uniquely named components (at least one)
    pub components: Vec<Component>,
    /// Execution order: a permutation of component names
    pub sequencing: Vec<String>,
    /// Candidate pivot directions should the research stall
    #[serde(rename = "potentialPivots", default)]
    pub potential_pivots: Vec<String>,
}

impl ResearchPlan {
    /// Validate the structural invariants: components are uniquely named,
    /// at least one exists, every component carries at least one
    /// sub-question and one criterion, and `sequencing` is a permutation of
    /// the component names.
    pub fn validate(&self) -> Result<()> {
        if self.components.is_empty() {
            return Err(FathomError::InvalidPlan(
                "plan must contain at least one component".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for component in &self.components {
            if !names.insert(component.name.as_str()) {
                return Err(FathomError::InvalidPlan(format!(
                    "duplicate component name: {}",
                    component.name
                )));
            }
            if component.sub_questions.is_empty() {
                return Err(FathomError::InvalidPlan(format!(
                    "component '{}' has no sub-questions",
                    component.name
                )));
            }
            if component.success_criteria.is_empty() {
                return Err(FathomError::InvalidPlan(format!(
                    "component '{}' has no success criteria",
                    component.name
                )));
            }
        }

        if self.sequencing.len() != self.components.len() {
            return Err(FathomError::InvalidPlan(format!(
                "sequencing lists {} names for {} components",
                self.sequencing.len(),
                self.components.len()
            )));
        }
        for name in &self.sequencing {
            if !names.contains(name.as_str()) {
                return Err(FathomError::InvalidPlan(format!(
                    "sequencing references unknown component: {}",
                    name
                )));
            }
        }
        let sequenced: HashSet<&str> = self.sequencing.iter().map(String::as_str).collect();
        if sequenced.len() != self.sequencing.len() {
            return Err(FathomError::InvalidPlan(
                "sequencing repeats a component name".to_string(),
            ));
        }

        Ok(())
    }

    /// Repair a plan whose sequencing is missing or inconsistent by
    /// regenerating it from the component order. Returns whether a repair
    /// was applied.
    pub fn repair_sequencing(&mut self) -> bool {
        if self.validate().is_ok() {
            return false;
        }
        self.sequencing = self.components.iter().map(|c| c.name.clone()).collect();
        true
    }

    /// Look up a component by name
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Minimal valid plan used when the planner LLM call fails: one
    /// component whose single sub-question is the original query.
    pub fn minimal(query: &str) -> Self {
        Self {
            main_objective: query.to_string(),
            components: vec![
                Component::new("Basic Research", format!("Research on: {}", query))
                    .with_sub_question(query)
                    .with_criterion("Find relevant information on the topic"),
            ],
            sequencing: vec!["Basic Research".to_string()],
            potential_pivots: Vec::new(),
        }
    }
}

// =============================================================================
// Clarifying Feedback
// =============================================================================

/// One answered clarifying question, woven into the planner prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub question: String,
    pub response: String,
}
