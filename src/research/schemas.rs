//! JSON Schemas and Prompts for Research LLM Calls
//!
//! Every LLM call names one of these schemas; the provider embeds it in the
//! system prompt and the caller enforces it by typed deserialization.
//!
//! Best practices applied:
//! - All objects have `additionalProperties: false` (except open maps)
//! - All fields have clear `description`
//! - Required fields explicitly listed
//!
//! Prompt wording is interchangeable as long as the JSON contract holds;
//! only the contracts here are load-bearing.

use serde_json::json;

use crate::types::plan::{Component, FeedbackResponse};

/// Schema provider for research calls
pub struct ResearchSchemas;

impl ResearchSchemas {
    /// Schema for the research plan
    pub fn plan() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Research program decomposing a query into independently researchable components",
            "required": ["mainObjective", "components", "sequencing"],
            "additionalProperties": false,
            "properties": {
                "mainObjective": {
                    "type": "string",
                    "description": "The overall objective driving every component"
                },
                "components": {
                    "type": "array",
                    "description": "Uniquely named components, each addressing a distinct aspect",
                    "items": {
                        "type": "object",
                        "required": ["name", "description", "subQuestions", "successCriteria"],
                        "additionalProperties": false,
                        "properties": {
                            "name": {"type": "string", "description": "Short unique component name"},
                            "description": {"type": "string", "description": "What this component investigates"},
                            "subQuestions": {
                                "type": "array",
                                "description": "Focused questions, each individually searchable",
                                "items": {"type": "string"}
                            },
                            "successCriteria": {
                                "type": "array",
                                "description": "Criteria that define completion of this component",
                                "items": {"type": "string"}
                            }
                        }
                    }
                },
                "sequencing": {
                    "type": "array",
                    "description": "Component names in recommended research order",
                    "items": {"type": "string"}
                },
                "potentialPivots": {
                    "type": "array",
                    "description": "Alternative directions should the research stall",
                    "items": {"type": "string"}
                }
            }
        })
    }

    /// Schema for importance scores
    pub fn importance() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Relevance score per component, 0-100, intended to sum to about 100",
            "required": ["scores"],
            "additionalProperties": false,
            "properties": {
                "scores": {
                    "type": "object",
                    "description": "Map from component name to relevance score",
                    "additionalProperties": {"type": "number"}
                }
            }
        })
    }

    /// Schema for generated sub-queries
    pub fn sub_queries() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Search queries targeting the current knowledge gaps",
            "required": ["queries"],
            "additionalProperties": false,
            "properties": {
                "queries": {
                    "type": "array",
                    "description": "Search queries of 2-5 plain words each",
                    "items": {
                        "type": "object",
                        "required": ["query", "reasoning"],
                        "additionalProperties": false,
                        "properties": {
                            "query": {"type": "string", "description": "2-5 word search query, no quotes or operators"},
                            "reasoning": {"type": "string", "description": "Why this query closes a gap"}
                        }
                    }
                }
            }
        })
    }

    /// Schema for the search-results summarizer
    pub fn summarize() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Factual learnings extracted from search content",
            "required": ["learnings"],
            "additionalProperties": false,
            "properties": {
                "learnings": {
                    "type": "array",
                    "description": "At most 5 standalone factual statements",
                    "items": {"type": "string"},
                    "maxItems": 5
                }
            }
        })
    }

    /// Schema for the analysis-and-plan step
    pub fn analysis() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Assessment of one iteration's findings and the next direction",
            "required": ["summary", "valuable", "gaps", "shouldContinue", "nextSearchTopic"],
            "additionalProperties": false,
            "properties": {
                "summary": {"type": "string", "description": "One-paragraph digest of the findings"},
                "valuable": {"type": "boolean", "description": "Whether the findings advanced the research"},
                "gaps": {
                    "type": "array",
                    "description": "Specific information still missing",
                    "items": {"type": "string"}
                },
                "shouldContinue": {"type": "boolean", "description": "Whether another iteration is worthwhile"},
                "nextSearchTopic": {"type": "string", "description": "Replacement query for the next iteration, empty to keep the current one"}
            }
        })
    }

    /// Schema for the saturation evaluator
    pub fn saturation() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Coverage of success criteria after an iteration",
            "required": ["isSaturated", "coveragePercentage", "coveredCriteria", "remainingCriteria", "reasoning"],
            "additionalProperties": false,
            "properties": {
                "isSaturated": {"type": "boolean", "description": "Whether further iterations are unlikely to add coverage"},
                "coveragePercentage": {"type": "integer", "description": "Integer percent of criteria covered, 0-100"},
                "coveredCriteria": {
                    "type": "array",
                    "description": "Success criteria already satisfied by the learnings",
                    "items": {"type": "string"}
                },
                "remainingCriteria": {
                    "type": "array",
                    "description": "Success criteria not yet satisfied",
                    "items": {"type": "string"}
                },
                "gapDetails": {
                    "type": "object",
                    "description": "Per-criterion description of what is still missing",
                    "additionalProperties": {"type": "string"}
                },
                "reasoning": {"type": "string", "description": "Why this coverage assessment holds"}
            }
        })
    }

    /// Schema for the quality evaluator
    pub fn quality() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Post-component quality check with optional follow-up queries",
            "required": ["meetsQuality", "missingElements", "additionalQueries"],
            "additionalProperties": false,
            "properties": {
                "meetsQuality": {"type": "boolean", "description": "Whether the success criteria are met"},
                "missingElements": {
                    "type": "array",
                    "description": "Specific missing pieces of information",
                    "items": {"type": "string"}
                },
                "additionalQueries": {
                    "type": "array",
                    "description": "At most 2 focused queries that would close the gaps",
                    "items": {"type": "string"},
                    "maxItems": 2
                }
            }
        })
    }

    /// Schema for the component summary
    pub fn component_summary() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Narrative summary of one component's findings",
            "required": ["summary"],
            "additionalProperties": false,
            "properties": {
                "summary": {"type": "string", "description": "Concise narrative covering the key learnings"}
            }
        })
    }

    /// Schema for one report section
    pub fn section() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Markdown section for one component of the report",
            "required": ["sectionContent"],
            "additionalProperties": false,
            "properties": {
                "sectionContent": {"type": "string", "description": "Markdown body referencing the component's criteria and learnings"}
            }
        })
    }

    /// Schema for the fallback (non-streaming) report
    pub fn fallback_report() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Complete research report as a single markdown document",
            "required": ["reportMarkdown"],
            "additionalProperties": false,
            "properties": {
                "reportMarkdown": {"type": "string", "description": "Full report markdown"}
            }
        })
    }

    /// Schema for the scheduling decision
    pub fn schedule_decision() -> serde_json::Value {
        json!({
            "type": "object",
            "description": "Skip-or-continue decision for a component under time pressure",
            "required": ["shouldContinue", "reasoning"],
            "additionalProperties": false,
            "properties": {
                "shouldContinue": {"type": "boolean", "description": "Whether to research this component at all"},
                "reasoning": {"type": "string", "description": "Why, given the timing numbers"},
                "recommendedBreadth": {"type": "integer", "description": "Suggested breadth if continuing"},
                "recommendedDepth": {"type": "integer", "description": "Suggested depth if continuing"}
            }
        })
    }
}

/// Prompt builders for research calls
pub struct ResearchPrompts;

impl ResearchPrompts {
    /// Prompt for plan creation
    pub fn plan(query: &str, feedback: &[FeedbackResponse]) -> String {
        let mut prompt = format!(
            r#"Create a research plan for the following query.

QUERY:
{}
"#,
            query
        );

        if !feedback.is_empty() {
            prompt.push_str("\nCLARIFYING ANSWERS FROM THE USER:\n");
            for item in feedback {
                prompt.push_str(&format!("Q: {}\nA: {}\n", item.question, item.response));
            }
        }

        prompt.push_str(
            r#"
Decompose the query into components where:
1. Each component addresses a DISTINCT aspect of the query
2. Sub-questions are focused enough to be individually searchable
3. Success criteria define when the component is complete
4. Sequencing orders components by how much later work depends on them
5. Potential pivots name directions to try if the research stalls

Respond with valid JSON matching the schema."#,
        );

        prompt
    }

    /// Prompt for importance scoring
    pub fn importance(main_objective: &str, components: &[Component]) -> String {
        let listing = components
            .iter()
            .map(|c| format!("- {}: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Score each research component's relevance to the main objective.

MAIN OBJECTIVE:
{}

COMPONENTS:
{}

Assign each component a score from 0 to 100. Scores should sum to
approximately 100 and reflect how much the final answer depends on the
component.

Respond with valid JSON matching the schema."#,
            main_objective, listing
        )
    }

    /// Prompt for sub-query generation
    pub fn sub_queries(
        query: &str,
        count: usize,
        learnings: &[String],
        main_topic: Option<&str>,
        component_context: Option<&str>,
        gap_lines: &[String],
    ) -> String {
        let mut prompt = format!(
            r#"Generate up to {} web search queries to advance this research.

CURRENT QUERY:
{}
"#,
            count, query
        );

        if let Some(context) = component_context {
            prompt.push_str(&format!("\nCOMPONENT CONTEXT:\n{}\n", context));
        }

        if !learnings.is_empty() {
            prompt.push_str("\nWHAT WE ALREADY KNOW (do not re-search these):\n");
            for learning in learnings {
                prompt.push_str(&format!("- {}\n", learning));
            }
        }

        if !gap_lines.is_empty() {
            prompt.push_str("\nOPEN GAPS (bias queries toward closing these):\n");
            for gap in gap_lines {
                prompt.push_str(&format!("- {}\n", gap));
            }
        }

        if let Some(topic) = main_topic
            && !query.to_lowercase().contains(&topic.to_lowercase())
        {
            prompt.push_str(&format!(
                "\nThe main topic is \"{}\"; include it in each query.\n",
                topic
            ));
        }

        prompt.push_str(
            r#"
Rules for each query:
1. 2 to 5 words, the way a person types into a search box
2. No quotation marks, no boolean operators
3. No site: operators, except site:reddit.com or site:quora.com when
   first-hand experiences would help

Respond with valid JSON matching the schema."#,
        );

        prompt
    }

    /// Prompt for the search-results summarizer
    pub fn summarize(query: &str, contents: &str) -> String {
        format!(
            r#"Extract factual learnings from these search results.

SEARCH QUERY:
{}

SEARCH RESULTS:
{}

Extract at most 5 learnings. Each must be a standalone factual statement
supported by the content - include numbers, names, and dates where present.
Do not speculate beyond the content.

Respond with valid JSON matching the schema."#,
            query, contents
        )
    }

    /// Prompt for the analysis-and-plan step
    pub fn analysis(query: &str, learnings: &[String]) -> String {
        let listing = learnings
            .iter()
            .map(|l| format!("- {}", l))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Assess the findings for this search query and decide the next step.

QUERY:
{}

FINDINGS:
{}

Determine:
1. A one-paragraph summary of the findings
2. Whether they are valuable (advanced the research)
3. What specific information is still missing
4. Whether another search iteration is worthwhile
5. If the direction should change, the replacement search topic
   (empty string to keep the current one)

Respond with valid JSON matching the schema."#,
            query, listing
        )
    }

    /// Prompt for the saturation evaluator
    pub fn saturation(component: &Component, learnings: &[String]) -> String {
        let criteria = component
            .success_criteria
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n");
        let listing = learnings
            .iter()
            .map(|l| format!("- {}", l))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Evaluate how well the learnings cover this component's success criteria.

COMPONENT: {}
{}

SUCCESS CRITERIA:
{}

LEARNINGS SO FAR:
{}

Classify every criterion as covered or remaining, give an integer coverage
percentage, and for each remaining criterion describe the specific gap.
Mark the component saturated only if further searching is unlikely to add
coverage.

Respond with valid JSON matching the schema."#,
            component.name, component.description, criteria, listing
        )
    }

    /// Prompt for the quality evaluator
    pub fn quality(component: &Component, summary: &str, learnings: &[String]) -> String {
        let criteria = component
            .success_criteria
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n");
        let listing = learnings
            .iter()
            .map(|l| format!("- {}", l))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Judge whether this component's research meets its success criteria.

COMPONENT: {}

SUCCESS CRITERIA:
{}

SUMMARY:
{}

LEARNINGS:
{}

If the criteria are not met, list the specific missing elements and suggest
at most 2 focused search queries that would close them.

Respond with valid JSON matching the schema."#,
            component.name, criteria, summary, listing
        )
    }

    /// Prompt for the component summary
    pub fn component_summary(component: &Component, learnings: &[String]) -> String {
        let listing = learnings
            .iter()
            .map(|l| format!("- {}", l))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Summarize the research findings for this component.

COMPONENT: {}
{}

LEARNINGS:
{}

Write a concise narrative summary covering the key findings. Mention
concrete facts; do not pad.

Respond with valid JSON matching the schema."#,
            component.name, component.description, listing
        )
    }

    /// Prompt for one report section
    pub fn section(component: &Component, summary: &str, learnings: &[String]) -> String {
        let criteria = component
            .success_criteria
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n");
        let listing = learnings
            .iter()
            .map(|l| format!("- {}", l))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Write the report section for this research component.

COMPONENT: {}
{}

SUCCESS CRITERIA:
{}

SUMMARY:
{}

LEARNINGS:
{}

Produce well-structured markdown (no top-level heading; the assembler adds
it) that addresses the success criteria using the learnings.

Respond with valid JSON matching the schema."#,
            component.name, component.description, criteria, summary, listing
        )
    }

    /// Prompt for the fallback report synthesis on the primary model
    pub fn fallback_report(objective: &str, sections_markdown: &str, sources: &[String]) -> String {
        let source_listing = sources
            .iter()
            .map(|u| format!("- {}", u))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Assemble the final research report.

MAIN OBJECTIVE:
{}

COMPONENT SECTIONS:
{}

SOURCES:
{}

Produce one coherent markdown report: a title, an executive summary, the
component sections (one heading each), and a final "Sources" section
listing every URL.

Respond with valid JSON matching the schema."#,
            objective, sections_markdown, source_listing
        )
    }

    /// Prompt for the scheduling decision under time pressure
    pub fn schedule_decision(
        component: &Component,
        remaining_ms: u64,
        remaining_components: usize,
        recent_iteration_ms: u64,
        estimated_component_ms: u64,
    ) -> String {
        format!(
            r#"Decide whether to research this component given the time budget.

COMPONENT: {}
{}

TIMING:
- Remaining budget: {} s
- Components still queued: {}
- Recent iteration time: {} s
- Estimated time for this component: {} s

Should this component be researched at all, and if so with what breadth
and depth? Skipping frees its time for the remaining components.

Respond with valid JSON matching the schema."#,
            component.name,
            component.description,
            remaining_ms / 1000,
            remaining_components,
            recent_iteration_ms / 1000,
            estimated_component_ms / 1000
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closed_schemas_reject_additional_properties() {
        for schema in [
            ResearchSchemas::plan(),
            ResearchSchemas::sub_queries(),
            ResearchSchemas::summarize(),
            ResearchSchemas::analysis(),
            ResearchSchemas::saturation(),
            ResearchSchemas::quality(),
            ResearchSchemas::component_summary(),
            ResearchSchemas::section(),
            ResearchSchemas::fallback_report(),
            ResearchSchemas::schedule_decision(),
        ] {
            assert_eq!(schema.get("additionalProperties"), Some(&json!(false)));
        }
    }

    #[test]
    fn test_summarize_schema_caps_learnings() {
        let schema = ResearchSchemas::summarize();
        assert_eq!(schema["properties"]["learnings"]["maxItems"], json!(5));
    }

    #[test]
    fn test_plan_prompt_includes_feedback() {
        let feedback = vec![FeedbackResponse {
            question: "Which region?".to_string(),
            response: "Europe".to_string(),
        }];
        let prompt = ResearchPrompts::plan("four day workweek", &feedback);
        assert!(prompt.contains("Which region?"));
        assert!(prompt.contains("Europe"));
    }

    #[test]
    fn test_subquery_prompt_requests_main_topic_when_absent() {
        let prompt = ResearchPrompts::sub_queries(
            "productivity metrics",
            3,
            &[],
            Some("four day workweek"),
            None,
            &[],
        );
        assert!(prompt.contains("include it in each query"));

        // Topic already present: no inclusion request
        let prompt = ResearchPrompts::sub_queries(
            "four day workweek metrics",
            3,
            &[],
            Some("four day workweek"),
            None,
            &[],
        );
        assert!(!prompt.contains("include it in each query"));
    }
}
