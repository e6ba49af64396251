//! Report Assembler
//!
//! Two stages. Section building turns each completed component into a
//! markdown section (LLM, with a mechanical summary+bullets fallback).
//! Synthesis then produces the final document: the dedicated streaming
//! synthesis API when configured, the primary model's single-JSON report
//! otherwise, and a mechanical assembly when both fail. A report is always
//! produced from whatever components completed.

pub mod synthesis;

pub use synthesis::{AnthropicSynthesis, SynthesisApi};

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::ai::generate_object;
use crate::constants::report::MAX_LEARNINGS_PER_SECTION;
use crate::research::ResearchContext;
use crate::research::schemas::{ResearchPrompts, ResearchSchemas};
use crate::types::plan::Component;
use crate::types::{ComponentResult, ResearchPlan};

/// One assembled report section
#[derive(Debug, Clone)]
pub struct ComponentSection {
    pub name: String,
    pub markdown: String,
}

#[derive(Debug, Deserialize)]
struct SectionPayload {
    #[serde(rename = "sectionContent")]
    section_content: String,
}

#[derive(Debug, Deserialize)]
struct FallbackReportPayload {
    #[serde(rename = "reportMarkdown")]
    report_markdown: String,
}

// =============================================================================
// Section Building
// =============================================================================

/// Build one markdown section per completed component, in completion order.
pub async fn build_sections(
    ctx: &ResearchContext,
    plan: &ResearchPlan,
    results: &HashMap<String, ComponentResult>,
    completed: &[String],
) -> Vec<ComponentSection> {
    let mut sections = Vec::new();

    for name in completed {
        let Some(result) = results.get(name) else {
            continue;
        };
        let Some(component) = plan.component(name) else {
            continue;
        };

        let learnings: Vec<String> = result
            .learnings
            .iter()
            .take(MAX_LEARNINGS_PER_SECTION)
            .cloned()
            .collect();

        let prompt = ResearchPrompts::section(component, &result.summary, &learnings);
        let schema = ResearchSchemas::section();

        let markdown = match generate_object::<SectionPayload>(
            ctx.llm.as_ref(),
            "section",
            &prompt,
            &schema,
        )
        .await
        {
            Ok(payload) => payload.section_content,
            Err(e) => {
                warn!(component = %name, error = %e, "section generation failed, assembling mechanically");
                mechanical_section(component, result)
            }
        };

        sections.push(ComponentSection {
            name: name.clone(),
            markdown,
        });
    }

    sections
}

/// Section assembled without an LLM: summary plus bullet learnings.
fn mechanical_section(component: &Component, result: &ComponentResult) -> String {
    let mut markdown = String::new();
    if !result.summary.is_empty() {
        markdown.push_str(&result.summary);
        markdown.push_str("\n\n");
    }
    if !result.learnings.is_empty() {
        markdown.push_str("Key findings:\n\n");
        for learning in &result.learnings {
            markdown.push_str(&format!("- {}\n", learning));
        }
    }
    if markdown.is_empty() {
        markdown = format!("No findings were gathered for {}.", component.name);
    }
    markdown
}

// =============================================================================
// Final Assembly
// =============================================================================

/// Produce the final report markdown.
pub async fn assemble_report(
    ctx: &ResearchContext,
    synthesis: Option<&Arc<dyn SynthesisApi>>,
    plan: &ResearchPlan,
    results: &HashMap<String, ComponentResult>,
    completed: &[String],
    sources: &[String],
) -> String {
    let sections = build_sections(ctx, plan, results, completed).await;

    if let Some(api) = synthesis {
        let prompt = synthesis_prompt(plan, &sections, results, sources);
        match api.synthesize(&prompt, &ctx.sink, &ctx.cancel).await {
            Ok(markdown) => {
                info!("report produced by synthesis API");
                return markdown;
            }
            Err(e) => {
                warn!(error = %e, "synthesis API failed, falling back to primary model");
            }
        }
    }

    fallback_report(ctx, plan, &sections, sources).await
}

/// Full bundle sent to the synthesis API.
fn synthesis_prompt(
    plan: &ResearchPlan,
    sections: &[ComponentSection],
    results: &HashMap<String, ComponentResult>,
    sources: &[String],
) -> String {
    let mut prompt = format!(
        r#"Write the final research report in markdown.

MAIN OBJECTIVE:
{}

COMPONENT SECTIONS:
"#,
        plan.main_objective
    );

    for section in sections {
        prompt.push_str(&format!("\n## {}\n\n{}\n", section.name, section.markdown));
        if let Some(result) = results.get(&section.name)
            && !result.learnings.is_empty()
        {
            prompt.push_str("\nRaw learnings:\n");
            for learning in result.learnings.iter().take(MAX_LEARNINGS_PER_SECTION) {
                prompt.push_str(&format!("- {}\n", learning));
            }
        }
    }

    prompt.push_str("\nSOURCES:\n");
    for url in sources {
        prompt.push_str(&format!("- {}\n", url));
    }

    prompt.push_str(
        "\nProduce one polished report: title, executive summary, a section per component, and a final \"Sources\" section listing every URL.",
    );
    prompt
}

/// Primary-model report, mechanical assembly as the last resort.
async fn fallback_report(
    ctx: &ResearchContext,
    plan: &ResearchPlan,
    sections: &[ComponentSection],
    sources: &[String],
) -> String {
    let sections_markdown = sections
        .iter()
        .map(|s| format!("## {}\n\n{}", s.name, s.markdown))
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt =
        ResearchPrompts::fallback_report(&plan.main_objective, &sections_markdown, sources);
    let schema = ResearchSchemas::fallback_report();

    match generate_object::<FallbackReportPayload>(
        ctx.llm.as_ref(),
        "fallback_report",
        &prompt,
        &schema,
    )
    .await
    {
        Ok(payload) if !payload.report_markdown.trim().is_empty() => payload.report_markdown,
        Ok(_) => {
            warn!("primary model returned empty report, assembling mechanically");
            mechanical_report(plan, sections, sources)
        }
        Err(e) => {
            warn!(error = %e, "primary model report failed, assembling mechanically");
            mechanical_report(plan, sections, sources)
        }
    }
}

/// Report assembled without any LLM.
fn mechanical_report(
    plan: &ResearchPlan,
    sections: &[ComponentSection],
    sources: &[String],
) -> String {
    let mut markdown = format!("# {}\n", plan.main_objective);

    for section in sections {
        markdown.push_str(&format!("\n## {}\n\n{}\n", section.name, section.markdown));
    }

    if !sources.is_empty() {
        markdown.push_str("\n## Sources\n\n");
        for url in sources {
            markdown.push_str(&format!("- {}\n", url));
        }
    }

    markdown.push_str(&format!(
        "\n---\n\n*Researched on {}*\n",
        chrono::Utc::now().format("%Y-%m-%d")
    ));

    markdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::testing::{MockLlm, MockSearch, context};
    use crate::types::plan::Component;
    use serde_json::json;
    use std::sync::Arc;

    fn plan() -> ResearchPlan {
        ResearchPlan {
            main_objective: "four day workweek impact".to_string(),
            components: vec![
                Component::new("Productivity", "d")
                    .with_sub_question("q")
                    .with_criterion("c"),
                Component::new("Wellbeing", "d")
                    .with_sub_question("q")
                    .with_criterion("c"),
            ],
            sequencing: vec!["Productivity".to_string(), "Wellbeing".to_string()],
            potential_pivots: vec![],
        }
    }

    fn results() -> HashMap<String, ComponentResult> {
        HashMap::from([
            (
                "Productivity".to_string(),
                ComponentResult {
                    learnings: vec!["output held at 80 percent hours".to_string()],
                    visited_urls: vec!["https://example.org/p".to_string()],
                    summary: "Productivity held steady.".to_string(),
                    time_spent_ms: 100,
                },
            ),
            (
                "Wellbeing".to_string(),
                ComponentResult {
                    learnings: vec!["burnout reports dropped".to_string()],
                    visited_urls: vec!["https://example.org/w".to_string()],
                    summary: "Wellbeing improved.".to_string(),
                    time_spent_ms: 100,
                },
            ),
        ])
    }

    #[tokio::test]
    async fn test_sections_from_llm_in_completion_order() {
        let llm = Arc::new(MockLlm::scripted(vec![
            json!({"sectionContent": "Wellbeing section body"}),
            json!({"sectionContent": "Productivity section body"}),
        ]));
        let ctx = context(llm, Arc::new(MockSearch::always(vec![])));

        let completed = vec!["Wellbeing".to_string(), "Productivity".to_string()];
        let sections = build_sections(&ctx, &plan(), &results(), &completed).await;

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "Wellbeing");
        assert_eq!(sections[0].markdown, "Wellbeing section body");
        assert_eq!(sections[1].name, "Productivity");
    }

    #[tokio::test]
    async fn test_section_fallback_is_mechanical() {
        let llm = Arc::new(MockLlm::failing());
        let ctx = context(llm, Arc::new(MockSearch::always(vec![])));

        let completed = vec!["Productivity".to_string()];
        let sections = build_sections(&ctx, &plan(), &results(), &completed).await;

        assert_eq!(sections.len(), 1);
        assert!(sections[0].markdown.contains("Productivity held steady."));
        assert!(sections[0].markdown.contains("- output held at 80 percent hours"));
    }

    #[tokio::test]
    async fn test_fallback_report_via_primary_model() {
        let llm = Arc::new(MockLlm::scripted(vec![
            json!({"sectionContent": "P body"}),
            json!({"reportMarkdown": "# Full Report\n\ncontent"}),
        ]));
        let ctx = context(llm, Arc::new(MockSearch::always(vec![])));

        let completed = vec!["Productivity".to_string()];
        let report = assemble_report(
            &ctx,
            None,
            &plan(),
            &results(),
            &completed,
            &["https://example.org/p".to_string()],
        )
        .await;

        assert_eq!(report, "# Full Report\n\ncontent");
    }

    #[tokio::test]
    async fn test_mechanical_report_has_headings_and_sources() {
        // Every LLM call fails: sections and report assemble mechanically
        let llm = Arc::new(MockLlm::failing());
        let ctx = context(llm, Arc::new(MockSearch::always(vec![])));

        let completed = vec!["Productivity".to_string(), "Wellbeing".to_string()];
        let sources = vec![
            "https://example.org/p".to_string(),
            "https://example.org/w".to_string(),
        ];
        let report = assemble_report(&ctx, None, &plan(), &results(), &completed, &sources).await;

        assert!(report.contains("# four day workweek impact"));
        assert!(report.contains("## Productivity"));
        assert!(report.contains("## Wellbeing"));
        assert!(report.contains("## Sources"));
        assert!(report.contains("- https://example.org/p"));
        assert!(report.contains("- https://example.org/w"));
    }

    #[tokio::test]
    async fn test_synthesis_api_wins_when_available() {
        use crate::cancel::CancelToken;
        use crate::progress::SafeSink;
        use crate::types::{ApiTestResult, Result};
        use async_trait::async_trait;

        struct FixedSynthesis;

        #[async_trait]
        impl SynthesisApi for FixedSynthesis {
            async fn synthesize(
                &self,
                _prompt: &str,
                sink: &SafeSink,
                _cancel: &CancelToken,
            ) -> Result<String> {
                sink.progress("# Synthesized").await;
                Ok("# Synthesized\n\nreport".to_string())
            }

            async fn smoke_test(&self) -> ApiTestResult {
                ApiTestResult {
                    success: true,
                    message: "ok".to_string(),
                }
            }
        }

        // Primary model would fail; the synthesis API must win first
        let llm = Arc::new(MockLlm::scripted(vec![
            json!({"sectionContent": "P body"}),
        ]));
        let ctx = context(llm, Arc::new(MockSearch::always(vec![])));
        let api: Arc<dyn SynthesisApi> = Arc::new(FixedSynthesis);

        let completed = vec!["Productivity".to_string()];
        let report =
            assemble_report(&ctx, Some(&api), &plan(), &results(), &completed, &[]).await;

        assert_eq!(report, "# Synthesized\n\nreport");
    }
}
