//! Deep-Research Sub-Routine
//!
//! One invocation researches a single question: for each depth iteration it
//! generates sub-queries, searches and scrapes, summarizes the content into
//! factual learnings, and asks the analysis step whether and where to
//! continue. Empty search results trigger one query-simplification retry
//! before the sub-query is skipped.
//!
//! Search *network* failures propagate to the caller (the component may
//! fail; the orchestrator moves on). LLM failures never propagate - each
//! has a documented local fallback.

use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, warn};

use super::ResearchContext;
use super::saturation::{GapMap, evaluate_saturation};
use super::schemas::{ResearchPrompts, ResearchSchemas};
use super::state::Deadline;
use super::subquery::{generate_sub_queries, simplify_query};
use crate::ai::provider::LlmProvider;
use crate::ai::{generate_object, trim_content, trim_to_token_budget};
use crate::constants::research::{
    FALLBACK_QUERY_MAX_WORDS, MAX_LEARNINGS_PER_SUMMARY, SATURATION_MID_DEPTH_THRESHOLD,
};
use crate::constants::time::COMPONENT_BREAK_MS;
use crate::constants::tokens::{MIN_ANALYZABLE_CONTENT_CHARS, MIN_USEFUL_CONTENT_CHARS};
use crate::search::SearchOptions;
use crate::types::Result;
use crate::types::plan::Component;

// =============================================================================
// Request / Report
// =============================================================================

/// Parameters for one deep-research invocation.
#[derive(Debug, Clone)]
pub struct DeepResearchRequest<'a> {
    /// The question to research
    pub query: String,
    /// Sub-queries per depth iteration
    pub breadth: u32,
    /// Refinement rounds
    pub depth: u32,
    /// Main research topic, for query grounding
    pub main_topic: Option<&'a str>,
    /// Component being researched, when inside the full pass
    pub component: Option<&'a Component>,
    /// Current gap map biasing sub-query generation
    pub gaps: GapMap,
    /// Learnings already known (deduplication input for sub-queries)
    pub existing_learnings: Vec<String>,
}

/// What one invocation produced.
#[derive(Debug, Clone, Default)]
pub struct DeepResearchReport {
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    /// Wall-clock time of each executed depth iteration, milliseconds
    pub iteration_times: Vec<u64>,
}

/// One scraped page with a non-empty body
#[derive(Debug, Clone)]
struct PageContent {
    url: Option<String>,
    body: String,
}

// =============================================================================
// Main Loop
// =============================================================================

/// Run the deep-research loop for one question.
pub async fn run_deep_research(
    ctx: &ResearchContext,
    deadline: Deadline,
    request: DeepResearchRequest<'_>,
) -> Result<DeepResearchReport> {
    let mut report = DeepResearchReport::default();
    let mut active_query = request.query.clone();
    let mut iterations_done: u32 = 0;

    for depth_iteration in 0..request.depth {
        if deadline.is_nearly_exhausted(COMPONENT_BREAK_MS) {
            debug!("deep research stopping: budget nearly exhausted");
            break;
        }
        ctx.cancel.check("deep research iteration")?;
        let iteration_start = Instant::now();

        let known: Vec<String> = request
            .existing_learnings
            .iter()
            .chain(report.learnings.iter())
            .cloned()
            .collect();

        let sub_queries = generate_sub_queries(
            ctx.llm.as_ref(),
            &active_query,
            request.breadth as usize,
            &known,
            request.main_topic,
            request.component.map(|c| c.description.as_str()),
            &request.gaps,
        )
        .await;

        let mut pages = Vec::new();
        for sub_query in &sub_queries {
            if deadline.is_nearly_exhausted(COMPONENT_BREAK_MS) {
                break;
            }
            ctx.cancel.check("search")?;
            ctx.sink
                .progress(format!("Searching: {}", sub_query))
                .await;
            pages.extend(search_with_fallback(ctx, sub_query).await?);
        }

        for page in &pages {
            if let Some(url) = &page.url
                && !report.visited_urls.contains(url)
            {
                report.visited_urls.push(url.clone());
            }
        }

        let new_learnings = if pages.is_empty() {
            Vec::new()
        } else {
            summarize_pages(ctx, &active_query, &pages).await
        };
        for learning in &new_learnings {
            if !report.learnings.contains(learning) {
                report.learnings.push(learning.clone());
            }
        }

        let analysis = analyze_findings(ctx.llm.as_ref(), &active_query, &new_learnings, &pages)
            .await;

        report
            .iteration_times
            .push(iteration_start.elapsed().as_millis() as u64);
        iterations_done += 1;

        if !analysis.should_continue {
            debug!("analysis ended deep research early");
            return Ok(report);
        }
        if !analysis.next_search_topic.is_empty() {
            debug!(next = %analysis.next_search_topic, "analysis redirected the query");
            active_query = analysis.next_search_topic;
        }

        // Mid-depth saturation check, only past the first iteration
        if depth_iteration > 0
            && let Some(component) = request.component
        {
            let planned = component.sub_questions.len() as u32 * request.depth.max(1);
            let all_learnings: Vec<String> = request
                .existing_learnings
                .iter()
                .chain(report.learnings.iter())
                .cloned()
                .collect();
            let saturation = evaluate_saturation(
                ctx.llm.as_ref(),
                component,
                &all_learnings,
                iterations_done,
                planned,
            )
            .await;
            if saturation.is_saturated
                || saturation.coverage_percentage >= SATURATION_MID_DEPTH_THRESHOLD
            {
                debug!(
                    coverage = saturation.coverage_percentage,
                    "mid-depth saturation exit"
                );
                break;
            }
        }
    }

    Ok(report)
}

// =============================================================================
// Search + Fallback
// =============================================================================

/// Search one sub-query; when no page carries a useful body, retry once
/// with a simplified query, then give up on this sub-query. Network
/// failures propagate.
async fn search_with_fallback(ctx: &ResearchContext, query: &str) -> Result<Vec<PageContent>> {
    let options = SearchOptions {
        timeout: std::time::Duration::from_secs(ctx.search_timeout_secs),
        limit: ctx.search_result_limit,
    };

    let response = ctx.search.search(query, &options).await?;
    if response.has_useful_content(MIN_USEFUL_CONTENT_CHARS) {
        return Ok(extract_pages(ctx, response));
    }

    let fallback = simplify_query(query, FALLBACK_QUERY_MAX_WORDS);
    if fallback.is_empty() || fallback == query {
        debug!(query, "no useful content and no distinct fallback, skipping");
        return Ok(Vec::new());
    }

    debug!(query, fallback = %fallback, "retrying with simplified query");
    let response = ctx.search.search(&fallback, &options).await?;
    if response.has_useful_content(MIN_USEFUL_CONTENT_CHARS) {
        Ok(extract_pages(ctx, response))
    } else {
        debug!(query, "fallback also empty, skipping sub-query");
        Ok(Vec::new())
    }
}

/// Keep pages with non-empty bodies, capped per page.
fn extract_pages(ctx: &ResearchContext, response: crate::search::SearchResponse) -> Vec<PageContent> {
    response
        .data
        .into_iter()
        .filter_map(|page| {
            let body = page.markdown?;
            if body.trim().is_empty() {
                return None;
            }
            Some(PageContent {
                url: page.url,
                body: trim_content(&body, ctx.content_trim_chars).to_string(),
            })
        })
        .collect()
}

// =============================================================================
// Summarizer
// =============================================================================

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    learnings: Vec<String>,
}

/// Extract at most 5 factual learnings from the scraped pages.
/// LLM failure degrades to no learnings for this iteration.
async fn summarize_pages(
    ctx: &ResearchContext,
    query: &str,
    pages: &[PageContent],
) -> Vec<String> {
    let bundle = pages
        .iter()
        .map(|p| match &p.url {
            Some(url) => format!("## Source: {}\n\n{}", url, p.body),
            None => format!("## Source\n\n{}", p.body),
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    let bundle = trim_to_token_budget(&bundle, ctx.context_window_tokens);

    let prompt = ResearchPrompts::summarize(query, &bundle);
    let schema = ResearchSchemas::summarize();

    match generate_object::<SummaryPayload>(ctx.llm.as_ref(), "summarize", &prompt, &schema).await
    {
        Ok(payload) => payload
            .learnings
            .into_iter()
            .take(MAX_LEARNINGS_PER_SUMMARY)
            .collect(),
        Err(e) => {
            warn!(error = %e, "summarizer failed, no learnings this iteration");
            Vec::new()
        }
    }
}

// =============================================================================
// Analysis & Plan
// =============================================================================

/// Assessment of one iteration's findings.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisOutcome {
    #[serde(default)]
    pub summary: String,
    pub valuable: bool,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(rename = "shouldContinue")]
    pub should_continue: bool,
    #[serde(rename = "nextSearchTopic", default)]
    pub next_search_topic: String,
}

/// Analyze summarized learnings and decide the next direction.
///
/// When there is no content, or every body is trivially short, the
/// decision is made locally without an LLM call: continue, redirected to
/// `"<first 3 words> basics"`. A `valuable = false` verdict forces
/// continuation with a simplified query.
async fn analyze_findings(
    llm: &dyn LlmProvider,
    query: &str,
    learnings: &[String],
    pages: &[PageContent],
) -> AnalysisOutcome {
    let all_trivial = pages
        .iter()
        .all(|p| p.body.len() < MIN_ANALYZABLE_CONTENT_CHARS);
    if pages.is_empty() || all_trivial {
        let basics_topic = format!(
            "{} basics",
            query.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
        );
        return AnalysisOutcome {
            summary: "No useful content found".to_string(),
            valuable: false,
            gaps: vec!["No information gathered yet".to_string()],
            should_continue: true,
            next_search_topic: basics_topic,
        };
    }

    let prompt = ResearchPrompts::analysis(query, learnings);
    let schema = ResearchSchemas::analysis();

    let mut outcome =
        match generate_object::<AnalysisOutcome>(llm, "analysis", &prompt, &schema).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "analysis failed, continuing on current query");
                return AnalysisOutcome {
                    summary: String::new(),
                    valuable: true,
                    gaps: Vec::new(),
                    should_continue: true,
                    next_search_topic: String::new(),
                };
            }
        };

    if !outcome.valuable {
        outcome.should_continue = true;
        outcome.next_search_topic = simplify_query(query, FALLBACK_QUERY_MAX_WORDS);
    }

    outcome
}

// =============================================================================
// Tests
// =============================================================================
