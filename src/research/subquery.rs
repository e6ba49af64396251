//! Sub-Query Generator
//!
//! Produces the short web queries issued inside a depth iteration. Queries
//! are biased toward success criteria whose gap entries carry real
//! information (non-neutral), and are post-processed so the output
//! invariant holds regardless of what the LLM returns: at most `count`
//! queries, each 2-5 plain words, no quotes, no operators except
//! `site:reddit.com` / `site:quora.com`.

use serde::Deserialize;
use tracing::{debug, warn};

use super::saturation::{GapMap, is_neutral_gap};
use super::schemas::{ResearchPrompts, ResearchSchemas};
use crate::ai::generate_object;
use crate::ai::provider::LlmProvider;
use crate::constants::research::{FALLBACK_QUERY_MAX_WORDS, SUBQUERY_LEARNINGS_WINDOW};

const ALLOWED_SITE_OPERATORS: [&str; 2] = ["site:reddit.com", "site:quora.com"];
const MAX_QUERY_WORDS: usize = 5;
const MIN_QUERY_WORDS: usize = 2;

#[derive(Debug, Deserialize)]
struct SubQueryPayload {
    queries: Vec<GeneratedQuery>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuery {
    query: String,
    #[serde(default)]
    reasoning: String,
}

/// Generate up to `count` search queries for the current research step.
///
/// On LLM failure, falls back to a single simplified form of the current
/// query so the caller always has something to search.
pub async fn generate_sub_queries(
    llm: &dyn LlmProvider,
    query: &str,
    count: usize,
    learnings: &[String],
    main_topic: Option<&str>,
    component_context: Option<&str>,
    gaps: &GapMap,
) -> Vec<String> {
    let recent_learnings: Vec<String> = learnings
        .iter()
        .rev()
        .take(SUBQUERY_LEARNINGS_WINDOW)
        .rev()
        .cloned()
        .collect();

    // Only gaps carrying real targeting information reach the prompt
    let gap_lines: Vec<String> = gaps
        .iter()
        .filter(|(_, description)| !is_neutral_gap(description))
        .map(|(criterion, description)| {
            if criterion == description {
                description.clone()
            } else {
                format!("{}: {}", criterion, description)
            }
        })
        .collect();

    let prompt = ResearchPrompts::sub_queries(
        query,
        count,
        &recent_learnings,
        main_topic,
        component_context,
        &gap_lines,
    );
    let schema = ResearchSchemas::sub_queries();

    let payload = match generate_object::<SubQueryPayload>(llm, "sub_queries", &prompt, &schema)
        .await
    {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "sub-query generation failed, using simplified query");
            return vec![simplify_query(query, FALLBACK_QUERY_MAX_WORDS)];
        }
    };

    let queries: Vec<String> = payload
        .queries
        .into_iter()
        .take(count)
        .map(|generated| {
            debug!(query = %generated.query, reasoning = %generated.reasoning, "sub-query");
            sanitize_query(&generated.query)
                .unwrap_or_else(|| simplify_query(query, FALLBACK_QUERY_MAX_WORDS))
        })
        .collect();

    if queries.is_empty() {
        vec![simplify_query(query, FALLBACK_QUERY_MAX_WORDS)]
    } else {
        queries
    }
}

/// Enforce the query shape: strip quotes and operators, clamp to 5 words.
/// Returns `None` when fewer than 2 words survive.
pub fn sanitize_query(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}'))
        .collect();

    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter_map(|word| {
            let word = word.trim_start_matches(['+', '-']);
            if word.is_empty() {
                return None;
            }
            // Boolean operator keywords carry no search content
            if matches!(word, "AND" | "OR" | "NOT") {
                return None;
            }
            if word.contains(':') {
                let lower = word.to_lowercase();
                if ALLOWED_SITE_OPERATORS.contains(&lower.as_str()) {
                    return Some(word);
                }
                return None;
            }
            Some(word)
        })
        .take(MAX_QUERY_WORDS)
        .collect();

    if words.len() < MIN_QUERY_WORDS {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Simplify a query that returned nothing useful: strip site/quote
/// operators and truncate to the first `max_words` words.
pub fn simplify_query(query: &str, max_words: usize) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}'))
        .collect::<String>()
        .split_whitespace()
        .filter(|word| !word.contains(':'))
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
