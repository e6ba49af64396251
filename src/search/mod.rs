//! Web Search/Scrape Service
//!
//! The orchestrator treats search as a capability: "return a list of pages
//! with URL and extracted markdown". The [`SearchService`] trait is the
//! seam; [`FirecrawlClient`] is the production implementation. Tests script
//! responses through the same trait.

mod firecrawl;

pub use firecrawl::FirecrawlClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::network;
use crate::types::Result;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Options for one search call
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum pages to return
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(network::SEARCH_TIMEOUT_SECS),
            limit: network::SEARCH_RESULT_LIMIT,
        }
    }
}

/// One scraped page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    /// Page URL, when the provider reports one
    #[serde(default)]
    pub url: Option<String>,
    /// Extracted markdown body, when scraping succeeded
    #[serde(default)]
    pub markdown: Option<String>,
}

impl PageResult {
    /// Markdown body length in characters (0 when absent)
    pub fn content_len(&self) -> usize {
        self.markdown.as_deref().map(str::len).unwrap_or(0)
    }
}

/// Search call response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<PageResult>,
}

impl SearchResponse {
    /// Whether any page carries a body longer than `min_chars`
    pub fn has_useful_content(&self, min_chars: usize) -> bool {
        self.data.iter().any(|p| p.content_len() > min_chars)
    }
}

/// Shared search handle passed through the orchestrator.
pub type SharedSearch = Arc<dyn SearchService>;

// =============================================================================
// Search Service Trait
// =============================================================================

/// Web search/scrape capability.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Search the web and scrape matching pages as markdown
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse>;

    /// Service name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_useful_content() {
        let response = SearchResponse {
            data: vec![
                PageResult {
                    url: Some("http://a".to_string()),
                    markdown: Some("x".repeat(50)),
                },
                PageResult {
                    url: None,
                    markdown: None,
                },
            ],
        };
        assert!(response.has_useful_content(10));
        assert!(!response.has_useful_content(100));
    }

    #[test]
    fn test_deserialize_sparse_payload() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"data": [{"url": "http://a"}, {}]}"#).unwrap();
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].content_len(), 0);
    }
}
