//! Firecrawl Search Client
//!
//! HTTP client for the Firecrawl search API: one POST per query, scrape
//! format pinned to markdown. Timeouts are enforced per request; retries
//! are the provider's concern, not ours.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use super::{SearchOptions, SearchResponse, SearchService};
use crate::config::SearchConfig;
use crate::types::{FathomError, Result};

const DEFAULT_API_BASE: &str = "https://api.firecrawl.dev/v1";

/// Firecrawl-backed search service
pub struct FirecrawlClient {
    api_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for FirecrawlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlClient")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl FirecrawlClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("FIRECRAWL_API_KEY").ok())
            .ok_or_else(|| {
                FathomError::Config(
                    "Search API key not found. Set FIRECRAWL_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FathomError::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            client,
        })
    }
}

#[async_trait::async_trait]
impl SearchService for FirecrawlClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        debug!(query, limit = options.limit, "Searching");

        let url = format!("{}/search", self.api_base);
        let body = json!({
            "query": query,
            "limit": options.limit,
            "timeout": options.timeout.as_millis() as u64,
            "scrapeOptions": { "formats": ["markdown"] },
        });

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FathomError::timeout("search request", options.timeout)
                } else {
                    FathomError::Search(format!("search request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FathomError::Search(format!(
                "search API error ({}): {}",
                status, body
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| FathomError::Search(format!("failed to parse search response: {}", e)))?;

        debug!(pages = parsed.data.len(), "Search returned");
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}
