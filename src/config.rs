//! Runtime configuration for the aggregation pipeline.
//!
//! Everything an adapter needs from the outside world (credentials, client
//! identity, timeouts) lives in [`AggregatorConfig`]. The value is built
//! once from the CLI and handed to
//! [`Aggregator::new`](crate::aggregator::Aggregator::new); adapters never
//! read environment variables themselves.

use crate::cli::Cli;
use std::time::Duration;

/// Browser identity sent with every request. Several outlets serve empty
/// search pages to obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Per-request timeout for scraped search pages.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-request timeout for the hosted search API.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(15);

/// Result items read from each scraped search page.
pub const DEFAULT_MAX_ITEMS_PER_SOURCE: usize = 10;

#[derive(Clone)]
pub struct AggregatorConfig {
    pub user_agent: String,
    /// Timeout applied to each scraped page request.
    pub request_timeout: Duration,
    /// Timeout applied to each search API request.
    pub api_timeout: Duration,
    /// Upper bound on one adapter's whole fetch, enforced by the coordinator.
    pub adapter_timeout: Duration,
    pub max_items_per_source: usize,
    /// Brave Search subscription token. Without it the API adapter is inert.
    pub brave_api_key: Option<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            api_timeout: DEFAULT_API_TIMEOUT,
            adapter_timeout: DEFAULT_API_TIMEOUT,
            max_items_per_source: DEFAULT_MAX_ITEMS_PER_SOURCE,
            brave_api_key: None,
        }
    }
}

// Hand-written so the API key never lands in logs.
impl std::fmt::Debug for AggregatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatorConfig")
            .field("user_agent", &self.user_agent)
            .field("request_timeout", &self.request_timeout)
            .field("api_timeout", &self.api_timeout)
            .field("adapter_timeout", &self.adapter_timeout)
            .field("max_items_per_source", &self.max_items_per_source)
            .field("brave_api_key", &self.brave_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl From<&Cli> for AggregatorConfig {
    fn from(cli: &Cli) -> Self {
        let request_timeout = Duration::from_secs(cli.request_timeout_secs);
        let defaults = Self::default();
        Self {
            request_timeout,
            // The adapter budget must cover the slowest request it can make.
            adapter_timeout: request_timeout.max(defaults.api_timeout),
            brave_api_key: cli
                .brave_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            ..defaults
        }
    }
}
