//! Error types for the scraping adapters and the aggregation pipeline.
//!
//! Two layers of failure:
//!
//! - [`ScrapeError`]: anything that goes wrong inside one source adapter.
//!   These never leave the coordinator; they are logged and turned into an
//!   empty candidate list.
//! - [`AggregateError`]: the only failures a caller of
//!   [`Aggregator::aggregate`](crate::aggregator::Aggregator::aggregate) can see.

use thiserror::Error;

/// Failure inside a single source adapter.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport failure, including the per-request timeout.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("{url} answered with status {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// A CSS selector in a site profile did not compile.
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    /// The source's JSON body did not match the expected shape.
    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Failure of a whole aggregation call.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The query was empty or whitespace only.
    #[error("query must not be empty")]
    EmptyQuery,

    /// `days_back` must be at least one day.
    #[error("days_back must be positive, got {0}")]
    InvalidDaysBack(u32),

    /// The shared HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    /// Every registered adapter task died instead of settling.
    #[error("all {0} source adapters failed to settle")]
    AllAdaptersFailed(usize),
}
