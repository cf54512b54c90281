//! Data models for the aggregation pipeline.
//!
//! This module defines the records that flow through one search:
//! - [`RawCandidate`]: what a source adapter pulled out of a search page
//! - [`NormalizedArticle`]: the canonical, cross-source comparable article
//! - [`AggregationRequest`] / [`AggregationResult`]: the search boundary
//! - [`TopicListing`]: the topic-listing boundary
//!
//! Serialized records use camelCase keys because the JSON is consumed by a
//! browser front end that expects `publishedAt`, `articleUrl` and friends.

use crate::errors::AggregateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default search window in days.
pub const DEFAULT_DAYS_BACK: u32 = 7;

/// One article mention as extracted by a single source adapter.
///
/// Only `title` and `article_url` are guaranteed to be non-empty; adapters
/// drop anything missing either of them. Everything else is best-effort.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    /// Headline text.
    pub title: String,
    /// Standfirst or summary text, possibly empty.
    pub excerpt: String,
    /// Outlet label, e.g. `"The Guardian"`.
    pub source_name: String,
    /// Timestamp token exactly as the source rendered it, possibly empty.
    pub raw_timestamp: String,
    /// Absolute link to the article.
    pub article_url: String,
    /// Thumbnail link, if the result had one.
    pub image_url: Option<String>,
    /// Byline, if the result had one.
    pub author: Option<String>,
    /// The search term that produced this candidate.
    pub topic: String,
}

/// A validated article ready to be filtered, ranked and returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedArticle {
    pub title: String,
    pub excerpt: String,
    /// Best available body text. Scraped search pages only expose the
    /// excerpt, so this is the excerpt or, failing that, the title.
    pub content: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<String>,
    /// Always concrete. Unparseable timestamps become "now" at
    /// normalization time.
    pub published_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
    pub article_url: String,
    /// At most four topical labels in vocabulary order.
    pub tags: Vec<String>,
    pub topic: String,
}

/// Parameters of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    pub query: String,
    pub days_back: u32,
    /// Outlet allow-list. Empty means every trusted outlet.
    pub sources: Vec<String>,
}

impl AggregationRequest {
    /// A request for `query` over the default seven day window.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            days_back: DEFAULT_DAYS_BACK,
            sources: Vec::new(),
        }
    }

    pub fn with_days_back(mut self, days_back: u32) -> Self {
        self.days_back = days_back;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Reject requests that must not trigger any fetch.
    pub fn validate(&self) -> Result<(), AggregateError> {
        if self.query.trim().is_empty() {
            return Err(AggregateError::EmptyQuery);
        }
        if self.days_back == 0 {
            return Err(AggregateError::InvalidDaysBack(self.days_back));
        }
        Ok(())
    }
}

/// Split a comma-separated outlet list, trimming blanks.
///
/// ```ignore
/// assert_eq!(parse_source_list("Wired, The Verge,,"), vec!["Wired", "The Verge"]);
/// ```
pub fn parse_source_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The answer to one search, newest article first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub articles: Vec<NormalizedArticle>,
    pub query: String,
    pub result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sources: Option<Vec<String>>,
    pub days_back: u32,
}

impl AggregationResult {
    /// Wrap ranked articles and echo the request that produced them.
    pub fn new(articles: Vec<NormalizedArticle>, request: &AggregationRequest) -> Self {
        Self {
            result_count: articles.len(),
            articles,
            query: request.query.clone(),
            sources: if request.sources.is_empty() {
                None
            } else {
                Some(request.sources.clone())
            },
            days_back: request.days_back,
        }
    }
}

/// One page of articles listed by topic rather than by free-text query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicListing {
    pub articles: Vec<NormalizedArticle>,
    pub topic: String,
    pub count: usize,
}
