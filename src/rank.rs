//! Merge, filter and rank normalized articles.
//!
//! [`finalize`] is the last stage of every aggregation. It applies, in order:
//!
//! 1. the recency cutoff (`published_at >= now - days_back`)
//! 2. the trusted-outlet gate
//! 3. the caller's outlet allow-list, when one was given
//! 4. relevance: the free-text query for searches, the topic for listings
//! 5. identical-URL dedupe, first occurrence wins
//! 6. a stable newest-first sort
//!
//! Stories about the same event from different outlets are kept as separate
//! entries; only exact URL repeats are collapsed.

use crate::classify;
use crate::dates;
use crate::models::{AggregationRequest, NormalizedArticle};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::debug;

/// A window into a ranked listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// How relevance is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Free-text search: the query must appear in the title, excerpt, topic
    /// or one of the tags.
    Search,
    /// Topic listing: the query must appear in the article's topic. The
    /// ranked list is then cut to `Page`.
    Topic(Page),
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn matches_query(article: &NormalizedArticle, query_lower: &str) -> bool {
    contains_ci(&article.title, query_lower)
        || contains_ci(&article.excerpt, query_lower)
        || contains_ci(&article.topic, query_lower)
        || article.tags.iter().any(|tag| contains_ci(tag, query_lower))
}

/// Filter, dedupe and order `articles` for `request`.
///
/// `articles` must be in adapter registration order; ties on `published_at`
/// keep that order.
pub fn finalize(
    articles: Vec<NormalizedArticle>,
    request: &AggregationRequest,
    mode: FilterMode,
    now: DateTime<Utc>,
) -> Vec<NormalizedArticle> {
    let cutoff = dates::window_start(request.days_back, now);
    let needle = request.query.trim().to_lowercase();
    let total = articles.len();

    let mut ranked: Vec<NormalizedArticle> = articles
        .into_iter()
        .filter(|a| a.published_at >= cutoff)
        .filter(|a| classify::is_trusted(&a.source))
        .filter(|a| request.sources.is_empty() || request.sources.contains(&a.source))
        .filter(|a| match mode {
            FilterMode::Search => matches_query(a, &needle),
            FilterMode::Topic(_) => contains_ci(&a.topic, &needle),
        })
        .unique_by(|a| a.article_url.clone())
        .collect();

    ranked.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    if let FilterMode::Topic(page) = mode {
        ranked = ranked
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
    }

    debug!(total, kept = ranked.len(), ?mode, "Finalized articles");
    ranked
}
