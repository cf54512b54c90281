//! Brave Search API adapter.
//!
//! Unlike the scraped outlets this adapter talks to a hosted search API and
//! can surface articles from many outlets at once. Each hit's hostname is
//! mapped to an outlet label with [`classify::source_label`]; hits from
//! unknown hosts get a label that the trust gate later rejects.
//!
//! The API wants a coarse freshness bucket instead of an exact day count,
//! see [`Freshness`]. Without a subscription token the adapter returns no
//! candidates instead of failing the search.

use super::{SourceAdapter, send_for_text};
use crate::classify;
use crate::dates;
use crate::errors::ScrapeError;
use crate::models::RawCandidate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// Results requested per search.
const BRAVE_RESULT_COUNT: &str = "20";

/// Coarse time window understood by the search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    PastDay,
    PastWeek,
    PastMonth,
    PastYear,
}

impl Freshness {
    /// Smallest bucket that covers `days_back`.
    pub fn from_days_back(days_back: u32) -> Self {
        match days_back {
            0..=1 => Freshness::PastDay,
            2..=7 => Freshness::PastWeek,
            8..=30 => Freshness::PastMonth,
            _ => Freshness::PastYear,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            Freshness::PastDay => "pd",
            Freshness::PastWeek => "pw",
            Freshness::PastMonth => "pm",
            Freshness::PastYear => "py",
        }
    }
}

#[derive(Debug, Deserialize)]
struct BraveSearchResponse {
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    page_age: Option<String>,
    thumbnail: Option<BraveThumbnail>,
    meta_url: Option<BraveMetaUrl>,
}

#[derive(Debug, Deserialize)]
struct BraveThumbnail {
    src: String,
}

#[derive(Debug, Deserialize)]
struct BraveMetaUrl {
    hostname: String,
}

impl BraveResult {
    fn hostname(&self) -> String {
        self.meta_url
            .as_ref()
            .map(|meta| meta.hostname.clone())
            .or_else(|| {
                Url::parse(&self.url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
            })
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Turn a search API response body into raw candidates.
///
/// A body without a `web` section is a valid empty answer.
pub fn parse_results(
    body: &str,
    query: &str,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<RawCandidate>, ScrapeError> {
    let response: BraveSearchResponse = serde_json::from_str(body)?;
    let Some(web) = response.web else {
        info!("No web results in search API response");
        return Ok(Vec::new());
    };

    let candidates = web
        .results
        .into_iter()
        .filter(|hit| !hit.title.trim().is_empty() && !hit.url.trim().is_empty())
        .filter(|hit| dates::may_be_in_window(hit.page_age.as_deref().unwrap_or(""), cutoff, now))
        .map(|hit| RawCandidate {
            source_name: classify::source_label(&hit.hostname()),
            title: hit.title.trim().to_string(),
            excerpt: hit.description.trim().to_string(),
            raw_timestamp: hit.page_age.clone().unwrap_or_default(),
            image_url: hit.thumbnail.as_ref().map(|t| t.src.clone()),
            article_url: hit.url,
            author: None,
            topic: query.to_string(),
        })
        .collect();
    Ok(candidates)
}

/// Adapter for the Brave web search API.
pub struct BraveSearch {
    api_key: Option<String>,
    timeout: Duration,
    endpoint: String,
}

impl BraveSearch {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            api_key,
            timeout,
            endpoint: BRAVE_ENDPOINT.to_string(),
        }
    }

    /// Send searches to `endpoint` instead of the hosted API.
    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for BraveSearch {
    fn name(&self) -> &str {
        "Brave Search"
    }

    #[instrument(level = "info", skip(self, client))]
    async fn fetch(
        &self,
        client: &Client,
        query: &str,
        days_back: u32,
    ) -> Result<Vec<RawCandidate>, ScrapeError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Brave Search API key not configured; skipping search API");
            return Ok(Vec::new());
        };

        let freshness = Freshness::from_days_back(days_back);
        let request = client
            .get(&self.endpoint)
            .header("X-Subscription-Token", api_key)
            .header(ACCEPT, "application/json")
            .query(&[
                ("q", query),
                ("count", BRAVE_RESULT_COUNT),
                ("freshness", freshness.as_param()),
                ("text_decorations", "false"),
                ("search_lang", "en"),
                ("country", "US"),
            ])
            .timeout(self.timeout);
        let body = send_for_text(request).await?;

        let now = Utc::now();
        let candidates = parse_results(&body, query, dates::window_start(days_back, now), now)?;
        info!(
            count = candidates.len(),
            freshness = freshness.as_param(),
            "Fetched search API results"
        );
        Ok(candidates)
    }
}
