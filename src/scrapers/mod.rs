//! News source adapters.
//!
//! Every outlet is reached through one capability, [`SourceAdapter`]: given
//! a query and a window, return the raw candidates found on that outlet's
//! search page. Adapters may fail however they like; the coordinator wraps
//! each call and turns failures, timeouts and panics into an empty list.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | The Guardian | [`guardian`] | HTML scraping | `<time datetime>` only |
//! | The Verge | [`verge`] | HTML scraping | Byline from `data-testid` |
//! | Wired | [`wired`] | HTML scraping | Text dates on summary cards |
//! | New York Times | [`nytimes`] | HTML scraping | Strips the `By` byline prefix |
//! | Brave Search | [`brave`] | Search API | Requires API key; many outlets |
//!
//! # Common Patterns
//!
//! The four scraped outlets differ only in markup, so each module exports a
//! [`SiteProfile`](html::SiteProfile) and a single [`HtmlSource`](html::HtmlSource)
//! adapter drives all of them. Adapters use:
//! - The shared `reqwest::Client` (one connection pool for every task)
//! - A per-request timeout
//! - [`dates::may_be_in_window`](crate::dates::may_be_in_window) to drop
//!   results that are clearly too old before they enter the pipeline

pub mod brave;
pub mod guardian;
pub mod html;
pub mod nytimes;
pub mod verge;
pub mod wired;

use crate::config::AggregatorConfig;
use crate::errors::ScrapeError;
use crate::models::RawCandidate;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// One news outlet's search, fetched and parsed into raw candidates.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Label used in logs. For single-outlet adapters this is the outlet name.
    fn name(&self) -> &str;

    /// Search the outlet for `query` within the last `days_back` days.
    async fn fetch(
        &self,
        client: &Client,
        query: &str,
        days_back: u32,
    ) -> Result<Vec<RawCandidate>, ScrapeError>;
}

/// The adapters registered by default, in registration order.
///
/// Registration order only matters for tie-breaking: articles with identical
/// timestamps keep the order of the adapters that produced them.
pub fn default_adapters(config: &AggregatorConfig) -> Vec<Arc<dyn SourceAdapter>> {
    let profiles = [
        &guardian::PROFILE,
        &verge::PROFILE,
        &wired::PROFILE,
        &nytimes::PROFILE,
    ];

    let mut adapters: Vec<Arc<dyn SourceAdapter>> = profiles
        .into_iter()
        .map(|profile| {
            Arc::new(html::HtmlSource::new(
                profile,
                config.request_timeout,
                config.max_items_per_source,
            )) as Arc<dyn SourceAdapter>
        })
        .collect();

    adapters.push(Arc::new(brave::BraveSearch::new(
        config.brave_api_key.clone(),
        config.api_timeout,
    )));
    adapters
}

/// GET `url` and return the body, treating non-2xx answers as errors.
#[instrument(level = "debug", skip(client))]
pub(crate) async fn get_text(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<String, ScrapeError> {
    let body = send_for_text(client.get(url).timeout(timeout)).await?;
    debug!(bytes = body.len(), "Fetched search page");
    Ok(body)
}

/// Send `request` and return the body of a 2xx answer.
///
/// # Errors
///
/// [`ScrapeError::Status`] carrying the final URL for any other status;
/// [`ScrapeError::Http`] for transport failures and timeouts.
pub(crate) async fn send_for_text(request: RequestBuilder) -> Result<String, ScrapeError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            status,
            url: response.url().to_string(),
        });
    }
    Ok(response.text().await?)
}


#[cfg(test)]
mod tests {
    use super::test_server::{direct_client, serve_once};
    use super::*;

    #[test]
    fn test_default_registration_order() {
        let adapters = default_adapters(&AggregatorConfig::default());
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec!["The Guardian", "The Verge", "Wired", "New York Times", "Brave Search"]
        );
    }

    #[tokio::test]
    async fn test_get_text_returns_body() {
        let (base, request) = serve_once("200 OK", "<html>results</html>").await;
        let body = get_text(&direct_client(), &format!("{base}/search?q=AI"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, "<html>results</html>");
        assert!(request.await.unwrap().starts_with("GET /search?q=AI HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (base, _request) = serve_once("503 Service Unavailable", "busy").await;
        let url = format!("{base}/search?q=AI");
        let err = get_text(&direct_client(), &url, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ScrapeError::Status { status, url: failed } => {
                assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(failed, url);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
