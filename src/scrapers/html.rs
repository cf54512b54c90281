//! Shared machinery for outlets whose search results are scraped from HTML.
//!
//! A [`SiteProfile`] names the selectors for one outlet's result list;
//! [`extract_candidates`] walks a search page with those selectors and
//! [`HtmlSource`] ties both to the [`SourceAdapter`] capability.

use super::{SourceAdapter, get_text};
use crate::dates;
use crate::errors::ScrapeError;
use crate::models::RawCandidate;
use crate::utils::collapse_whitespace;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

static BYLINE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^by\s+").expect("byline pattern is valid"));

/// Static description of one outlet's search page.
#[derive(Debug)]
pub struct SiteProfile {
    /// Outlet label attached to every candidate.
    pub source_name: &'static str,
    /// Origin used to resolve relative links.
    pub origin: &'static str,
    /// Search URL; `{query}` is replaced by the percent-encoded query.
    pub search_url: &'static str,
    /// One element per search result.
    pub item: &'static str,
    /// Link element inside a result; its text is the title, `href` the URL.
    pub title: &'static str,
    pub excerpt: &'static str,
    pub time: &'static str,
    /// Use the time element's text when it has no `datetime` attribute.
    pub time_text_fallback: bool,
    pub author: Option<&'static str>,
    /// Remove a leading `By ` from the byline.
    pub strip_byline_prefix: bool,
}

impl SiteProfile {
    pub fn search_url_for(&self, query: &str) -> String {
        self.search_url
            .replace("{query}", &urlencoding::encode(query))
    }
}

fn compile(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Pull raw candidates out of one search page.
///
/// Reads at most `max_items` result elements. Results without a title or a
/// resolvable link are skipped, as are results whose timestamp parses to an
/// instant before `cutoff`.
pub fn extract_candidates(
    body: &str,
    profile: &SiteProfile,
    query: &str,
    max_items: usize,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<RawCandidate>, ScrapeError> {
    let origin = Url::parse(profile.origin)?;
    let item_selector = compile(profile.item)?;
    let title_selector = compile(profile.title)?;
    let excerpt_selector = compile(profile.excerpt)?;
    let time_selector = compile(profile.time)?;
    let author_selector = profile.author.map(compile).transpose()?;
    let image_selector = compile("img")?;

    let document = Html::parse_document(body);
    let mut candidates = Vec::new();

    for item in document.select(&item_selector).take(max_items) {
        let Some(title_element) = item.select(&title_selector).next() else {
            continue;
        };
        let title = element_text(title_element);
        let href = title_element.value().attr("href").unwrap_or_default().trim();
        if title.is_empty() || href.is_empty() {
            continue;
        }
        let Ok(article_url) = origin.join(href) else {
            debug!(%href, source = profile.source_name, "Unresolvable result link");
            continue;
        };

        let excerpt = item
            .select(&excerpt_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();

        let raw_timestamp = item
            .select(&time_selector)
            .next()
            .and_then(|el| {
                el.value()
                    .attr("datetime")
                    .map(|dt| dt.trim().to_string())
                    .filter(|dt| !dt.is_empty())
                    .or_else(|| profile.time_text_fallback.then(|| element_text(el)))
            })
            .unwrap_or_default();

        if !dates::may_be_in_window(&raw_timestamp, cutoff, now) {
            debug!(%raw_timestamp, %title, "Dropping result outside window");
            continue;
        }

        let author = author_selector
            .as_ref()
            .and_then(|selector| item.select(selector).next())
            .map(element_text)
            .map(|byline| {
                if profile.strip_byline_prefix {
                    BYLINE_PREFIX.replace(&byline, "").into_owned()
                } else {
                    byline
                }
            })
            .filter(|byline| !byline.is_empty());

        let image_url = item
            .select(&image_selector)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| origin.join(src.trim()).ok())
            .map(String::from);

        candidates.push(RawCandidate {
            title,
            excerpt,
            source_name: profile.source_name.to_string(),
            raw_timestamp,
            article_url: article_url.to_string(),
            image_url,
            author,
            topic: query.to_string(),
        });
    }

    Ok(candidates)
}

/// [`SourceAdapter`] for an outlet described by a [`SiteProfile`].
#[derive(Debug)]
pub struct HtmlSource {
    profile: &'static SiteProfile,
    timeout: Duration,
    max_items: usize,
}

impl HtmlSource {
    pub fn new(profile: &'static SiteProfile, timeout: Duration, max_items: usize) -> Self {
        Self {
            profile,
            timeout,
            max_items,
        }
    }
}

#[async_trait]
impl SourceAdapter for HtmlSource {
    fn name(&self) -> &str {
        self.profile.source_name
    }

    #[instrument(level = "info", skip(self, client), fields(source = self.profile.source_name))]
    async fn fetch(
        &self,
        client: &Client,
        query: &str,
        days_back: u32,
    ) -> Result<Vec<RawCandidate>, ScrapeError> {
        let url = self.profile.search_url_for(query);
        let body = get_text(client, &url, self.timeout).await?;

        let now = Utc::now();
        let cutoff = dates::window_start(days_back, now);
        let candidates =
            extract_candidates(&body, self.profile, query, self.max_items, cutoff, now)?;

        info!(count = candidates.len(), %url, "Scraped search results");
        Ok(candidates)
    }
}
