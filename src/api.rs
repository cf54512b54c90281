//! Timeline synthesis through an OpenAI-compatible LLM.
//!
//! Aggregated articles can be condensed into a dated timeline. The articles
//! are serialized as a compact JSON list, sent through `awful_aj` with a chat
//! template, and the reply is parsed as a [`TimelineSummary`]. The reply is
//! trusted as-is once it deserializes.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`AskFnWrapper`]: wraps the `awful_aj` library's `ask` function
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync` implementation
//! - [`summarize_timeline`]: prompt, ask, parse, and re-ask once on truncation
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use crate::models::NormalizedArticle;
use crate::utils::{looks_truncated, truncate_for_log};
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use chrono::{DateTime, Utc};
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Instructions placed ahead of the article list in every request.
const TIMELINE_INSTRUCTIONS: &str = "Summarize the news articles below into a timeline. \
Use one entry per publication day (the `publishedAt` date); merge days into a week only when \
several consecutive days have no articles. For each entry give the dominant story as `mainTitle`, \
a short `description` that quotes key statements with their source and mentions minor stories, \
an optional `coverImage` taken from one of the articles, and the `sources` used as {name, url} pairs. \
Reply with JSON only, shaped as {\"entries\": [{\"date\", \"mainTitle\", \"description\", \
\"coverImage\", \"sources\"}]}.\n\nArticles:\n";

/// Article fields handed to the model.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineInput<'a> {
    pub title: &'a str,
    pub excerpt: &'a str,
    pub source: &'a str,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<&'a str>,
    pub article_url: &'a str,
}

impl<'a> From<&'a NormalizedArticle> for TimelineInput<'a> {
    fn from(article: &'a NormalizedArticle) -> Self {
        Self {
            title: &article.title,
            excerpt: &article.excerpt,
            source: &article.source,
            published_at: article.published_at,
            image_url: article.image_url.as_deref(),
            article_url: &article.article_url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimelineSummary {
    #[serde(default)]
    pub entries: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub date: String,
    pub main_title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub sources: Vec<TimelineSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineSource {
    pub name: String,
    pub url: String,
}

/// Build the user message for `articles`.
///
/// # Arguments
///
/// * `articles` - Finalized search results, newest first
///
/// # Returns
///
/// The fixed instructions followed by a JSON array of [`TimelineInput`]s.
pub fn timeline_prompt(articles: &[NormalizedArticle]) -> Result<String, serde_json::Error> {
    let inputs: Vec<TimelineInput<'_>> = articles.iter().map(TimelineInput::from).collect();
    Ok(format!("{TIMELINE_INSTRUCTIONS}{}", serde_json::to_string(&inputs)?))
}

/// Trait for async LLM interaction.
///
/// Implementors send text to an LLM and return its reply. Decorators such
/// as [`RetryAsk`] implement it too.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The LLM client to wrap
    /// * `max_retries` - Maximum number of retry attempts (not counting the initial attempt)
    /// * `base_delay` - Initial delay between retries (doubles each attempt)
    ///
    /// The maximum delay is capped at 30 seconds.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = AskFnWrapper { config, template };
    /// let retry_client = RetryAsk::new(client, 5, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let delay = self
                        .base_delay
                        .saturating_mul(1 << shift)
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Wrapper around `awful_aj::api::ask` that implements [`AskAsync`].
#[derive(Debug)]
pub struct AskFnWrapper<'a> {
    /// LLM configuration (API keys, endpoints, model settings).
    pub config: &'a AwfulJadeConfig,
    /// Chat template defining the conversation structure.
    pub template: &'a ChatTemplate,
}

impl<'a> AskAsync for AskFnWrapper<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        let dt = t0.elapsed();

        if let Err(e) = &res {
            warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed");
        }
        res
    }
}

/// Condense `articles` into a [`TimelineSummary`] using `asker`.
///
/// An empty article list yields an empty summary without calling the model.
/// A reply that ends mid-JSON is asked for once more; any other malformed
/// reply is an error.
///
/// # Arguments
///
/// * `asker` - The LLM client, usually a [`RetryAsk`]
/// * `articles` - Finalized search results to condense
///
/// # Returns
///
/// The parsed [`TimelineSummary`], or the transport or JSON error.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn summarize_timeline<A>(
    asker: &A,
    articles: &[NormalizedArticle],
) -> Result<TimelineSummary, Box<dyn Error>>
where
    A: AskAsync<Response = String>,
{
    if articles.is_empty() {
        info!("No articles to summarize");
        return Ok(TimelineSummary::default());
    }

    let prompt = timeline_prompt(articles)?;
    let reply = asker.ask(&prompt).await?;

    let summary = match serde_json::from_str::<TimelineSummary>(&reply) {
        Ok(summary) => summary,
        Err(e) if looks_truncated(&e) => {
            warn!(error = %e, "EOF while parsing timeline; re-asking once");
            let second = asker.ask(&prompt).await?;
            serde_json::from_str::<TimelineSummary>(&second).inspect_err(|e| {
                warn!(
                    error = %e,
                    response_preview = %truncate_for_log(&second, 300),
                    "Model returned non-conforming timeline JSON"
                )
            })?
        }
        Err(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&reply, 300),
                "Model returned non-conforming timeline JSON"
            );
            return Err(e.into());
        }
    };

    info!(entries = summary.entries.len(), "Timeline synthesized");
    Ok(summary)
}

/// Summarize `articles` through `awful_aj` with retry and backoff.
///
/// Up to 5 retries, backing off 1s, 2s, 4s, 8s, 16s (capped at 30s) plus jitter.
///
/// # Arguments
///
/// * `config` - LLM configuration loaded from `config.yaml`
/// * `template` - The `news_timeline` chat template
/// * `articles` - Finalized search results to condense
///
/// # Returns
///
/// The [`TimelineSummary`] once a conforming reply arrives, or the last error.
#[instrument(level = "info", skip_all)]
pub async fn summarize_with_backoff(
    config: &AwfulJadeConfig,
    template: &ChatTemplate,
    articles: &[NormalizedArticle],
) -> Result<TimelineSummary, Box<dyn Error>> {
    let t0 = Instant::now();
    let client = AskFnWrapper { config, template };
    let api = RetryAsk::new(client, 5, StdDuration::from_secs(1));
    let res = summarize_timeline(&api, articles).await;
    let dt = t0.elapsed();

    match &res {
        Ok(_) => info!(
            elapsed_ms_total = dt.as_millis() as u64,
            "summarize_with_backoff succeeded"
        ),
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis() as u64, error = %e, "summarize_with_backoff failed")
        }
    }
    res
}
