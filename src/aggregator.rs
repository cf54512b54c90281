//! Aggregation coordinator.
//!
//! The [`Aggregator`] fans one query out to every registered
//! [`SourceAdapter`] at once, waits for all of them to settle, normalizes the
//! merged candidates and hands them to [`rank::finalize`].
//!
//! # Failure isolation
//!
//! Each adapter runs as its own task inside [`settle`], which bounds it with
//! a timeout and maps any error to an empty list. A panicking adapter only
//! loses its own results. The call fails only when every adapter task died.
//!
//! # Cancellation
//!
//! Tasks live in a [`JoinSet`] owned by the call. Dropping the future
//! returned by [`Aggregator::aggregate`] drops the set, which aborts every
//! in-flight request; a partially collected fan-out is never returned.

use crate::classify;
use crate::config::AggregatorConfig;
use crate::dates;
use crate::errors::AggregateError;
use crate::models::{AggregationRequest, AggregationResult, NormalizedArticle, RawCandidate, TopicListing};
use crate::query_log::QueryLog;
use crate::rank::{self, FilterMode, Page};
use crate::scrapers::{self, SourceAdapter};
use crate::utils::excerpt_from_title;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

/// Build a [`NormalizedArticle`] from one raw candidate.
///
/// Missing excerpts are replaced by a shortened title and the content falls
/// back to the title. Unparseable timestamps become `now`.
pub fn normalize(candidate: RawCandidate, now: DateTime<Utc>) -> NormalizedArticle {
    let published_at = dates::normalize_or_now(&candidate.raw_timestamp, now);
    let tags = classify::extract_tags(&format!("{} {}", candidate.title, candidate.excerpt));

    let (excerpt, content) = if candidate.excerpt.is_empty() {
        (excerpt_from_title(&candidate.title), candidate.title.clone())
    } else {
        (candidate.excerpt.clone(), candidate.excerpt)
    };

    NormalizedArticle {
        title: candidate.title,
        excerpt,
        content,
        source: candidate.source_name,
        author: candidate.author,
        published_at,
        image_url: candidate.image_url,
        article_url: candidate.article_url,
        tags,
        topic: candidate.topic,
    }
}

/// Run one adapter to completion, never failing.
///
/// Errors and timeouts are logged and become an empty list.
async fn settle(
    adapter: Arc<dyn SourceAdapter>,
    client: Client,
    query: String,
    days_back: u32,
    budget: Duration,
) -> Vec<RawCandidate> {
    let started = Instant::now();
    match timeout(budget, adapter.fetch(&client, &query, days_back)).await {
        Ok(Ok(candidates)) => {
            info!(
                source = adapter.name(),
                count = candidates.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Source adapter settled"
            );
            candidates
        }
        Ok(Err(e)) => {
            warn!(source = adapter.name(), error = %e, "Source adapter failed; continuing without it");
            Vec::new()
        }
        Err(_) => {
            warn!(source = adapter.name(), ?budget, "Source adapter timed out; continuing without it");
            Vec::new()
        }
    }
}

/// Shared HTTP client settings: browser user agent and the adapter budget.
pub fn client_builder(config: &AggregatorConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.adapter_timeout)
}

/// Fans queries out to the registered source adapters.
pub struct Aggregator {
    client: Client,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    config: AggregatorConfig,
    query_log: Option<Arc<QueryLog>>,
}

impl Aggregator {
    /// Build an aggregator with the default outlets and a shared client.
    pub fn new(config: AggregatorConfig) -> Result<Self, AggregateError> {
        let client = client_builder(&config).build()?;
        let adapters = scrapers::default_adapters(&config);
        Ok(Self::with_adapters(config, client, adapters))
    }

    /// Build an aggregator over an explicit adapter list.
    pub fn with_adapters(
        config: AggregatorConfig,
        client: Client,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> Self {
        Self {
            client,
            adapters,
            config,
            query_log: None,
        }
    }

    /// Record every search in `log`.
    pub fn with_query_log(mut self, log: Arc<QueryLog>) -> Self {
        self.query_log = Some(log);
        self
    }

    /// Search every outlet for `request.query`.
    ///
    /// Returns trusted, in-window, relevant articles newest first. Adapter
    /// failures only shrink the result; an empty result is not an error.
    #[instrument(level = "info", skip_all, fields(query = %request.query, days_back = request.days_back))]
    pub async fn aggregate(
        &self,
        request: &AggregationRequest,
    ) -> Result<AggregationResult, AggregateError> {
        request.validate()?;
        let started = Instant::now();

        let (articles, now) = self.collect_normalized(request).await?;
        let fetched = articles.len();
        let ranked = rank::finalize(articles, request, FilterMode::Search, now);
        let result = AggregationResult::new(ranked, request);

        info!(
            fetched,
            returned = result.result_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation complete"
        );

        if let Some(log) = &self.query_log {
            log.record(&request.query, result.result_count);
        }
        Ok(result)
    }

    /// List one page of articles whose topic matches `topic`.
    #[instrument(level = "info", skip(self))]
    pub async fn list_topic(
        &self,
        topic: &str,
        days_back: u32,
        page: Page,
    ) -> Result<TopicListing, AggregateError> {
        let request = AggregationRequest::new(topic).with_days_back(days_back);
        request.validate()?;

        let (articles, now) = self.collect_normalized(&request).await?;
        let ranked = rank::finalize(articles, &request, FilterMode::Topic(page), now);

        info!(count = ranked.len(), "Topic listing complete");
        Ok(TopicListing {
            count: ranked.len(),
            articles: ranked,
            topic: topic.to_string(),
        })
    }

    /// Fan out, then normalize everything against one clock reading.
    async fn collect_normalized(
        &self,
        request: &AggregationRequest,
    ) -> Result<(Vec<NormalizedArticle>, DateTime<Utc>), AggregateError> {
        let candidates = self.collect(&request.query, request.days_back).await?;
        let now = Utc::now();
        let articles = candidates
            .into_iter()
            .map(|candidate| normalize(candidate, now))
            .collect();
        Ok((articles, now))
    }

    /// Run every adapter concurrently and concatenate their candidates in
    /// registration order.
    async fn collect(
        &self,
        query: &str,
        days_back: u32,
    ) -> Result<Vec<RawCandidate>, AggregateError> {
        let mut tasks = JoinSet::new();
        for (index, adapter) in self.adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let client = self.client.clone();
            let query = query.to_string();
            let budget = self.config.adapter_timeout;
            tasks.spawn(async move { (index, settle(adapter, client, query, days_back, budget).await) });
        }

        let mut settled = Vec::with_capacity(self.adapters.len());
        let mut crashed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(batch) => settled.push(batch),
                Err(e) => {
                    crashed += 1;
                    error!(error = %e, "Source adapter task crashed");
                }
            }
        }

        if crashed > 0 && crashed == self.adapters.len() {
            return Err(AggregateError::AllAdaptersFailed(crashed));
        }

        settled.sort_by_key(|(index, _)| *index);
        Ok(settled.into_iter().flat_map(|(_, batch)| batch).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScrapeError;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, SecondsFormat};
    use crate::scrapers::test_server::serve_once;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Returns a fixed list of candidates.
    struct StaticSource {
        name: &'static str,
        items: Vec<(&'static str, String)>,
        calls: Arc<AtomicUsize>,
    }

    impl StaticSource {
        fn new(name: &'static str, items: Vec<(&'static str, String)>) -> Self {
            Self {
                name,
                items,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(
            &self,
            _client: &Client,
            query: &str,
            _days_back: u32,
        ) -> Result<Vec<RawCandidate>, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .items
                .iter()
                .map(|(title, timestamp)| RawCandidate {
                    title: title.to_string(),
                    excerpt: format!("{query} coverage"),
                    source_name: self.name.to_string(),
                    raw_timestamp: timestamp.clone(),
                    article_url: format!(
                        "https://{}/{}",
                        self.name.replace(' ', "").to_lowercase(),
                        title.replace(' ', "-")
                    ),
                    image_url: None,
                    author: None,
                    topic: query.to_string(),
                })
                .collect())
        }
    }

    /// Always errors.
    struct FailingSource;

    #[async_trait]
    impl SourceAdapter for FailingSource {
        fn name(&self) -> &str {
            "Failing"
        }

        async fn fetch(&self, _: &Client, _: &str, _: u32) -> Result<Vec<RawCandidate>, ScrapeError> {
            Err(ScrapeError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                url: "https://down.example.com".to_string(),
            })
        }
    }

    /// Never answers within any reasonable budget.
    struct HangingSource;

    #[async_trait]
    impl SourceAdapter for HangingSource {
        fn name(&self) -> &str {
            "Hanging"
        }

        async fn fetch(&self, _: &Client, _: &str, _: u32) -> Result<Vec<RawCandidate>, ScrapeError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    /// Sets its flag only if allowed to run to completion.
    struct SlowSource {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SourceAdapter for SlowSource {
        fn name(&self) -> &str {
            "Slow"
        }

        async fn fetch(&self, _: &Client, _: &str, _: u32) -> Result<Vec<RawCandidate>, ScrapeError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    /// Panics inside the task.
    struct PanickingSource;

    #[async_trait]
    impl SourceAdapter for PanickingSource {
        fn name(&self) -> &str {
            "Panicking"
        }

        async fn fetch(&self, _: &Client, _: &str, _: u32) -> Result<Vec<RawCandidate>, ScrapeError> {
            panic!("selector table corrupted");
        }
    }

    fn hours_ago(hours: i64) -> String {
        (Utc::now() - ChronoDuration::hours(hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn test_config() -> AggregatorConfig {
        AggregatorConfig {
            adapter_timeout: Duration::from_millis(200),
            ..AggregatorConfig::default()
        }
    }

    fn aggregator(adapters: Vec<Arc<dyn SourceAdapter>>) -> Aggregator {
        Aggregator::with_adapters(test_config(), Client::new(), adapters)
    }

    fn titles(result: &AggregationResult) -> Vec<&str> {
        result.articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let now = Utc::now();
        let candidate = RawCandidate {
            title: "Bitcoin and blockchain rally".to_string(),
            excerpt: String::new(),
            source_name: "Bloomberg".to_string(),
            raw_timestamp: "malformed-garbage".to_string(),
            article_url: "https://www.bloomberg.com/x".to_string(),
            image_url: None,
            author: Some("Pat".to_string()),
            topic: "crypto".to_string(),
        };
        let article = normalize(candidate, now);

        assert_eq!(article.published_at, now);
        assert_eq!(article.excerpt, "Bitcoin and blockchain rally...");
        assert_eq!(article.content, "Bitcoin and blockchain rally");
        assert_eq!(article.tags, vec!["AI", "Blockchain"]);
        assert_eq!(article.source, "Bloomberg");
        assert_eq!(article.author.as_deref(), Some("Pat"));
    }

    #[test]
    fn test_normalize_keeps_excerpt_as_content() {
        let now = Utc::now();
        let candidate = RawCandidate {
            title: "Title".to_string(),
            excerpt: "Standfirst".to_string(),
            source_name: "Wired".to_string(),
            raw_timestamp: "2 hours ago".to_string(),
            article_url: "https://www.wired.com/x".to_string(),
            image_url: None,
            author: None,
            topic: "AI".to_string(),
        };
        let article = normalize(candidate, now);
        assert_eq!(article.excerpt, "Standfirst");
        assert_eq!(article.content, "Standfirst");
        assert_eq!(article.published_at, now - ChronoDuration::hours(2));
    }

    #[tokio::test]
    async fn test_one_source_times_out() {
        let aggregator = aggregator(vec![
            Arc::new(StaticSource::new("The Guardian", vec![("guardian one", hours_ago(5))])),
            Arc::new(StaticSource::new("The Verge", vec![("verge one", hours_ago(1))])),
            Arc::new(StaticSource::new("Wired", vec![("wired one", hours_ago(3))])),
            Arc::new(HangingSource),
        ]);
        let request = AggregationRequest::new("AI Development");
        let result = aggregator.aggregate(&request).await.unwrap();

        assert_eq!(titles(&result), vec!["verge one", "wired one", "guardian one"]);
        assert_eq!(result.result_count, 3);
        assert_eq!(result.query, "AI Development");
        assert_eq!(result.days_back, 7);
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let healthy = || -> Vec<Arc<dyn SourceAdapter>> {
            vec![
                Arc::new(StaticSource::new("Reuters", vec![("a", hours_ago(2)), ("b", hours_ago(4))])),
                Arc::new(StaticSource::new("BBC", vec![("c", hours_ago(3))])),
            ]
        };
        let baseline = aggregator(healthy())
            .aggregate(&AggregationRequest::new("AI"))
            .await
            .unwrap();

        let mut with_fault = healthy();
        with_fault.insert(1, Arc::new(FailingSource));
        with_fault.push(Arc::new(PanickingSource));
        let faulty = aggregator(with_fault)
            .aggregate(&AggregationRequest::new("AI"))
            .await
            .unwrap();

        assert_eq!(titles(&faulty), titles(&baseline));
        assert_eq!(titles(&faulty), vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_ties_keep_registration_order() {
        let same = hours_ago(1);
        let aggregator = aggregator(vec![
            Arc::new(StaticSource::new("CNN", vec![("cnn", same.clone())])),
            Arc::new(StaticSource::new("BBC", vec![("bbc", same.clone())])),
            Arc::new(StaticSource::new("Reuters", vec![("reuters", same)])),
        ]);
        let result = aggregator.aggregate(&AggregationRequest::new("AI")).await.unwrap();
        assert_eq!(titles(&result), vec!["cnn", "bbc", "reuters"]);
    }

    #[tokio::test]
    async fn test_filters_untrusted_stale_and_unlisted() {
        let aggregator = aggregator(vec![
            Arc::new(StaticSource::new("Wired", vec![("fresh", hours_ago(1)), ("stale", hours_ago(24 * 8))])),
            Arc::new(StaticSource::new("Random Blog", vec![("blog", hours_ago(1))])),
            Arc::new(StaticSource::new("The Verge", vec![("verge", hours_ago(1))])),
        ]);
        let request = AggregationRequest::new("AI").with_sources(vec!["Wired".to_string()]);
        let result = aggregator.aggregate(&request).await.unwrap();

        assert_eq!(titles(&result), vec!["fresh"]);
        assert!(result.articles.iter().all(|a| classify::is_trusted(&a.source)));
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_not_error() {
        let aggregator = aggregator(vec![
            Arc::new(StaticSource::new("Wired", vec![("last month", hours_ago(24 * 30))])),
            Arc::new(StaticSource::new("Random Blog", vec![("blog", hours_ago(1))])),
        ]);
        let request = AggregationRequest::new("volcano");
        let result = aggregator.aggregate(&request).await.unwrap();
        assert!(result.articles.is_empty());
        assert_eq!(result.result_count, 0);
    }

    #[tokio::test]
    async fn test_garbage_timestamp_passes_recency() {
        let aggregator = aggregator(vec![Arc::new(StaticSource::new(
            "Reuters",
            vec![("undated", "malformed-garbage".to_string())],
        ))]);
        let before = Utc::now();
        let result = aggregator
            .aggregate(&AggregationRequest::new("AI").with_days_back(1))
            .await
            .unwrap();
        let after = Utc::now();

        assert_eq!(result.result_count, 1);
        let published = result.articles[0].published_at;
        assert!(published >= before && published <= after);
    }

    #[tokio::test]
    async fn test_invalid_request_fetches_nothing() {
        let source = StaticSource::new("Wired", vec![("x", hours_ago(1))]);
        let calls = Arc::clone(&source.calls);
        let aggregator = aggregator(vec![Arc::new(source)]);

        let err = aggregator.aggregate(&AggregationRequest::new("  ")).await.unwrap_err();
        assert!(matches!(err, AggregateError::EmptyQuery));

        let err = aggregator
            .aggregate(&AggregationRequest::new("AI").with_days_back(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::InvalidDaysBack(0)));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_adapters_crashing_is_an_error() {
        let aggregator = aggregator(vec![Arc::new(PanickingSource), Arc::new(PanickingSource)]);
        let err = aggregator.aggregate(&AggregationRequest::new("AI")).await.unwrap_err();
        assert!(matches!(err, AggregateError::AllAdaptersFailed(2)));
    }

    #[tokio::test]
    async fn test_all_adapters_failing_softly_is_empty() {
        let aggregator = aggregator(vec![Arc::new(FailingSource), Arc::new(HangingSource)]);
        let result = aggregator.aggregate(&AggregationRequest::new("AI")).await.unwrap();
        assert_eq!(result.result_count, 0);
    }

    #[tokio::test]
    async fn test_list_topic_pages() {
        let aggregator = aggregator(vec![Arc::new(StaticSource::new(
            "Wired",
            vec![
                ("one", hours_ago(1)),
                ("two", hours_ago(2)),
                ("three", hours_ago(3)),
            ],
        ))]);
        let listing = aggregator
            .list_topic("Space", 7, Page { limit: 2, offset: 1 })
            .await
            .unwrap();
        assert_eq!(listing.topic, "Space");
        assert_eq!(listing.count, 2);
        let titles: Vec<_> = listing.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_search_is_recorded_in_query_log() {
        let path = std::env::temp_dir().join(format!("ans_aggregator_{}.jsonl", rand::random::<u64>()));
        let log = Arc::new(QueryLog::new(Some(path.clone())));
        let aggregator = aggregator(vec![Arc::new(StaticSource::new(
            "BBC",
            vec![("x", hours_ago(1))],
        ))])
        .with_query_log(Arc::clone(&log));

        aggregator.aggregate(&AggregationRequest::new("AI")).await.unwrap();
        log.flush().await;

        let written = std::fs::read_to_string(&path).unwrap();
        let record: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(record["query"], "AI");
        assert_eq!(record["resultCount"], 1);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_dropping_aggregate_aborts_adapters() {
        let finished = Arc::new(AtomicBool::new(false));
        let config = AggregatorConfig {
            adapter_timeout: Duration::from_secs(5),
            ..AggregatorConfig::default()
        };
        let aggregator = Aggregator::with_adapters(
            config,
            Client::new(),
            vec![Arc::new(SlowSource {
                finished: Arc::clone(&finished),
            })],
        );

        let request = AggregationRequest::new("AI");
        let outcome =
            tokio::time::timeout(Duration::from_millis(50), aggregator.aggregate(&request)).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_shared_client_sends_browser_user_agent() {
        let (base, request) = serve_once("200 OK", "<html></html>").await;
        let config = AggregatorConfig::default();
        let client = client_builder(&config).no_proxy().build().unwrap();

        client.get(format!("{base}/search")).send().await.unwrap();

        let head = request.await.unwrap().to_lowercase();
        assert!(head.contains(&format!(
            "user-agent: {}",
            crate::config::DEFAULT_USER_AGENT.to_lowercase()
        )));
    }
}
