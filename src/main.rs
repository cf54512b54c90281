//! # Awful News Search
//!
//! Searches several news outlets at once for a topic and returns one
//! deduplicated, newest-first list of articles from trusted outlets.
//!
//! ## Features
//!
//! - Scrapes the search pages of The Guardian, The Verge, Wired and the New
//!   York Times, and queries the Brave Search API for everything else
//! - Tolerates slow or broken outlets: each one is bounded by a timeout and a
//!   failure only removes that outlet's results
//! - Tags articles with topical labels and drops untrusted outlets
//! - Optionally condenses the results into a dated timeline through an
//!   OpenAI-compatible LLM
//! - Supports optional event publishing via RabbitMQ message bus
//!
//! ## Usage
//!
//! ```sh
//! awful_news_search -j ./json search "AI Development" --days-back 3
//! awful_news_search topic "Space" --limit 10 --offset 10
//! ```
//!
//! ## Architecture
//!
//! 1. **Fan-out**: every source adapter searches its outlet concurrently
//! 2. **Normalize**: dates, excerpts and tags are filled in per article
//! 3. **Finalize**: recency, trust and relevance filters, URL dedupe, sort
//! 4. **Output**: JSON results, query log, optional timeline

use awful_aj::{config as aj_config, config_dir, template};
use chrono::{DateTime, Local};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod api;
mod classify;
mod cli;
mod config;
mod dates;
mod errors;
mod models;
mod outputs;
mod publish;
mod query_log;
mod rank;
mod scrapers;
mod utils;

use aggregator::Aggregator;
use api::{TimelineSummary, summarize_with_backoff};
use cli::{Cli, Command};
use config::AggregatorConfig;
use models::{AggregationRequest, NormalizedArticle, parse_source_list};
use outputs::json;
use query_log::QueryLog;
use rank::Page;
use utils::ensure_writable_dir;

const SERVICE: &str = "awful_news_search";

/// Chat template used for timeline synthesis.
const TIMELINE_TEMPLATE: &str = "news_timeline";

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_search starting up");

    let args = Cli::parse();
    debug!(?args.command, ?args.json_output_dir, "Parsed CLI arguments");

    publish::init(args.amqp_url.as_ref(), &args.message_bus_exchange).await;
    publish_info!(
        SERVICE,
        event_kind = "application.started",
        version = env!("CARGO_PKG_VERSION"),
        "Application starting"
    );

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = args.json_output_dir.as_deref() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            publish_error!(
                SERVICE,
                event_kind = "application.failed",
                reason = "directory_not_writable",
                path = dir,
                "Application failed: output directory not writable"
            );
            return Err(e);
        }
    }

    let config = AggregatorConfig::from(&args);
    debug!(?config, "Aggregator configuration");

    let query_log = Arc::new(QueryLog::new(args.query_log.as_ref().map(PathBuf::from)));
    let aggregator = Aggregator::new(config)?.with_query_log(Arc::clone(&query_log));
    let run_at = Local::now();

    // Dropping the run future on Ctrl-C aborts every in-flight adapter.
    let articles = tokio::select! {
        outcome = run(&aggregator, &args.command, args.json_output_dir.as_deref(), run_at) => {
            match outcome {
                Ok(articles) => articles,
                Err(e) => {
                    error!(error = %e, "Search failed");
                    publish_error!(
                        SERVICE,
                        event_kind = "application.failed",
                        reason = "search_failed",
                        error = e.to_string(),
                        "Application failed: search failed"
                    );
                    query_log.flush().await;
                    return Err(e);
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; abandoning in-flight requests");
            query_log.flush().await;
            return Ok(());
        }
    };

    if args.timeline {
        match synthesize_timeline(args.config.as_deref(), &articles).await {
            Ok(summary) => {
                write_output(
                    &summary,
                    args.json_output_dir.as_deref(),
                    args.command.subject(),
                    Some("timeline"),
                    run_at,
                )
                .await;
            }
            Err(e) => error!(error = %e, "Timeline synthesis failed; results were still written"),
        }
    }

    query_log.flush().await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    publish_info!(
        SERVICE,
        event_kind = "application.completed",
        duration_secs = elapsed.as_secs(),
        duration_millis = elapsed.subsec_millis(),
        article_count = articles.len(),
        "Application completed successfully"
    );

    Ok(())
}

/// Execute the subcommand, write its JSON, and return the articles.
async fn run(
    aggregator: &Aggregator,
    command: &Command,
    json_output_dir: Option<&str>,
    run_at: DateTime<Local>,
) -> Result<Vec<NormalizedArticle>, Box<dyn Error>> {
    match command {
        Command::Search {
            query,
            sources,
            days_back,
        } => {
            let request = AggregationRequest::new(query.as_str())
                .with_days_back(*days_back)
                .with_sources(sources.as_deref().map(parse_source_list).unwrap_or_default());
            let result = aggregator.aggregate(&request).await?;
            info!(query = %result.query, result_count = result.result_count, "Search complete");
            write_output(&result, json_output_dir, query, None, run_at).await;
            Ok(result.articles)
        }
        Command::Topic {
            topic,
            limit,
            offset,
            days_back,
        } => {
            let page = Page {
                limit: *limit,
                offset: *offset,
            };
            let listing = aggregator.list_topic(topic, *days_back, page).await?;
            write_output(&listing, json_output_dir, topic, None, run_at).await;
            Ok(listing.articles)
        }
    }
}

/// Write JSON output, logging and publishing the outcome. Never fails the run.
async fn write_output<T: serde::Serialize>(
    value: &T,
    json_output_dir: Option<&str>,
    subject: &str,
    suffix: Option<&str>,
    run_at: DateTime<Local>,
) {
    publish_info!(SERVICE, event_kind = "output.json.started", "Writing JSON output");
    match json::write_json(value, json_output_dir, subject, suffix, run_at).await {
        Ok(path) => {
            let path = path.map(|p| p.display().to_string()).unwrap_or_else(|| "stdout".to_string());
            publish_info!(
                SERVICE,
                event_kind = "output.json.completed",
                path = path.clone(),
                "JSON output written successfully"
            );
            debug!(%path, "JSON output written");
        }
        Err(e) => {
            error!(error = %e, "Failed to write JSON");
            publish_error!(
                SERVICE,
                event_kind = "output.json.failed",
                "Failed to write JSON output"
            );
        }
    }
}

/// Load the LLM config and template, then summarize `articles`.
async fn synthesize_timeline(
    config_path: Option<&str>,
    articles: &[NormalizedArticle],
) -> Result<TimelineSummary, Box<dyn Error>> {
    let template = template::load_template(TIMELINE_TEMPLATE).await?;
    info!(template = TIMELINE_TEMPLATE, "Loaded template");

    let conf_file = match config_path {
        Some(path) => PathBuf::from(path),
        None => config_dir()?.join("config.yaml"),
    };
    let conf_path = conf_file
        .to_str()
        .ok_or("config path is not valid UTF-8")?;
    let config = aj_config::load_config(conf_path)?;
    info!(config_path = conf_path, "Loaded configuration");

    summarize_with_backoff(&config, &template, articles).await
}
