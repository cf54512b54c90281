//! Command-line interface definitions for Awful News Search.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and message bus settings can also come from environment
//! variables.

use crate::models::DEFAULT_DAYS_BACK;
use clap::{Parser, Subcommand};

/// Command-line arguments for the Awful News Search application.
///
/// # Examples
///
/// ```sh
/// # Search every trusted outlet for the last week
/// awful_news_search search "AI Development"
///
/// # Only two outlets, last three days, written to ./json
/// awful_news_search -j ./json search "climate" --sources "Wired,The Verge" --days-back 3
///
/// # Second page of a topic listing with a synthesized timeline
/// awful_news_search --timeline topic "Space" --limit 10 --offset 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output directory for JSON results (printed to stdout when omitted)
    #[arg(short, long, global = true)]
    pub json_output_dir: Option<String>,

    /// Optional path to the awful_aj config.yaml used for timelines
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Brave Search API subscription token
    #[arg(long, env = "BRAVE_SEARCH_API_KEY", global = true, hide_env_values = true)]
    pub brave_api_key: Option<String>,

    /// Per-request timeout for scraped outlets, in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..), global = true)]
    pub request_timeout_secs: u64,

    /// Append one JSON line per search to this file
    #[arg(long, global = true)]
    pub query_log: Option<String>,

    /// Also synthesize a timeline of the results through the LLM
    #[arg(long, global = true)]
    pub timeline: bool,

    /// AMQP URL for message bus (optional, enables event publishing when `publish` feature is enabled)
    #[arg(long, env = "AMQP_URL", global = true)]
    pub amqp_url: Option<String>,

    /// Message bus exchange name (only used when `publish` feature is enabled)
    #[arg(long, env = "MESSAGE_BUS_EXCHANGE", default_value = "events", global = true)]
    pub message_bus_exchange: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search every outlet for a free-text query
    Search {
        query: String,

        /// Comma-separated outlet allow-list, e.g. "Wired,The Verge"
        #[arg(short, long)]
        sources: Option<String>,

        /// Only keep articles published in the last N days
        #[arg(short, long, default_value_t = DEFAULT_DAYS_BACK, value_parser = clap::value_parser!(u32).range(1..))]
        days_back: u32,
    },
    /// List articles whose topic matches, one page at a time
    Topic {
        topic: String,

        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Only keep articles published in the last N days
        #[arg(short, long, default_value_t = DEFAULT_DAYS_BACK, value_parser = clap::value_parser!(u32).range(1..))]
        days_back: u32,
    },
}

impl Command {
    /// The query or topic, used to name output files.
    pub fn subject(&self) -> &str {
        match self {
            Command::Search { query, .. } => query,
            Command::Topic { topic, .. } => topic,
        }
    }
}
