//! Event publishing, compiled in only with the `publish` feature.
//!
//! With the feature on, [`publish_info!`] and [`publish_error!`] forward to
//! `awful_publish::publish()`, which sends straight to RabbitMQ without going
//! through the tracing subscriber. With it off both macros expand to nothing
//! and [`init`] returns `false`, so call sites need no `#[cfg]`.
//!
//! # Events Published
//!
//! | Event Kind | Description |
//! |------------|-------------|
//! | `application.started` | Application startup with version info |
//! | `application.failed` | Unwritable output directory or failed search |
//! | `application.completed` | Article count and duration |
//! | `search.completed` | One per search: query, result count, timestamp |
//! | `output.json.started` | Beginning JSON write |
//! | `output.json.completed` | JSON written to a file or stdout |
//! | `output.json.failed` | JSON write failed |
//!
//! # Usage
//!
//! ```ignore
//! publish::init(args.amqp_url.as_ref(), &args.message_bus_exchange).await;
//!
//! publish_info!(
//!     "awful_news_search",
//!     event_kind = "search.completed",
//!     result_count = 12,
//!     "Search completed"
//! );
//! ```
//!
//! Enable with `cargo build --features publish`. Requires access to the
//! private `awful_publish` repository.

/// Connect to the AMQP broker and start the background publisher.
///
/// # Arguments
///
/// * `amqp_url` - Broker URL from `--amqp-url`; `None` leaves publishing off
/// * `exchange` - Exchange that receives the events
///
/// # Returns
///
/// `true` when events will be delivered. A failed connection is logged and
/// leaves publishing off.
#[cfg(feature = "publish")]
pub async fn init(amqp_url: Option<&String>, exchange: &str) -> bool {
    use awful_publish::BusConfig;
    use tracing::{info, warn};

    let Some(url) = amqp_url else {
        return false;
    };
    let config = BusConfig::new(url.clone(), exchange.to_string());
    match awful_publish::init_global(config).await {
        Ok(_) => {
            info!(exchange = %exchange, "Message bus initialized");
            true
        }
        Err(e) => {
            warn!(error = %e, "Failed to initialize message bus; continuing without event publishing");
            false
        }
    }
}

/// No-op without the `publish` feature.
#[cfg(not(feature = "publish"))]
pub async fn init(_amqp_url: Option<&String>, _exchange: &str) -> bool {
    false
}

/// Publish an info-level event.
///
/// Tracing-style syntax: `publish_info!(service, key = value, ..., "message")`.
/// Values go through `serde_json::json!`; dotted keys are allowed.
#[cfg(feature = "publish")]
#[macro_export]
macro_rules! publish_info {
    ($service:expr, $($($k:ident).+ = $val:expr),+ , $msg:literal) => {
        awful_publish::publish(
            $service,
            tracing::Level::INFO,
            $msg,
            vec![$(
                (stringify!($($k).+), serde_json::json!($val)),
            )+],
        )
    };
    ($service:expr, $msg:literal) => {
        awful_publish::publish($service, tracing::Level::INFO, $msg, vec![])
    };
}

#[cfg(not(feature = "publish"))]
#[macro_export]
macro_rules! publish_info {
    ($service:expr, $($tt:tt)*) => {};
}

/// Publish an error-level event. Same syntax as [`publish_info!`].
#[cfg(feature = "publish")]
#[macro_export]
macro_rules! publish_error {
    ($service:expr, $($($k:ident).+ = $val:expr),+ , $msg:literal) => {
        awful_publish::publish(
            $service,
            tracing::Level::ERROR,
            $msg,
            vec![$(
                (stringify!($($k).+), serde_json::json!($val)),
            )+],
        )
    };
    ($service:expr, $msg:literal) => {
        awful_publish::publish($service, tracing::Level::ERROR, $msg, vec![])
    };
}

#[cfg(not(feature = "publish"))]
#[macro_export]
macro_rules! publish_error {
    ($service:expr, $($tt:tt)*) => {};
}
