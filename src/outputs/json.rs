//! JSON output for search results, topic listings and timelines.
//!
//! Files are organized by local date and named after the query:
//! ```text
//! json_output_dir/
//! └── 2026-10-17/
//!     ├── ai-development_142501.json
//!     └── ai-development_142501_timeline.json
//! ```

use crate::utils::slugify_title;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the file for `subject` written at `at`.
///
/// `suffix` distinguishes companion files of the same run (`timeline`).
pub fn output_path(
    json_output_dir: &str,
    subject: &str,
    suffix: Option<&str>,
    at: DateTime<Local>,
) -> PathBuf {
    let slug = match slugify_title(subject.trim()) {
        slug if slug.is_empty() => "results".to_string(),
        slug => slug,
    };
    let stem = format!("{slug}_{}", at.format("%H%M%S"));
    let file_name = match suffix {
        Some(suffix) => format!("{stem}_{suffix}.json"),
        None => format!("{stem}.json"),
    };
    PathBuf::from(json_output_dir)
        .join(at.date_naive().to_string())
        .join(file_name)
}

/// Serialize `value` to `{json_output_dir}/{date}/{slug}_{HHMMSS}[_{suffix}].json`,
/// or pretty-print it to stdout when no directory is given.
///
/// Returns the written path, if any.
#[instrument(level = "info", skip(value))]
pub async fn write_json<T: Serialize>(
    value: &T,
    json_output_dir: Option<&str>,
    subject: &str,
    suffix: Option<&str>,
    at: DateTime<Local>,
) -> Result<Option<PathBuf>, Box<dyn Error>> {
    let Some(dir) = json_output_dir else {
        println!("{}", serde_json::to_string_pretty(value)?);
        return Ok(None);
    };

    let json = serde_json::to_string(value)?;
    let path = output_path(dir, subject, suffix, at);

    if let Some(parent) = path.parent() {
        info!(dir = %parent.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON file");
    Ok(Some(path))
}
