//! Utility functions for string handling and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace collapsing for text pulled out of HTML
//! - Excerpt fallbacks for results that carry no summary
//! - String truncation and slugification for logging and file names
//! - JSON error detection for handling LLM response truncation
//! - File system validation for output directories

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Number of title characters used when a result has no excerpt.
pub const EXCERPT_FALLBACK_CHARS: usize = 150;

/// Collapse runs of whitespace into single spaces and trim the ends.
///
/// Text nodes scraped out of markup are full of indentation and newlines;
/// this turns them into a readable single line.
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  a\n\t b  "), "a b");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a stand-in excerpt from a headline.
///
/// # Arguments
///
/// * `title` - The headline to shorten
///
/// # Returns
///
/// The first [`EXCERPT_FALLBACK_CHARS`] characters of `title` followed by
/// `...`, matching what readers of the front end already expect.
pub fn excerpt_from_title(title: &str) -> String {
    let head: String = title.chars().take(EXCERPT_FALLBACK_CHARS).collect();
    format!("{head}...")
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (backing off to the
/// nearest character boundary) with an ellipsis and byte count appended.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of bytes to keep
///
/// # Returns
///
/// The original string if it fits in `max` bytes, otherwise a truncated
/// version with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the LLM response is cut off (e.g., due to token limits), the
/// resulting JSON will fail to parse with an EOF error. This function
/// helps identify such cases for retry logic.
///
/// # Arguments
///
/// * `e` - The serde_json error to classify
///
/// # Returns
///
/// `true` if the error is an EOF (end-of-file) error, indicating truncation.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Convert a query to a file-name-friendly slug.
///
/// Lowercases the text, removes special characters, and replaces
/// spaces with hyphens.
///
/// # Arguments
///
/// * `title` - The query or topic to slugify
///
/// # Returns
///
/// A lowercase, hyphenated, file-name-safe string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("AI Development"), "ai-development");
/// assert_eq!(slugify_title("Test-Article!"), "test-article");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// Capitalize the first character of a string.
///
/// Used for labelling outlets whose hostname is not recognized.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(upcase("hello"), "Hello");
/// assert_eq!(upcase(""), "");
/// ```
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a scratch file.
///
/// # Arguments
///
/// * `path` - The output directory given on the command line
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    match stdfs::File::create(&scratch_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
