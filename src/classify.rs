//! Topical tagging and outlet trust.
//!
//! Both halves are pure functions over text. Tagging is a recall-oriented
//! keyword scan, not topic modeling: short keywords such as `AI` match inside
//! longer words and that is accepted. Trust is decided by outlet identity
//! alone; an untrusted outlet is dropped no matter how relevant the story.

use crate::utils::upcase;

/// Maximum number of tags attached to one article.
pub const MAX_TAGS: usize = 4;

/// Tag vocabulary in scan order. The first [`MAX_TAGS`] hits win.
pub const TAG_VOCABULARY: &[&str] = &[
    "AI",
    "Technology",
    "Politics",
    "Climate",
    "Business",
    "Science",
    "Health",
    "Sports",
    "Entertainment",
    "World",
    "Space",
    "Innovation",
    "Security",
    "Economy",
    "Energy",
    "Environment",
    "Social Media",
    "Cryptocurrency",
    "Artificial Intelligence",
    "Machine Learning",
    "Blockchain",
    "Startup",
];

/// Outlets allowed to appear in results.
pub const TRUSTED_SOURCES: &[&str] = &[
    "The Guardian",
    "New York Times",
    "The Verge",
    "Wired",
    "TechCrunch",
    "Reuters",
    "BBC",
    "CNN",
    "Washington Post",
    "Bloomberg",
    "Wall Street Journal",
    "Engadget",
    "Ars Technica",
];

/// Hostname fragments and the outlet label they map to, checked in order.
const HOST_LABELS: &[(&[&str], &str)] = &[
    (&["theguardian"], "The Guardian"),
    (&["nytimes"], "New York Times"),
    (&["theverge"], "The Verge"),
    (&["wired"], "Wired"),
    (&["techcrunch"], "TechCrunch"),
    (&["reuters"], "Reuters"),
    (&["bbc"], "BBC"),
    (&["cnn"], "CNN"),
    (&["washingtonpost"], "Washington Post"),
    (&["bloomberg"], "Bloomberg"),
    (&["wsj", "wallstreetjournal"], "Wall Street Journal"),
    (&["engadget"], "Engadget"),
    (&["arstechnica"], "Ars Technica"),
];

/// Tags whose keyword occurs anywhere in `text`, case-insensitively.
///
/// ```ignore
/// assert_eq!(extract_tags("Climate startups get funding"), vec!["Climate", "Startup"]);
/// ```
pub fn extract_tags(text: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    TAG_VOCABULARY
        .iter()
        .filter(|tag| haystack.contains(&tag.to_lowercase()))
        .take(MAX_TAGS)
        .map(|tag| tag.to_string())
        .collect()
}

/// Whether `source` is on the trusted outlet list. Exact match.
pub fn is_trusted(source: &str) -> bool {
    TRUSTED_SOURCES.contains(&source)
}

/// Map a hostname to its outlet label.
///
/// Unknown hosts fall back to the hostname with its first letter upper-cased
/// and the dots removed, so `example.org` becomes `Exampleorg`. Such labels
/// are never on the trusted list.
pub fn source_label(hostname: &str) -> String {
    let lower = hostname.to_lowercase();
    HOST_LABELS
        .iter()
        .find(|(fragments, _)| fragments.iter().any(|f| lower.contains(f)))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| upcase(&hostname.replace('.', "")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_follow_vocabulary_order() {
        let tags = extract_tags("Startup uses machine learning for climate and health");
        assert_eq!(tags, vec!["Climate", "Health", "Machine Learning", "Startup"]);
    }

    #[test]
    fn test_tags_are_capped_at_four() {
        let tags = extract_tags("AI technology politics climate business science health");
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags, vec!["AI", "Technology", "Politics", "Climate"]);
    }

    #[test]
    fn test_tags_are_case_insensitive() {
        assert_eq!(extract_tags("CRYPTOCURRENCY news"), vec!["Cryptocurrency"]);
    }

    #[test]
    fn test_tags_match_substrings() {
        // "ai" inside "said" still counts.
        assert_eq!(extract_tags("officials said nothing"), vec!["AI"]);
    }

    #[test]
    fn test_tags_are_stable() {
        let text = "Space economy and energy security";
        let first = extract_tags(text);
        assert_eq!(first, extract_tags(text));
        assert_eq!(first, vec!["Space", "Security", "Economy", "Energy"]);
    }

    #[test]
    fn test_no_tags() {
        assert!(extract_tags("").is_empty());
        assert!(extract_tags("quiet news day").is_empty());
    }

    #[test]
    fn test_trusted_sources() {
        assert!(is_trusted("The Guardian"));
        assert!(is_trusted("Ars Technica"));
        assert!(!is_trusted("the guardian"));
        assert!(!is_trusted("Medium"));
        assert!(!is_trusted(""));
    }

    #[test]
    fn test_source_label_known_hosts() {
        assert_eq!(source_label("www.theguardian.com"), "The Guardian");
        assert_eq!(source_label("WWW.NYTIMES.COM"), "New York Times");
        assert_eq!(source_label("www.wsj.com"), "Wall Street Journal");
        assert_eq!(source_label("feeds.bbc.co.uk"), "BBC");
        assert_eq!(source_label("arstechnica.com"), "Ars Technica");
    }

    #[test]
    fn test_source_label_unknown_host() {
        assert_eq!(source_label("example.org"), "Exampleorg");
        assert!(!is_trusted(&source_label("example.org")));
    }

    #[test]
    fn test_every_label_is_trusted() {
        for (_, label) in HOST_LABELS {
            assert!(is_trusted(label), "{label} should be trusted");
        }
    }
}
