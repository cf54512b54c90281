//! The Verge search scraper.
//!
//! Results are plain `<article>` elements with the headline link in an
//! `h2` or `h3` and the byline under `[data-testid="byline"]`.

use super::html::SiteProfile;

pub static PROFILE: SiteProfile = SiteProfile {
    source_name: "The Verge",
    origin: "https://www.theverge.com",
    search_url: "https://www.theverge.com/search?q={query}",
    item: "article",
    title: "h2 a, h3 a",
    excerpt: "p",
    time: "time",
    time_text_fallback: false,
    author: Some(r#"[data-testid="byline"] a"#),
    strip_byline_prefix: false,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates;
    use crate::scrapers::html::extract_candidates;
    use chrono::{TimeZone, Utc};

    const SEARCH_PAGE: &str = r#"
        <main>
          <article>
            <h2><a href="/ai-artificial-intelligence/1234/openai-device">OpenAI shows its first device</a></h2>
            <p>It is smaller than expected.</p>
            <div data-testid="byline"><a href="/authors/jane">Jane Doe</a></div>
            <time datetime="2026-10-15T14:00:00Z">Oct 15</time>
          </article>
          <article>
            <h3><a href="https://www.theverge.com/tech/99/archive">Archive piece</a></h3>
            <time datetime="2025-01-02T00:00:00Z">Jan 2, 2025</time>
          </article>
        </main>"#;

    #[test]
    fn test_verge_search_page() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let candidates =
            extract_candidates(SEARCH_PAGE, &PROFILE, "OpenAI", 10, dates::window_start(7, now), now)
                .unwrap();

        // The archive piece is outside the seven day window.
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.title, "OpenAI shows its first device");
        assert_eq!(
            c.article_url,
            "https://www.theverge.com/ai-artificial-intelligence/1234/openai-device"
        );
        assert_eq!(c.author.as_deref(), Some("Jane Doe"));
        assert_eq!(c.source_name, "The Verge");
        assert_eq!(c.topic, "OpenAI");
    }
}
