//! New York Times search scraper.
//!
//! The search page is heavily scripted and sometimes paywalled; when it does
//! render server-side, results are `SearchResultsModule` entries with text
//! dates and a `By ...` byline.

use super::html::SiteProfile;

pub static PROFILE: SiteProfile = SiteProfile {
    source_name: "New York Times",
    origin: "https://www.nytimes.com",
    search_url: "https://www.nytimes.com/search?query={query}",
    item: "article, .SearchResultsModule-result",
    title: "h4 a, h3 a, .SearchResultsModule-heading a",
    excerpt: "p, .SearchResultsModule-summary",
    time: "time, .SearchResultsModule-date",
    time_text_fallback: true,
    author: Some(".SearchResultsModule-byline, .byline"),
    strip_byline_prefix: true,
};
