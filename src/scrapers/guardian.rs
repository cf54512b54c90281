//! The Guardian search scraper.
//!
//! Search results are rendered as `.fc-item` cards. Timestamps only come
//! from the `datetime` attribute of the card's `<time>` element; cards
//! without one fall through to the "now" fallback downstream.

use super::html::SiteProfile;

pub static PROFILE: SiteProfile = SiteProfile {
    source_name: "The Guardian",
    origin: "https://www.theguardian.com",
    search_url: "https://www.theguardian.com/search?q={query}",
    item: ".fc-item",
    title: ".fc-item__title a",
    excerpt: ".fc-item__standfirst",
    time: "time",
    time_text_fallback: false,
    author: None,
    strip_byline_prefix: false,
};
