//! Wired search scraper.
//!
//! Wired renders search hits as summary cards whose publish date is often
//! plain text such as `October 14, 2026`, so the time element's text is used
//! when it has no `datetime` attribute.

use super::html::SiteProfile;

pub static PROFILE: SiteProfile = SiteProfile {
    source_name: "Wired",
    origin: "https://www.wired.com",
    search_url: "https://www.wired.com/search/?q={query}",
    item: "article, .SummaryItemWrapper",
    title: "h2 a, h3 a, .SummaryItemHedLink",
    excerpt: ".SummaryItemDek, p",
    time: "time, .SummaryItemPublishDate",
    time_text_fallback: true,
    author: Some(".SummaryItemByline a, .Byline a"),
    strip_byline_prefix: false,
};
