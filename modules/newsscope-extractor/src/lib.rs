pub mod canonical;
pub mod classify;
pub mod random_string;
pub mod title;

pub use canonical::{canonicalize, normalize_host};
pub use classify::is_likely_article;
pub use title::find_title_for_link;

use scraper::{Html, Selector};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: Url,
    pub title: String,
}

/// Runs the full link-extraction ladder over every anchor on a parsed
/// category page, returning the accepted article links deduplicated by
/// canonical URL (dedup scope is per-page here; cross-category dedup for
/// a whole crawl is the caller's responsibility, see newsscope-crawl).
pub fn extract_links(document: &Html, base_url: &Url, whitelist: &[String]) -> Vec<ExtractedLink> {
    let anchor_selector = Selector::parse("a").expect("valid selector");
    let mut seen = std::collections::HashSet::new();
    let mut accepted = Vec::new();

    for anchor in document.select(&anchor_selector) {
        let href = anchor.value().attr("href");
        let Some(href) = href else { continue };

        let title = find_title_for_link(anchor);

        if !is_likely_article(Some(href), &title, base_url, whitelist) {
            continue;
        }

        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        let canonical = canonicalize(&resolved);

        if !seen.insert(canonical.clone()) {
            continue;
        }

        accepted.push(ExtractedLink {
            url: canonical,
            title,
        });
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_dedups_article_links() {
        let html = Html::parse_document(
            r#"<html><body>
                <a href="/world/leaders-meet-to-discuss-trade.html">Leaders meet to discuss trade deal today</a>
                <a href="/world/leaders-meet-to-discuss-trade.html?utm=1">Leaders meet to discuss trade deal today</a>
                <a href="/world/">World section front page</a>
            </body></html>"#,
        );
        let base = Url::parse("https://example.com/world/").unwrap();
        let links = extract_links(&html, &base, &[]);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].url.as_str(),
            "https://example.com/world/leaders-meet-to-discuss-trade.html"
        );
    }
}
