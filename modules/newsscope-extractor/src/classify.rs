use crate::canonical::{comparable_string, normalize_host};
use crate::random_string::is_random_string;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

const MIN_HEADLINE_LEN: usize = 14;
const MIN_SLUG_LEN: usize = 20;

static DATE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(/\d{4}/\d{1,2}[/-]\d{1,2}/|\d{4}-\d{1,2}-\d{1,2})").unwrap());
static HTML_EXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(s?html?)$").unwrap());
static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{6,}").unwrap());

/// The full classification ladder from the link extractor: the first
/// matching rule wins.
pub fn is_likely_article(
    href: Option<&str>,
    text: &str,
    base_url: &Url,
    whitelist: &[String],
) -> bool {
    let Some(href) = href else {
        return false;
    };

    // 1. reject if no href (handled above), text too short, or no letters.
    if text.chars().count() < MIN_HEADLINE_LEN {
        return false;
    }
    if !text.chars().any(|c| c.is_alphabetic()) {
        return false;
    }

    let Ok(full_url) = base_url.join(href) else {
        return false;
    };

    // 2. reject root/self-referential targets.
    if full_url.path().is_empty() || full_url.path() == "/" || &full_url == base_url {
        return false;
    }

    // 3. whitelist dominance: any match is an instant accept.
    for pattern in whitelist {
        if let Ok(re) = Regex::new(pattern) {
            if re.is_match(full_url.as_str()) {
                return true;
            }
        } else if let Ok(pattern_url) = Url::parse(pattern) {
            if comparable_string(&full_url).starts_with(&comparable_string(&pattern_url)) {
                return true;
            }
        }
    }

    // 4. without a whitelist match, the link must extend the category URL.
    let is_extension = comparable_string(&full_url).starts_with(&comparable_string(base_url));
    if !is_extension {
        return false;
    }

    // 5. same host after www-stripping.
    let base_host = base_url.host_str().map(normalize_host).unwrap_or_default();
    let link_host = full_url.host_str().map(normalize_host).unwrap_or_default();
    if base_host != link_host {
        return false;
    }

    let path = full_url.path();
    let slug = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if slug.is_empty() {
        return false;
    }
    let decoded_slug = percent_encoding::percent_decode_str(slug)
        .decode_utf8_lossy()
        .to_string();

    // 6. category-page heuristic: short, non-random slug + short overall
    // URL reads as a section page, unless a date is present in the path.
    let is_short_low_entropy_slug = decoded_slug.chars().count() < 16 && !is_random_string(&decoded_slug);
    let is_short_overall_url = full_url.as_str().len() < base_url.as_str().len() * 2;

    if is_short_low_entropy_slug && is_short_overall_url && !DATE_PATH_RE.is_match(path) {
        return false;
    }

    // 7. strong article indicators.
    HTML_EXT_RE.is_match(path)
        || DATE_PATH_RE.is_match(path)
        || DIGIT_RUN_RE.is_match(path)
        || decoded_slug.chars().count() > MIN_SLUG_LEN
        || is_random_string(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn whitelist_regex_accepts_regardless_of_heuristics() {
        let base = u("https://www.jang.com.pk/category/latest-news/world");
        let whitelist = vec!["https://www.jang.com.pk/news/.*".to_string()];
        // Short, low-entropy slug that would otherwise be rejected as a
        // category page.
        let accepted = is_likely_article(
            Some("/news/12"),
            "World briefly: major developments overseas",
            &base,
            &whitelist,
        );
        assert!(accepted);
    }

    #[test]
    fn short_low_entropy_slug_is_rejected_as_category_page() {
        let base = u("https://eldeber.com.bo/mundo/");
        let accepted = is_likely_article(
            Some("/mundo/asia"),
            "Noticias de Asia y el resto del mundo",
            &base,
            &[],
        );
        assert!(!accepted);
    }

    #[test]
    fn date_in_path_overrides_category_rejection() {
        let base = u("https://www.elnacional.com/mundo/");
        let whitelist = vec![r"^https://www\.elnacional\.com/\d{4}/\d{2}/.+".to_string()];
        let accepted = is_likely_article(
            Some("/2025/09/guerra-comercio"),
            "Conflicto comercial entre potencias mundiales",
            &base,
            &whitelist,
        );
        assert!(accepted);
    }

    #[test]
    fn rejects_when_href_missing() {
        let base = u("https://example.com/world/");
        assert!(!is_likely_article(None, "A sufficiently long headline text", &base, &[]));
    }

    #[test]
    fn rejects_short_headline_text() {
        let base = u("https://example.com/world/");
        assert!(!is_likely_article(Some("/world/story"), "Too short", &base, &[]));
    }

    #[test]
    fn rejects_link_equal_to_base_url() {
        let base = u("https://example.com/world/");
        assert!(!is_likely_article(
            Some("https://example.com/world/"),
            "A sufficiently long headline text here",
            &base,
            &[]
        ));
    }

    #[test]
    fn rejects_cross_domain_links() {
        let base = u("https://example.com/world/");
        assert!(!is_likely_article(
            Some("https://other.com/world/some-long-headline-slug"),
            "A sufficiently long headline text here",
            &base,
            &[]
        ));
    }

    #[test]
    fn accepts_html_extension_article() {
        let base = u("https://example.com/world/");
        assert!(is_likely_article(
            Some("/world/leaders-meet-to-discuss-trade.html"),
            "Leaders meet to discuss international trade deal",
            &base,
            &[]
        ));
    }

    #[test]
    fn accepts_long_digit_run_in_path() {
        let base = u("https://example.com/world/");
        assert!(is_likely_article(
            Some("/world/story-123456789"),
            "Extensive coverage of the unfolding international story",
            &base,
            &[]
        ));
    }
}
