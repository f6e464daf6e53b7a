use url::Url;

/// Strip the host's leading "www." label. Matches the Python heuristic's
/// `host.replace('www.', '')`.
pub fn normalize_host(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Canonicalize a URL: drop the fragment and query string. Idempotent —
/// `canonical(canonical(u)) == canonical(u)`.
pub fn canonicalize(url: &Url) -> Url {
    let mut u = url.clone();
    u.set_fragment(None);
    u.set_query(None);
    u
}

/// `host (www-stripped) + path + query`, used for prefix comparisons when a
/// whitelist pattern isn't valid regex, and for the base-URL-extension
/// check.
pub fn comparable_string(url: &Url) -> String {
    let host = url.host_str().map(normalize_host).unwrap_or_default();
    let query = url
        .query()
        .map(|q| format!("?{q}"))
        .unwrap_or_default();
    format!("{host}{}{query}", url.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_is_idempotent() {
        let u = Url::parse("https://example.com/a/b?x=1#frag").unwrap();
        let once = canonicalize(&u);
        let twice = canonicalize(&once);
        assert_eq!(once, twice);
        assert!(once.fragment().is_none());
        assert!(once.query().is_none());
    }

    #[test]
    fn normalize_host_strips_www() {
        assert_eq!(normalize_host("www.example.com"), "example.com");
        assert_eq!(normalize_host("example.com"), "example.com");
    }

    #[test]
    fn comparable_string_drops_scheme_and_www() {
        let u = Url::parse("https://www.example.com/mundo/foo?a=1").unwrap();
        assert_eq!(comparable_string(&u), "example.com/mundo/foo?a=1");
    }
}
