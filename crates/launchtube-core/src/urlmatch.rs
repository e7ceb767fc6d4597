//! URL normalization and prefix matching for app entries.
//!
//! Matching is deliberately simple: normalize both sides, then test whether
//! the request URL starts with the configured URL. First entry in
//! configuration order wins; there is no scoring or longest-prefix
//! preference.

/// Normalize a URL for matching: lowercase, then strip exactly one each of
/// `https://`, `http://` and `www.`, in that order.
pub fn normalize(url: &str) -> String {
    let mut u = url.trim().to_lowercase();
    for prefix in ["https://", "http://", "www."] {
        if let Some(rest) = u.strip_prefix(prefix) {
            u = rest.to_string();
        }
    }
    u
}

/// Whether a request URL matches a configured URL (prefix match on the
/// normalized forms). An empty configured URL never matches.
pub fn url_matches(request_url: &str, configured_url: &str) -> bool {
    let configured = normalize(configured_url);
    if configured.is_empty() {
        return false;
    }
    normalize(request_url).starts_with(&configured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scheme_and_www() {
        assert_eq!(normalize("https://www.youtube.com/watch"), "youtube.com/watch");
        assert_eq!(normalize("http://example.com"), "example.com");
        assert_eq!(normalize("www.example.com"), "example.com");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(normalize("HTTPS://WWW.YouTube.COM/A"), "youtube.com/a");
    }

    #[test]
    fn test_idempotent() {
        for u in [
            "https://www.youtube.com/watch?v=abc",
            "netflix.com",
            "HTTP://www.Example.com/path",
        ] {
            let once = normalize(u);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_strips_each_prefix_exactly_once() {
        // The inner "www." is part of the path, not a prefix
        assert_eq!(normalize("https://www.www.example.com"), "www.example.com");
        // "http://" hidden behind "https://" is not stripped twice
        assert_eq!(normalize("https://http//x"), "http//x");
    }

    #[test]
    fn test_prefix_match() {
        assert!(url_matches("https://www.youtube.com/watch?v=abc", "youtube.com"));
        assert!(url_matches("youtube.com/tv", "https://youtube.com"));
        assert!(!url_matches("https://notyoutube.org/x", "youtube.com"));
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        assert!(!url_matches("https://example.com", ""));
        assert!(!url_matches("https://example.com", "https://www."));
    }
}
