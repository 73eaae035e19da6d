//! URL canonicalization used as the deduplication key.

use url::Url;

use crate::context::ActivityType;

/// URL prefixes that belong to the browser itself and are never tracked.
const UNTRACKED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "about:",
    "edge://",
    "file://",
    "localhost",
];

/// Host fragments mapped to activity types, checked in order.
const TYPE_HOSTS: &[(&str, ActivityType)] = &[
    ("github.com", ActivityType::Code),
    ("gitlab.com", ActivityType::Code),
    ("stackoverflow.com", ActivityType::Code),
    ("docs.google.com", ActivityType::Document),
    ("notion.so", ActivityType::Document),
    ("youtube.com", ActivityType::Video),
    ("netflix.com", ActivityType::Video),
    ("mail.google.com", ActivityType::Email),
    ("outlook.com", ActivityType::Email),
];

/// Canonicalize a raw URL to `scheme://host[:port]/path`, lower-cased, with
/// query, fragment and trailing slashes removed.
///
/// Total: unparseable or host-less input (`mailto:`, `data:`) comes back
/// lower-cased, and an empty input yields an empty key (which disables
/// deduplication for that sample). The result is always a fixed point.
pub fn normalize_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_lowercase();
    };
    // Re-emitting a host-less URL with `//` would turn its path into an authority.
    let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) else {
        return raw.to_lowercase();
    };

    let host = match parsed.port() {
        Some(p) => format!("{host}:{p}"),
        None => host.to_string(),
    };
    let normalized = format!("{}://{}{}", parsed.scheme(), host, parsed.path());
    normalized.trim_end_matches('/').to_lowercase()
}

/// Host of `url` without a leading `www.`, or `None` when it has no host.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Like [`domain_of`], but never empty: unknown hosts read `"unknown"`.
pub fn domain_or_unknown(url: &str) -> String {
    domain_of(url).unwrap_or_else(|| "unknown".to_string())
}

/// Infer the activity type from a URL's host. Anything unrecognised is a tab.
pub fn detect_type(url: &str) -> ActivityType {
    let Some(domain) = domain_of(url) else {
        return ActivityType::Tab;
    };
    TYPE_HOSTS
        .iter()
        .find(|(host, _)| domain.contains(host))
        .map(|(_, ty)| *ty)
        .unwrap_or(ActivityType::Tab)
}

/// Whether a URL belongs to a page worth capturing (not browser-internal).
pub fn is_trackable(url: &str) -> bool {
    let url = url.trim_start().to_lowercase();
    !UNTRACKED_PREFIXES.iter().any(|p| url.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_case_query_fragment_and_slash() {
        assert_eq!(
            normalize_url("HTTPS://Example.com/Page/"),
            "https://example.com/page"
        );
        assert_eq!(
            normalize_url("https://example.com/a/b?x=1#frag"),
            "https://example.com/a/b"
        );
    }

    #[test]
    fn test_root_path_collapses() {
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_keeps_explicit_port() {
        assert_eq!(
            normalize_url("http://example.com:8080/x"),
            "http://example.com:8080/x"
        );
        assert_eq!(normalize_url("https://example.com:443/x"), "https://example.com/x");
    }

    #[test]
    fn test_malformed_falls_back_to_lowercase() {
        assert_eq!(normalize_url("Not A URL"), "not a url");
        assert_eq!(normalize_url("/Relative/Path"), "/relative/path");
    }

    #[test]
    fn test_empty_is_empty() {
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_same_resource_same_key() {
        let a = normalize_url("https://GitHub.com/acme/widgets/pull/42?tab=files");
        let b = normalize_url("https://github.com/acme/widgets/pull/42#discussion");
        assert_eq!(a, b);
    }

    #[test]
    fn test_domain_of_strips_www() {
        assert_eq!(domain_of("https://www.example.com/x"), Some("example.com".into()));
        assert_eq!(domain_of("garbage"), None);
        assert_eq!(domain_or_unknown("garbage"), "unknown");
    }

    #[test]
    fn test_detect_type() {
        assert_eq!(detect_type("https://github.com/a/b"), ActivityType::Code);
        assert_eq!(
            detect_type("https://stackoverflow.com/questions/1"),
            ActivityType::Code
        );
        assert_eq!(
            detect_type("https://docs.google.com/document/d/1"),
            ActivityType::Document
        );
        assert_eq!(detect_type("https://www.youtube.com/watch?v=1"), ActivityType::Video);
        assert_eq!(detect_type("https://mail.google.com/mail/u/0"), ActivityType::Email);
        assert_eq!(detect_type("https://news.ycombinator.com"), ActivityType::Tab);
        assert_eq!(detect_type("not a url"), ActivityType::Tab);
    }

    #[test]
    fn test_trackable() {
        assert!(is_trackable("https://example.com"));
        assert!(!is_trackable("chrome://settings"));
        assert!(!is_trackable("about:blank"));
        assert!(!is_trackable("localhost:3000"));
        assert!(!is_trackable("CHROME://settings"));
        assert!(!is_trackable("About:blank"));
        assert!(!is_trackable("  Edge://flags"));
    }

    #[test]
    fn test_hostless_urls_are_fixed_points() {
        for raw in ["mailto:A@b.com", "data:text/html,<b>", "urn:isbn:0451450523"] {
            let once = normalize_url(raw);
            assert_eq!(once, raw.to_lowercase());
            assert_eq!(normalize_url(&once), once, "{raw}");
        }
        assert_eq!(normalize_url("mailto:a@b.com"), "mailto:a@b.com");
    }

    proptest! {
        #[test]
        fn prop_idempotent_on_web_urls(
            scheme in "(http|https|HTTP|Https)",
            host in "[a-zA-Z][a-zA-Z0-9]{0,10}\\.(com|org|IO)",
            path in "(/[a-zA-Z0-9_-]{0,8}){0,4}/?",
            query in "(\\?[a-z]=[0-9]{1,3})?",
        ) {
            let url = format!("{scheme}://{host}{path}{query}");
            let once = normalize_url(&url);
            prop_assert_eq!(normalize_url(&once), once.clone());
            prop_assert!(!once.ends_with('/'));
            prop_assert_eq!(once.to_lowercase(), once);
        }

        #[test]
        fn prop_idempotent_on_other_schemes(
            scheme in "(mailto|data|urn|Foo|git\\+ssh)",
            sep in "(:|://)",
            user in "([a-z0-9]{1,6}@)?",
            rest in "[a-zA-Z0-9./,<>@:_-]{0,20}",
        ) {
            let url = format!("{scheme}{sep}{user}{rest}");
            let once = normalize_url(&url);
            prop_assert_eq!(normalize_url(&once), once);
        }

        #[test]
        fn prop_idempotent_on_plain_text(s in "[a-zA-Z0-9 ._:@/-]{0,40}") {
            let once = normalize_url(&s);
            prop_assert_eq!(normalize_url(&once), once);
        }
    }
}
