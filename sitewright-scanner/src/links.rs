use std::collections::BTreeSet;
use url::{Position, Url};

/// Schemes that never lead to a crawlable page
const REJECTED_SCHEMES: &[&str] = &[
    "javascript:",
    "mailto:",
    "tel:",
    "ftp:",
    "file:",
    "sms:",
    "skype:",
    "whatsapp:",
];

/// Canonicalize an absolute URL: http/https only, fragment stripped,
/// `scheme://host/path[?query]`.
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    canonical(&url)
}

/// Resolve an anchor `href` found on the page at `base` into a canonical URL.
///
/// Returns `None` for non-web schemes and anything that does not resolve to
/// http/https. An empty href (or a bare fragment) points back at the page itself.
pub fn resolve_href(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    let href = href.split('#').next().unwrap_or_default();

    let lowered = href.to_ascii_lowercase();
    if REJECTED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    if href.is_empty() {
        return canonical(base);
    }

    let resolved = base.join(href).ok()?;
    canonical(&resolved)
}

fn canonical(url: &Url) -> Option<String> {
    match url.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    url.host_str()?;
    Some(url[..Position::AfterQuery].to_string())
}

/// Host of a canonical URL, lowercased by the parser
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Links found on one page, split by host against the crawl root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedLinks {
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

/// Normalize every href, deduplicate, and split into sorted internal/external sets
pub fn classify_links<I, S>(hrefs: I, base: &Url, root_host: &str) -> ClassifiedLinks
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut internal = BTreeSet::new();
    let mut external = BTreeSet::new();

    for href in hrefs {
        let Some(link) = resolve_href(href.as_ref(), base) else {
            continue;
        };
        match host_of(&link) {
            Some(host) if host.eq_ignore_ascii_case(root_host) => {
                internal.insert(link);
            }
            Some(_) => {
                external.insert(link);
            }
            None => {}
        }
    }

    ClassifiedLinks {
        internal: internal.into_iter().collect(),
        external: external.into_iter().collect(),
    }
}

/// Path component of a URL for compact display, `/` when empty
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/index.html#top").unwrap()
    }

    #[test]
    fn test_normalize_strips_fragment_keeps_query() {
        assert_eq!(
            normalize_url("http://x.com/a?b=1#frag"),
            Some("http://x.com/a?b=1".to_string())
        );
    }

    #[test]
    fn test_normalize_rejects_non_web() {
        assert_eq!(normalize_url("javascript:void(0)"), None);
        assert_eq!(normalize_url("ftp://files.example.com/a"), None);
        assert_eq!(normalize_url("not a url"), None);
    }

    #[test]
    fn test_normalize_adds_root_path() {
        assert_eq!(normalize_url("https://example.com"), Some("https://example.com/".to_string()));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_href("guide.html", &base()),
            Some("https://example.com/docs/guide.html".to_string())
        );
        assert_eq!(
            resolve_href("/about?lang=en#team", &base()),
            Some("https://example.com/about?lang=en".to_string())
        );
        assert_eq!(
            resolve_href("//cdn.example.org/lib.js", &base()),
            Some("https://cdn.example.org/lib.js".to_string())
        );
    }

    #[test]
    fn test_resolve_rejected_schemes() {
        for href in [
            "javascript:void(0)",
            "mailto:a@example.com",
            "tel:+100",
            "ftp://example.com",
            "file:///etc/passwd",
            "sms:123",
            "skype:someone",
            "whatsapp://send",
            "JavaScript:alert(1)",
        ] {
            assert_eq!(resolve_href(href, &base()), None, "{} should be rejected", href);
        }
    }

    #[test]
    fn test_resolve_empty_and_fragment_only_point_to_self() {
        let own = Some("https://example.com/docs/index.html".to_string());
        assert_eq!(resolve_href("", &base()), own);
        assert_eq!(resolve_href("#section", &base()), own);
    }

    #[test]
    fn test_resolve_drops_other_schemes() {
        assert_eq!(resolve_href("data:text/html,hi", &base()), None);
    }

    #[test]
    fn test_classify_by_host() {
        let hrefs = [
            "/a",
            "https://example.com/b",
            "https://other.org/c",
            "https://sub.example.com/d",
            "/a#again",
            "mailto:x@example.com",
        ];
        let links = classify_links(hrefs, &base(), "example.com");

        assert_eq!(
            links.internal,
            vec!["https://example.com/a".to_string(), "https://example.com/b".to_string()]
        );
        assert_eq!(
            links.external,
            vec!["https://other.org/c".to_string(), "https://sub.example.com/d".to_string()]
        );
    }

    #[test]
    fn test_extract_url_path() {
        assert_eq!(extract_url_path("https://example.com/api/users"), "/api/users");
        assert_eq!(extract_url_path("https://example.com"), "/");
        assert_eq!(extract_url_path("not a valid url"), "not a valid url");
    }
}
