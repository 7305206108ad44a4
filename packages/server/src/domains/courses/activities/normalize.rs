//! Resource normalization: canonical URLs, de-duplication, tidy titles and
//! provider names.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::domains::courses::models::truncate_chars;

/// Hosts that never make useful resources (trackers, CDN assets).
pub const SKIP_HOSTS: &[&str] = &["s.yimg.com", "gstatic.com", "doubleclick.net", "t.co"];

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "m.youtube.com", "youtu.be"];

const TRACKING_KEYS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "utm_reader",
    "gclid",
    "fbclid",
    "mc_cid",
    "mc_eid",
    "igshid",
    "si",
    "spm",
    "ved",
    "source",
    "ref",
];

pub const TITLE_MAX_CHARS: usize = 255;
pub const PROVIDER_MAX_CHARS: usize = 100;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref BRAND_PREFIX: Regex =
        Regex::new(r"(?i)^\s*(W3Schools|GeeksforGeeks|DataCamp|Real Python)\s*[-|:]\s*").unwrap();
    static ref URL_LIKE: Regex = Regex::new(r"(?i)^https?://").unwrap();
}

/// A discovered link before or after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCandidate {
    pub url: String,
    pub title: String,
    pub provider: String,
}

impl ResourceCandidate {
    pub fn new(url: impl Into<String>, title: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            provider: provider.into(),
        }
    }
}

/// Lowercase host without a leading `www.`.
pub fn bare_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

pub fn is_skip_host(host: &str) -> bool {
    SKIP_HOSTS.contains(&host)
}

/// `(canonical_url, dedupe_key)` for a raw URL.
///
/// YouTube links collapse to `watch?v={id}` with key `yt:{id}`; other URLs
/// lose their tracking parameters and use the canonical URL as key.
/// Unparsable URLs and skip-listed hosts come back unchanged.
pub fn canonicalize_url(raw: &str) -> (String, String) {
    let Ok(mut url) = Url::parse(raw) else {
        return (raw.to_string(), raw.to_string());
    };

    let host = bare_host(&url);
    if is_skip_host(&host) {
        return (raw.to_string(), raw.to_string());
    }

    if YOUTUBE_HOSTS.contains(&host.as_str()) {
        let video_id = if host == "youtu.be" {
            url.path().trim_start_matches('/').to_string()
        } else {
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default()
        };
        if !video_id.is_empty() {
            return (
                format!("https://www.youtube.com/watch?v={video_id}"),
                format!("yt:{video_id}"),
            );
        }
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_KEYS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish();
        url.set_query(Some(&query));
    }

    let canonical = url.to_string();
    (canonical.clone(), canonical)
}

/// Drop blank URLs and keep the first candidate per dedupe key, storing the
/// canonical URL.
pub fn dedupe_resources(items: Vec<ResourceCandidate>) -> Vec<ResourceCandidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());

    for item in items {
        let raw = item.url.trim();
        if raw.is_empty() {
            continue;
        }
        let (canonical, key) = canonicalize_url(raw);
        if !seen.insert(key) {
            continue;
        }
        out.push(ResourceCandidate {
            url: canonical,
            ..item
        });
    }

    out
}

/// Human-friendly title: collapsed whitespace, no brand prefix, and a bare
/// URL replaced by its last path segment (or host).
pub fn clean_title(title: &str) -> String {
    let collapsed = WHITESPACE.replace_all(title, " ");
    let mut cleaned = BRAND_PREFIX.replace(collapsed.trim(), "").to_string();

    if URL_LIKE.is_match(&cleaned) {
        if let Ok(url) = Url::parse(&cleaned) {
            let last_segment = url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string);
            cleaned = last_segment
                .filter(|s| !s.is_empty())
                .or_else(|| url.host_str().map(str::to_string))
                .unwrap_or(cleaned);
        }
    }

    if cleaned.is_empty() {
        return "Reference".to_string();
    }
    truncate_chars(&cleaned, TITLE_MAX_CHARS)
}

/// Explicit provider, `youtube` for YouTube hosts, otherwise the bare host.
pub fn infer_provider(url: &str, provider: &str) -> String {
    let provider = provider.trim();
    if !provider.is_empty() && provider != "auto" {
        return truncate_chars(provider, PROVIDER_MAX_CHARS);
    }

    let host = Url::parse(url).map(|u| bare_host(&u)).unwrap_or_default();
    if YOUTUBE_HOSTS.contains(&host.as_str()) {
        return "youtube".to_string();
    }
    if host.is_empty() {
        return "web".to_string();
    }
    truncate_chars(&host, PROVIDER_MAX_CHARS)
}

/// dedupe → clean titles and providers (dropping skip-listed hosts) → dedupe.
pub fn normalize_resources(raw: Vec<ResourceCandidate>) -> Vec<ResourceCandidate> {
    let cleaned = dedupe_resources(raw)
        .into_iter()
        .filter_map(|item| {
            let url = item.url.trim().to_string();
            if url.is_empty() {
                return None;
            }
            let host = Url::parse(&url).map(|u| bare_host(&u)).unwrap_or_default();
            if is_skip_host(&host) {
                return None;
            }
            Some(ResourceCandidate {
                title: clean_title(&item.title),
                provider: infer_provider(&url, &item.provider),
                url,
            })
        })
        .collect();

    dedupe_resources(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tracking_params_and_keeps_others() {
        let (canonical, key) =
            canonicalize_url("https://example.com/guide?utm_source=x&page=2&fbclid=abc&ref=hn");
        assert_eq!(canonical, "https://example.com/guide?page=2");
        assert_eq!(key, canonical);
    }

    #[test]
    fn drops_empty_query_entirely() {
        let (canonical, _) = canonicalize_url("https://docs.rs/tokio?utm_medium=email");
        assert_eq!(canonical, "https://docs.rs/tokio");
    }

    #[test]
    fn youtube_variants_collapse_to_one_key() {
        let long = canonicalize_url("https://www.youtube.com/watch?v=abc123XYZ&t=42s&si=foo");
        let mobile = canonicalize_url("https://m.youtube.com/watch?v=abc123XYZ");
        let short = canonicalize_url("https://youtu.be/abc123XYZ");

        assert_eq!(long.0, "https://www.youtube.com/watch?v=abc123XYZ");
        assert_eq!(long.1, "yt:abc123XYZ");
        assert_eq!(mobile.1, "yt:abc123XYZ");
        assert_eq!(short.1, "yt:abc123XYZ");
    }

    #[test]
    fn youtube_without_video_id_is_a_plain_url() {
        let (canonical, key) = canonicalize_url("https://www.youtube.com/@channel");
        assert_eq!(canonical, "https://www.youtube.com/@channel");
        assert_eq!(key, canonical);
    }

    #[test]
    fn unparsable_and_skip_hosts_pass_through() {
        assert_eq!(
            canonicalize_url("not a url"),
            ("not a url".to_string(), "not a url".to_string())
        );
        let tracker = "https://t.co/abc?utm_source=x";
        assert_eq!(canonicalize_url(tracker).0, tracker);
    }

    #[test]
    fn dedupe_keeps_first_per_key() {
        let items = vec![
            ResourceCandidate::new("https://a.com/x?utm_source=1", "first", "auto"),
            ResourceCandidate::new("https://a.com/x", "second", "auto"),
            ResourceCandidate::new("   ", "blank", "auto"),
            ResourceCandidate::new("https://youtu.be/vid123", "yt short", "auto"),
            ResourceCandidate::new("https://www.youtube.com/watch?v=vid123", "yt long", "auto"),
        ];

        let out = dedupe_resources(items);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "first");
        assert_eq!(out[0].url, "https://a.com/x");
        assert_eq!(out[1].url, "https://www.youtube.com/watch?v=vid123");
    }

    #[test]
    fn clean_title_rules() {
        assert_eq!(clean_title("  Rust \n  Book  "), "Rust Book");
        assert_eq!(clean_title("W3Schools - Python Lists"), "Python Lists");
        assert_eq!(clean_title("real python: Async IO"), "Async IO");
        assert_eq!(clean_title("GeeksforGeeks | Heaps"), "Heaps");
        assert_eq!(clean_title("https://en.wikipedia.org/wiki/Borrow_checker"), "Borrow_checker");
        assert_eq!(clean_title("https://example.com/"), "example.com");
        assert_eq!(clean_title(""), "Reference");
        assert_eq!(clean_title(&"t".repeat(300)).chars().count(), 255);
    }

    #[test]
    fn provider_inference() {
        assert_eq!(infer_provider("https://www.youtube.com/watch?v=x", "auto"), "youtube");
        assert_eq!(infer_provider("https://youtu.be/x", ""), "youtube");
        assert_eq!(infer_provider("https://www.rust-lang.org/learn", "auto"), "rust-lang.org");
        assert_eq!(infer_provider("https://x.org", "Rust Docs"), "Rust Docs");
        assert_eq!(infer_provider("garbage", "auto"), "web");
    }

    #[test]
    fn normalize_cleans_and_dedupes() {
        let raw = vec![
            ResourceCandidate::new(
                "https://en.wikipedia.org/wiki/Ownership?utm_campaign=z",
                "https://en.wikipedia.org/wiki/Ownership",
                "auto",
            ),
            ResourceCandidate::new("https://en.wikipedia.org/wiki/Ownership", "dup", "auto"),
            ResourceCandidate::new("https://s.yimg.com/pixel.gif", "tracker", "auto"),
            ResourceCandidate::new(
                "https://www.youtube.com/watch?v=abcdef1",
                "YouTube Video abcdef1",
                "auto",
            ),
        ];

        let out = normalize_resources(raw);
        assert_eq!(
            out,
            vec![
                ResourceCandidate::new(
                    "https://en.wikipedia.org/wiki/Ownership",
                    "Ownership",
                    "en.wikipedia.org"
                ),
                ResourceCandidate::new(
                    "https://www.youtube.com/watch?v=abcdef1",
                    "YouTube Video abcdef1",
                    "youtube"
                ),
            ]
        );
    }
}
