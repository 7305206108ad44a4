//! Resource discovery over public search endpoints.
//!
//! No API keys: Wikipedia OpenSearch plus scraped result pages from Brave,
//! Yahoo and YouTube. Every source is best effort; a failed fetch just
//! contributes nothing.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::normalize::{bare_host, is_skip_host, normalize_resources, ResourceCandidate};
use crate::config::DiscoveryConfig;
use crate::kernel::BaseFetcher;

pub const WEB_RESULTS_PER_LESSON: usize = 6;
pub const VIDEO_RESULTS_PER_LESSON: usize = 3;

const SKIP_URL_PARTS: &[&str] = &[
    "google.com",
    "brave.com",
    "bing.com",
    "yahoo.com",
    "yandex.com",
    "duckduckgo.com",
    "webcache.googleusercontent.com",
    "/preferences?",
    "/setprefs?",
];

lazy_static! {
    static ref HREF: Regex = Regex::new(r#"(?i)href="(https?://[^"]+)""#).unwrap();
    static ref YOUTUBE_WATCH_ID: Regex = Regex::new(r"watch\?v=([\w-]{6,})").unwrap();
}

/// Outbound result links of a search page, unique and in page order.
pub fn extract_links(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for capture in HREF.captures_iter(html) {
        let link = &capture[1];
        if SKIP_URL_PARTS.iter().any(|part| link.contains(part)) {
            continue;
        }
        let host = Url::parse(link).map(|u| bare_host(&u)).unwrap_or_default();
        if is_skip_host(&host) {
            continue;
        }
        if seen.insert(link.to_string()) {
            links.push(link.to_string());
        }
    }

    links
}

/// Video ids in a YouTube results page, unique and in page order.
pub fn extract_youtube_ids(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    YOUTUBE_WATCH_ID
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn push_unique(items: &mut Vec<String>, url: String) {
    if !items.contains(&url) {
        items.push(url);
    }
}

async fn wikipedia_urls(fetcher: &dyn BaseFetcher, cfg: &DiscoveryConfig, query: &str) -> Vec<String> {
    let params = [
        ("action", "opensearch"),
        ("profile", "fuzzy"),
        ("limit", "2"),
        ("search", query),
        ("format", "json"),
    ];

    let body = match fetcher.get_text(&cfg.wikipedia_api_url, &params).await {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "wikipedia opensearch failed");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Value>(&body) {
        Ok(data) => data
            .get(3)
            .and_then(Value::as_array)
            .map(|urls| {
                urls.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Err(e) => {
            debug!(error = %e, "wikipedia opensearch returned invalid JSON");
            Vec::new()
        }
    }
}

async fn serp_links(
    fetcher: &dyn BaseFetcher,
    engine: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Vec<String> {
    match fetcher.get_text(url, params).await {
        Ok(html) => extract_links(&html),
        Err(e) => {
            debug!(engine, error = %e, "search page fetch failed");
            Vec::new()
        }
    }
}

/// Up to `max(n, 1)` web links for `query`, titled with their own URL and
/// provider `auto`.
pub async fn search_web(
    fetcher: &dyn BaseFetcher,
    cfg: &DiscoveryConfig,
    query: &str,
    n: usize,
) -> Vec<ResourceCandidate> {
    let cap = n * 2;
    let mut items: Vec<String> = Vec::new();

    for url in wikipedia_urls(fetcher, cfg, query).await {
        push_unique(&mut items, url);
    }

    let engines: [(&str, &str, Vec<(&str, &str)>); 2] = [
        (
            "brave",
            cfg.brave_search_url.as_str(),
            vec![("q", query), ("source", "web")],
        ),
        ("yahoo", cfg.yahoo_search_url.as_str(), vec![("p", query)]),
    ];

    for (engine, url, params) in engines {
        for link in serp_links(fetcher, engine, url, &params).await {
            push_unique(&mut items, link);
            if items.len() >= cap {
                break;
            }
        }
    }

    items
        .into_iter()
        .take(n.max(1))
        .map(|url| ResourceCandidate::new(url.clone(), url, "auto"))
        .collect()
}

/// Up to `n` YouTube videos for `query`.
pub async fn search_youtube(
    fetcher: &dyn BaseFetcher,
    cfg: &DiscoveryConfig,
    query: &str,
    n: usize,
) -> Vec<ResourceCandidate> {
    let html = match fetcher
        .get_text(&cfg.youtube_search_url, &[("search_query", query)])
        .await
    {
        Ok(html) => html,
        Err(e) => {
            debug!(error = %e, "youtube search failed");
            return Vec::new();
        }
    };

    extract_youtube_ids(&html)
        .into_iter()
        .take(n)
        .map(|id| {
            ResourceCandidate::new(
                format!("https://www.youtube.com/watch?v={id}"),
                format!("YouTube Video {id}"),
                "auto",
            )
        })
        .collect()
}

/// Web pages and videos for one lesson, normalized and de-duplicated.
pub async fn discover_lesson_resources(
    fetcher: &dyn BaseFetcher,
    cfg: &DiscoveryConfig,
    lesson_title: &str,
    course_title: &str,
) -> Vec<ResourceCandidate> {
    let query = format!("{lesson_title} {course_title}");

    let mut found = search_web(fetcher, cfg, &query, WEB_RESULTS_PER_LESSON).await;
    found.extend(search_youtube(fetcher, cfg, &query, VIDEO_RESULTS_PER_LESSON).await);

    normalize_resources(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::mock_discovery_config;
    use crate::kernel::{HttpFetcher, MockFetcher};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BRAVE_PAGE: &str = r#"
        <a href="https://search.brave.com/settings">settings</a>
        <a HREF="https://doc.rust-lang.org/book/ch04-00.html">book</a>
        <a href="https://doc.rust-lang.org/book/ch04-00.html">dup</a>
        <img src="https://gstatic.com/logo.png">
        <a href="https://t.co/xyz">tracker</a>
        <a href="https://www.google.com/url?q=x">google</a>
        <a href="https://blog.example.org/ownership?utm_source=brave">blog</a>
    "#;

    #[test]
    fn extract_links_filters_engines_and_trackers() {
        assert_eq!(
            extract_links(BRAVE_PAGE),
            vec![
                "https://doc.rust-lang.org/book/ch04-00.html".to_string(),
                "https://blog.example.org/ownership?utm_source=brave".to_string(),
            ]
        );
    }

    #[test]
    fn extract_youtube_ids_dedupes() {
        let html = r#""url":"/watch?v=abcDEF_12" x "/watch?v=abcDEF_12" "/watch?v=short" "/watch?v=zzzzzz-9""#;
        assert_eq!(extract_youtube_ids(html), vec!["abcDEF_12", "zzzzzz-9"]);
    }

    #[tokio::test]
    async fn search_web_merges_sources_and_caps() {
        let fetcher = MockFetcher::new()
            .with_page(
                "http://wiki.test",
                r#"["ownership", ["Ownership"], [""], ["https://en.wikipedia.org/wiki/Ownership"]]"#,
            )
            .with_page("http://brave.test", BRAVE_PAGE)
            .with_page(
                "http://yahoo.test",
                r#"<a href="https://en.wikipedia.org/wiki/Ownership">w</a><a href="https://yahoo.example.net/a">y</a>"#,
            );
        let cfg = mock_discovery_config();

        let found = search_web(&fetcher, &cfg, "ownership rust", 6).await;
        let urls: Vec<&str> = found.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://en.wikipedia.org/wiki/Ownership",
                "https://doc.rust-lang.org/book/ch04-00.html",
                "https://blog.example.org/ownership?utm_source=brave",
                "https://yahoo.example.net/a",
            ]
        );
        assert!(found.iter().all(|r| r.provider == "auto" && r.title == r.url));

        let one = search_web(&fetcher, &cfg, "ownership rust", 0).await;
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn zero_results_still_yields_one_serp_link() {
        let fetcher = MockFetcher::new().with_page("http://brave.test", BRAVE_PAGE);
        let cfg = mock_discovery_config();

        let found = search_web(&fetcher, &cfg, "ownership rust", 0).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://doc.rust-lang.org/book/ch04-00.html");
    }

    #[tokio::test]
    async fn failing_sources_contribute_nothing() {
        let fetcher = MockFetcher::new().with_page("http://wiki.test", "not json");
        let cfg = mock_discovery_config();

        assert!(search_web(&fetcher, &cfg, "q", 6).await.is_empty());
        assert!(search_youtube(&fetcher, &cfg, "q", 3).await.is_empty());
        assert_eq!(fetcher.calls().len(), 4);
    }

    #[tokio::test]
    async fn discover_lesson_resources_normalizes() {
        let fetcher = MockFetcher::new()
            .with_page("http://brave.test", BRAVE_PAGE)
            .with_page(
                "http://youtube.test",
                r#"/watch?v=vid00001 /watch?v=vid00002 /watch?v=vid00003 /watch?v=vid00004"#,
            );
        let cfg = mock_discovery_config();

        let found = discover_lesson_resources(&fetcher, &cfg, "Borrowing", "Rust").await;
        let urls: Vec<&str> = found.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://doc.rust-lang.org/book/ch04-00.html",
                "https://blog.example.org/ownership",
                "https://www.youtube.com/watch?v=vid00001",
                "https://www.youtube.com/watch?v=vid00002",
                "https://www.youtube.com/watch?v=vid00003",
            ]
        );
        assert_eq!(found[0].title, "ch04-00.html");
        assert_eq!(found[0].provider, "doc.rust-lang.org");
        assert_eq!(found[2].provider, "youtube");
    }

    #[tokio::test]
    async fn search_youtube_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/results"))
            .and(query_param("search_query", "lifetimes rust"))
            .respond_with(ResponseTemplate::new(200).set_body_string("/watch?v=lifetime1"))
            .mount(&server)
            .await;

        let cfg = DiscoveryConfig {
            youtube_search_url: format!("{}/results", server.uri()),
            ..mock_discovery_config()
        };
        let fetcher = HttpFetcher::new().unwrap();

        let found = search_youtube(&fetcher, &cfg, "lifetimes rust", 3).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://www.youtube.com/watch?v=lifetime1");
        assert_eq!(found[0].title, "YouTube Video lifetime1");
    }
}
