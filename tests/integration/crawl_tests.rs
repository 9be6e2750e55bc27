//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use sitemapper::config::{ClientConfig, Config, CrawlerConfig, ExportConfig};
use sitemapper::crawler::{FetchError, HttpFetcher, Severity, SITEMAP_DEPTH};
use sitemapper::{CanonicalUrl, CrawlError, CrawlOutcome, Crawler, FetchResponse, Flow, Frontier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sitemapper=debug")
        .with_test_writer()
        .try_init();
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into().into_bytes(), "text/html")
}

fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        max_pages: 100,
        ..CrawlerConfig::default()
    }
}

fn client_config() -> ClientConfig {
    ClientConfig {
        timeout_ms: 2_000,
        ..ClientConfig::default()
    }
}

fn crawler(config: CrawlerConfig) -> Crawler<HttpFetcher> {
    Crawler::new(
        HttpFetcher::new(&client_config()).expect("Failed to build client"),
        config,
    )
}

/// Key of a path on the mock server
fn key(server: &MockServer, path: &str) -> CanonicalUrl {
    sitemapper::canonicalize(&format!("{}{}", server.uri(), path)).expect("Invalid mock URL")
}

#[tokio::test]
async fn test_internal_links_are_added_and_external_skipped() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <a href="/a">A</a>
            <a href="/b/">B</a>
            <a href="https://other.test/x">External</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/(a|b/?)$"))
        .respond_with(html("<html><body>leaf</body></html>"))
        .mount(&mock_server)
        .await;

    let mut frontier = Frontier::new(&mock_server.uri()).expect("Invalid root");
    let outcome = crawler(crawler_config())
        .build(&mut frontier)
        .await
        .expect("Crawl failed");

    assert_eq!(outcome, CrawlOutcome::Exhausted);
    assert_eq!(frontier.len(), 3);
    assert_eq!(frontier.visited(), 3);

    for leaf in ["/a", "/b"] {
        let entry = frontier.get(key(&mock_server, leaf).as_str()).unwrap();
        assert_eq!(entry.depth(), 1);
        assert_eq!(entry.status(), Some(200));
    }
    assert!(frontier.lookup("https://other.test/x").is_none());
}

#[tokio::test]
async fn test_redirect_is_recorded_and_followed() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/old">old</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html("<p>moved here</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut frontier = Frontier::new(&mock_server.uri()).unwrap();
    crawler(crawler_config()).build(&mut frontier).await.unwrap();

    let new_key = key(&mock_server, "/new");
    let old = frontier.get(key(&mock_server, "/old").as_str()).unwrap();
    assert_eq!(old.status(), Some(301));
    assert_eq!(old.redirect_target(), Some(&new_key));
    assert!(old.page().is_none());

    let new = frontier.get(new_key.as_str()).unwrap();
    assert_eq!(new.depth(), old.depth());
    assert_eq!(new.status(), Some(200));
}

#[tokio::test]
async fn test_timeouts_are_retried_then_non_terminal() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("slow").set_delay(Duration::from_secs(2)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&ClientConfig {
        timeout_ms: 200,
        retries: 2,
        ..ClientConfig::default()
    })
    .unwrap();
    let crawler = Crawler::new(fetcher, crawler_config());
    let mut frontier = Frontier::new(&mock_server.uri()).unwrap();

    let err = crawler.build(&mut frontier).await.unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Fetch(FetchError::Timeout { attempts: 3, .. })
    ));
    assert!(!err.is_terminal());
    assert_eq!(frontier.visited(), 0);
    assert!(frontier.iter().all(|entry| entry.status().is_none()));
}

#[tokio::test]
async fn test_page_budget_on_large_site() {
    init_tracing();
    let mock_server = MockServer::start().await;

    let links: String = (1..50)
        .map(|i| format!(r#"<a href="/page/{}">{}</a>"#, i, i))
        .collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(links))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/page/\d+$"))
        .respond_with(html("<p>page</p>"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let mut frontier = Frontier::new(&mock_server.uri()).unwrap();
    let outcome = crawler(CrawlerConfig {
        max_pages: 5,
        ..crawler_config()
    })
    .build(&mut frontier)
    .await
    .unwrap();

    assert_eq!(outcome, CrawlOutcome::BudgetReached);
    assert_eq!(frontier.len(), 50);
    assert_eq!(frontier.visited(), 5);
    assert_eq!(frontier.iter().filter(|e| e.is_visited()).count(), 5);
    assert_eq!(frontier.iter().filter(|e| e.status().is_none()).count(), 45);
}

#[tokio::test]
async fn test_depth_ceiling() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/one">1</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/one"))
        .respond_with(html(r#"<a href="/two">2</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(html("too deep"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut frontier = Frontier::new(&mock_server.uri()).unwrap();
    let outcome = crawler(CrawlerConfig {
        max_depth: Some(1),
        ..crawler_config()
    })
    .build(&mut frontier)
    .await
    .unwrap();

    assert_eq!(outcome, CrawlOutcome::Exhausted);
    let two = frontier.get(key(&mock_server, "/two").as_str()).unwrap();
    assert_eq!(two.depth(), 2);
    assert!(!two.is_visited());
}

#[tokio::test]
async fn test_handler_extracts_data_and_stops() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Home</title></head><body>
            <a href="/missing">gone</a><a href="/target">target</a><a href="/after">after</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/target"))
        .respond_with(html("<title>Target</title>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/after"))
        .respond_with(html("never"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut frontier = Frontier::new(&mock_server.uri()).unwrap();
    let mut handled = 0;
    let mut handler = |frontier: &mut Frontier, key: &CanonicalUrl, response: &FetchResponse| {
        handled += 1;
        assert_eq!(response.status_code, 200);

        let entry = frontier.get_mut(key.as_str()).unwrap();
        let title = entry.page().and_then(|page| page.title());
        let stop = title.as_deref() == Some("Target");
        if let Some(title) = title {
            entry.insert_data("title", title);
        }
        Flow::from(stop)
    };

    let outcome = crawler(crawler_config())
        .run(&mut frontier, &mut handler)
        .await
        .unwrap();

    assert_eq!(outcome, CrawlOutcome::Stopped);
    assert_eq!(handled, 2);

    let target = frontier.get(key(&mock_server, "/target").as_str()).unwrap();
    assert_eq!(target.data["title"], "Target");
    let missing = frontier.get(key(&mock_server, "/missing").as_str()).unwrap();
    assert_eq!(missing.status(), Some(404));
    assert!(missing.data.is_empty());
}

#[tokio::test]
async fn test_export_and_eviction() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let export_path = dir.path().join("site.json");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/a">A</a><a href="/gone">gone</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("<p>a</p>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let mut frontier = Frontier::new(&mock_server.uri()).unwrap();
    let crawler = crawler(CrawlerConfig {
        delete_pages_after_visit: true,
        ..crawler_config()
    })
    .with_export(ExportConfig {
        enabled: true,
        path: Some(export_path.to_string_lossy().into_owned()),
    });

    crawler.build(&mut frontier).await.unwrap();

    assert_eq!(frontier.pages().count(), 0);

    let contents = std::fs::read_to_string(&export_path).unwrap();
    let rows: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["path"], key(&mock_server, "/").as_str());
    assert_eq!(rows[0]["status_code"], 200);
    assert!(rows
        .iter()
        .any(|row| row["path"] == key(&mock_server, "/gone").as_str() && row["status_code"] == 410));
}

#[tokio::test]
async fn test_sitemap_seeding() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><loc>{base}/blog/one</loc></url>
          <url><loc>{base}/blog/two</loc></url>
          <url><loc>{base}/about</loc></url>
        </urlset>"#
    );

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sitemap.into_bytes(), "application/xml"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut frontier = Frontier::new(&base).unwrap();
    let crawler = crawler(crawler_config());

    let added = crawler
        .seed_from_sitemap(&mut frontier, &format!("{}/sitemap.xml", base), Some("/blog/"))
        .await
        .unwrap();

    assert_eq!(added, 2);
    assert_eq!(frontier.len(), 3);
    let entry = frontier.get(key(&mock_server, "/blog/two").as_str()).unwrap();
    assert_eq!(entry.depth(), SITEMAP_DEPTH);
    assert!(frontier.get(key(&mock_server, "/about").as_str()).is_none());

    let added = crawler
        .seed_from_sitemap(&mut frontier, &format!("{}/missing.xml", base), None)
        .await
        .unwrap();
    assert_eq!(added, 0);
}

#[tokio::test]
async fn test_unreachable_proxy_is_terminal() {
    init_tracing();
    let mock_server = MockServer::start().await;

    let fetcher = HttpFetcher::new(&ClientConfig {
        proxy: Some("http://127.0.0.1:1".to_string()),
        retries: 3,
        ..client_config()
    })
    .unwrap();
    let crawler = Crawler::new(fetcher, crawler_config());
    let mut frontier = Frontier::new(&mock_server.uri()).unwrap();

    let err = crawler.build(&mut frontier).await.unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Fetch(FetchError::Connection { .. })
    ));
    assert!(err.is_terminal());
    assert_eq!(frontier.visited(), 0);
}

#[tokio::test]
async fn test_dropped_connections_are_retried_then_non_terminal() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });

    let fetcher = HttpFetcher::new(&ClientConfig {
        retries: 2,
        ..client_config()
    })
    .unwrap();
    let url = format!("http://{}/", address);

    let err = fetcher.fetch_with_retries(&url, 2).await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Disconnected {
            url: url.clone(),
            attempts: 3
        }
    );
    assert_eq!(err.severity(), Severity::NonTerminal);
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_tls_failure_is_non_terminal_and_not_retried() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html("plain text only"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&client_config()).unwrap();
    let url = format!("https://localhost:{}/", mock_server.address().port());

    let err = fetcher.fetch_with_retries(&url, 2).await.unwrap_err();

    assert!(matches!(err, FetchError::Tls { .. }), "got {:?}", err);
    assert_eq!(err.severity(), Severity::NonTerminal);
}

#[tokio::test]
async fn test_connection_failure_is_terminal_whatever_the_path() {
    init_tracing();
    let fetcher = HttpFetcher::new(&client_config()).unwrap();

    for url in [
        "http://127.0.0.1:1/blog",
        "http://127.0.0.1:1/ssl-certificates",
        "http://127.0.0.1:1/tls/handshake",
    ] {
        let err = fetcher.fetch_with_retries(url, 0).await.unwrap_err();
        assert!(
            matches!(err, FetchError::Connection { .. }),
            "{} gave {:?}",
            url,
            err
        );
        assert!(err.is_terminal());
    }
}

#[tokio::test]
async fn test_body_is_decoded_with_announced_charset() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/latin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"<p>caf\xe9</p>".to_vec(), "text/html; charset=iso-8859-1"),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(&client_config()).unwrap();
    let response = fetcher
        .fetch_with_retries(&format!("{}/latin", mock_server.uri()), 0)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.encoding, "iso-8859-1");
    assert_eq!(response.text, "<p>caf\u{e9}</p>");
    assert_eq!(response.bytes, b"<p>caf\xe9</p>".to_vec());
}

#[tokio::test]
async fn test_from_config() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/a">A</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("a"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = Config::from_toml_str(
        r#"
        [crawler]
        max-pages = 1

        [client]
        timeout-ms = 2000
        "#,
    )
    .unwrap();

    let crawler = Crawler::from_config(&config).unwrap();
    let mut frontier = Frontier::new(&mock_server.uri()).unwrap();

    let outcome = crawler.build(&mut frontier).await.unwrap();

    assert_eq!(outcome, CrawlOutcome::BudgetReached);
    assert_eq!(frontier.visited(), 1);
}
