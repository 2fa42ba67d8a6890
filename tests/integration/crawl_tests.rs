//! Integration tests for the Phase 1 crawler
//!
//! These tests use wiremock to serve a small judgment site and run the
//! fetcher and the coordinator against it.

use judgment_harvest::config::{BackoffPolicy, Config, FetchConfig};
use judgment_harvest::crawler::{Coordinator, FetchOutcome, Fetcher};
use judgment_harvest::state::{Category, ProgressState};
use judgment_harvest::storage::{load_entries, CsvProgressStore, MemoryProgressStore, ProgressStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &Path, categories: Vec<Category>) -> Config {
    let mut config = Config::default();
    config.site.base_url = format!("{}/archives", server.uri());
    config.site.categories = categories;
    config.fetch.max_retries = 3;
    config.fetch.backoff_base_ms = 10;
    config.fetch.request_timeout_secs = 5;
    config.crawl.max_workers = 3;
    config.crawl.min_delay_ms = 0;
    config.crawl.max_delay_ms = 0;
    config.storage.data_dir = dir.join("data");
    config.storage.output_dir = dir.join("extracted_data");
    config.storage.ledger_file = dir.join("ledger.csv");
    config.storage.progress_file = dir.join("progress_tracker.csv");
    config
}

fn fast_fetch_config() -> FetchConfig {
    FetchConfig {
        max_retries: 3,
        backoff_base_ms: 10,
        backoff_policy: BackoffPolicy::Exponential,
        request_timeout_secs: 5,
        ..FetchConfig::default()
    }
}

/// A category listing page with one "read more" link per post slug
fn listing_page(server: &MockServer, slugs: &[&str]) -> String {
    let articles: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<article><h2><a href="{uri}/archives/{slug}/">{slug}</a></h2>
                <p>Excerpt of {slug}</p>
                <a class="more-link" href="{uri}/archives/{slug}/">Read More</a></article>"#,
                uri = server.uri(),
                slug = slug
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", articles)
}

async fn mount_listing(server: &MockServer, category: &str, page: u32, body: String) {
    let route = if page == 1 {
        format!("/archives/category/{}/", category)
    } else {
        format!("/archives/category/{}/page/{}/", category, page)
    };
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_post(server: &MockServer, slug: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/archives/{}/", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><h1 class="entry-title">{}</h1><div class="entry-content"><p>Body</p></div></body></html>"#,
            slug
        )))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_not_found(server: &MockServer, category: &str, page: u32) {
    Mock::given(method("GET"))
        .and(path(format!("/archives/category/{}/page/{}/", category, page)))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn saved_progress(config: &Config) -> ProgressState {
    CsvProgressStore::new(config.storage.progress_file.clone())
        .load()
        .unwrap()
}

#[tokio::test]
async fn test_fetch_succeeds_after_two_server_errors() {
    let server = MockServer::start().await;

    // Mounted first, so it answers until exhausted
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fast_fetch_config()).unwrap();
    match fetcher.fetch(&format!("{}/flaky", server.uri())).await {
        FetchOutcome::Success {
            body,
            status_code,
            attempts,
        } => {
            assert_eq!(body, "finally");
            assert_eq!(status_code, 200);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fast_fetch_config()).unwrap();
    match fetcher.fetch(&format!("{}/down", server.uri())).await {
        FetchOutcome::Failed {
            status_code,
            attempts,
            ..
        } => {
            assert_eq!(status_code, Some(503));
            assert_eq!(attempts, 3);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_retries_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("served"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fast_fetch_config()).unwrap();
    match fetcher.fetch(&format!("{}/busy", server.uri())).await {
        FetchOutcome::Success { body, attempts, .. } => {
            assert_eq!(body, "served");
            assert_eq!(attempts, 2);
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_retries_timeouts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = FetchConfig {
        max_retries: 2,
        request_timeout_secs: 1,
        ..fast_fetch_config()
    };
    let fetcher = Fetcher::new(&config).unwrap();
    match fetcher.fetch(&format!("{}/slow", server.uri())).await {
        FetchOutcome::Failed {
            status_code,
            attempts,
            ..
        } => {
            assert_eq!(status_code, None);
            assert_eq!(attempts, 2);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_retries_refused_connections() {
    // Bind and release a port so nothing is listening on it
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let fetcher = Fetcher::new(&fast_fetch_config()).unwrap();
    match fetcher.fetch(&format!("http://127.0.0.1:{}/", port)).await {
        FetchOutcome::Failed {
            status_code,
            attempts,
            ..
        } => {
            assert_eq!(status_code, None);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_404_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fast_fetch_config()).unwrap();
    let outcome = fetcher.fetch(&format!("{}/gone", server.uri())).await;
    assert!(matches!(outcome, FetchOutcome::NotFound { attempts: 1 }));
}

#[tokio::test]
async fn test_fetch_client_error_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(&fast_fetch_config()).unwrap();
    let outcome = fetcher.fetch(&format!("{}/forbidden", server.uri())).await;
    assert!(matches!(
        outcome,
        FetchOutcome::Failed {
            status_code: Some(403),
            attempts: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn test_crawl_stops_at_404() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "aar", 1, listing_page(&server, &["a-vs-b", "c-vs-d"])).await;
    mount_not_found(&server, "aar", 2).await;
    Mock::given(method("GET"))
        .and(path("/archives/category/aar/page/3/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_post(&server, "a-vs-b", 1).await;
    mount_post(&server, "c-vs-d", 1).await;

    let config = create_test_config(&server, dir.path(), vec![Category::Aar]);
    let mut coordinator = Coordinator::new(config.clone()).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.pages_completed, 1);
    assert_eq!(stats.posts_fetched, 2);
    assert_eq!(load_entries(&config.storage.ledger_file).unwrap().len(), 2);
    assert_eq!(saved_progress(&config).last_page(Category::Aar), Some(1));
    assert!(config
        .storage
        .data_dir
        .join("aar/page_1/category_response.html")
        .is_file());
}

#[tokio::test]
async fn test_rerun_does_not_duplicate_ledger_rows() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "tribunal", 1, listing_page(&server, &["x-vs-y", "p-vs-q"])).await;
    mount_not_found(&server, "tribunal", 2).await;
    // The second run must find both posts on disk
    mount_post(&server, "x-vs-y", 1).await;
    mount_post(&server, "p-vs-q", 1).await;

    let config = create_test_config(&server, dir.path(), vec![Category::Tribunal]);

    let first = Coordinator::new(config.clone()).unwrap().run().await.unwrap();
    assert_eq!(first.posts_fetched, 2);

    let second = Coordinator::new(config.clone()).unwrap().run().await.unwrap();
    assert_eq!(second.posts_fetched, 0);
    assert_eq!(second.posts_reused, 2);

    let entries = load_entries(&config.storage.ledger_file).unwrap();
    assert_eq!(entries.len(), 2);
    let raw = std::fs::read_to_string(&config.storage.ledger_file).unwrap();
    assert_eq!(raw.lines().count(), 3);
}

#[tokio::test]
async fn test_force_refetch_downloads_again_without_duplicates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "aar", 1, listing_page(&server, &["a-vs-b"])).await;
    mount_not_found(&server, "aar", 2).await;
    mount_post(&server, "a-vs-b", 2).await;

    let mut config = create_test_config(&server, dir.path(), vec![Category::Aar]);
    Coordinator::new(config.clone()).unwrap().run().await.unwrap();

    config.crawl.force_refetch = true;
    let stats = Coordinator::new(config.clone()).unwrap().run().await.unwrap();
    assert_eq!(stats.posts_fetched, 1);
    assert_eq!(load_entries(&config.storage.ledger_file).unwrap().len(), 1);
}

#[tokio::test]
async fn test_progress_advances_page_by_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "high-court", 1, listing_page(&server, &["one"])).await;
    mount_listing(&server, "high-court", 2, listing_page(&server, &["two"])).await;
    mount_listing(&server, "high-court", 3, listing_page(&server, &["three"])).await;
    mount_not_found(&server, "high-court", 4).await;
    for slug in ["one", "two", "three"] {
        mount_post(&server, slug, 1).await;
    }

    let config = create_test_config(&server, dir.path(), vec![Category::HighCourt]);
    let store = Arc::new(MemoryProgressStore::default());
    let mut coordinator =
        Coordinator::with_progress_store(config, Box::new(store.clone())).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.pages_completed, 3);
    let pages: Vec<u32> = store
        .history()
        .iter()
        .filter_map(|state| state.last_page(Category::HighCourt))
        .collect();
    assert_eq!(pages, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_resume_starts_from_recorded_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/archives/category/supreme-court/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_listing(&server, "supreme-court", 2, listing_page(&server, &["late"])).await;
    mount_not_found(&server, "supreme-court", 3).await;
    mount_post(&server, "late", 1).await;

    let config = create_test_config(&server, dir.path(), vec![Category::SupremeCourt]);
    let initial: ProgressState = [(Category::SupremeCourt, 2)].into_iter().collect();
    let store = Arc::new(MemoryProgressStore::with_state(initial));

    let mut coordinator =
        Coordinator::with_progress_store(config, Box::new(store.clone())).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.posts_fetched, 1);
    assert_eq!(
        store.load().unwrap().last_page(Category::SupremeCourt),
        Some(2)
    );
}

#[tokio::test]
async fn test_empty_first_page_stops_only_that_category() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        "aar",
        1,
        "<html><body><p>Nothing here yet</p></body></html>".to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/archives/category/aar/page/2/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_listing(&server, "others", 1, listing_page(&server, &["misc"])).await;
    mount_not_found(&server, "others", 2).await;
    mount_post(&server, "misc", 1).await;

    let config = create_test_config(&server, dir.path(), vec![Category::Aar, Category::Others]);
    let stats = Coordinator::new(config.clone()).unwrap().run().await.unwrap();

    assert_eq!(stats.categories_crawled, 2);
    assert_eq!(stats.posts_fetched, 1);
    let progress = saved_progress(&config);
    assert_eq!(progress.last_page(Category::Aar), None);
    assert_eq!(progress.last_page(Category::Others), Some(1));
}

#[tokio::test]
async fn test_failed_post_is_omitted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "aar", 1, listing_page(&server, &["good", "broken"])).await;
    mount_not_found(&server, "aar", 2).await;
    mount_post(&server, "good", 1).await;
    Mock::given(method("GET"))
        .and(path("/archives/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path(), vec![Category::Aar]);
    let stats = Coordinator::new(config.clone()).unwrap().run().await.unwrap();

    assert_eq!(stats.posts_fetched, 1);
    assert_eq!(stats.posts_failed, 1);
    let entries = load_entries(&config.storage.ledger_file).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].post_url.ends_with("/archives/good/"));
    assert_eq!(saved_progress(&config).last_page(Category::Aar), Some(1));
}
