use arxiv_monitor::utils::retry::ExponentialBackoff;
use arxiv_monitor::{ArxivPipeline, LocalStorage, MonitorConfig, MonitorEngine, RunMode};
use chrono::NaiveDate;
use httpmock::prelude::*;
use tempfile::TempDir;

struct Entry<'a> {
    id: &'a str,
    title: &'a str,
    updated: &'a str,
}

fn feed(base_url: &str, total: usize, entries: &[Entry<'_>]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>arXiv Query</title>
  <opensearch:totalResults>{}</opensearch:totalResults>
"#,
        total
    );
    for entry in entries {
        xml.push_str(&format!(
            r#"  <entry>
    <id>{}/abs/{}v1</id>
    <updated>{}T12:00:00Z</updated>
    <published>{}T12:00:00Z</published>
    <title>{}</title>
    <summary>Abstract of {}
continued.</summary>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
"#,
            base_url, entry.id, entry.updated, entry.updated, entry.title, entry.id
        ));
    }
    xml.push_str("</feed>\n");
    xml
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn test_config(server: &MockServer) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.arxiv.endpoint = server.url("/api/query");
    config.arxiv.page_delay_secs = 0.0;
    config.arxiv.page_retries = 1;
    config.code_links.endpoint = server.base_url();
    config.pdf.enabled = false;
    config.pdf.post_download_delay_secs = 0.0;
    config.output.github_repo = "owner/papers".to_string();
    config
}

fn pipeline(
    dir: &TempDir,
    config: MonitorConfig,
    mode: RunMode,
) -> ArxivPipeline<LocalStorage> {
    ArxivPipeline::new(LocalStorage::new(dir.path()), config, mode, today())
        .unwrap()
        .with_backoff(ExponentialBackoff::immediate(2))
}

#[tokio::test]
async fn test_daily_run_writes_index_readme_and_last_run() {
    let server = MockServer::start();
    let base = server.base_url();
    let body = feed(
        &base,
        3,
        &[
            Entry { id: "2402.00003", title: "Newest TOD Paper", updated: "2024-02-28" },
            Entry { id: "2402.00002", title: "Older TOD Paper", updated: "2024-02-25" },
            Entry { id: "2401.00001", title: "Too Old", updated: "2024-01-10" },
        ],
    );
    let arxiv_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/query")
            .header("user-agent", "arxiv.py/2.1.3")
            .query_param("start", "0")
            .query_param("sortBy", "submittedDate")
            .query_param("sortOrder", "descending")
            .query_param_exists("search_query");
        then.status(200)
            .header("Content-Type", "application/atom+xml")
            .body(body);
    });
    let code_mock = server.mock(|when, then| {
        when.method(GET).path("/v1/paper/arXiv:2402.00003");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"official": {"url": "https://github.com/org/newest"}}));
    });
    let missing_code_mock = server.mock(|when, then| {
        when.method(GET).path("/v1/paper/arXiv:2402.00002");
        then.status(404);
    });

    let dir = TempDir::new().unwrap();
    let engine = MonitorEngine::new(pipeline(&dir, test_config(&server), RunMode::Daily));
    let summary = engine.run().await.unwrap();

    arxiv_mock.assert();
    code_mock.assert();
    missing_code_mock.assert();
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.new_rows, 2);
    assert_eq!(summary.total_rows, 2);

    let index: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("docs/arxiv-daily.json")).unwrap(),
    )
    .unwrap();
    let topic = &index["Task Oriented Dialogue Systems"];
    assert!(topic["2402.00003"]
        .as_str()
        .unwrap()
        .ends_with("|**[https://github.com/org/newest](https://github.com/org/newest)**|\n"));
    assert!(topic["2402.00002"].as_str().unwrap().ends_with("|null|\n"));
    assert!(topic.get("2401.00001").is_none());

    let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
    assert!(readme.starts_with("## Last updated on 2024.03.01"));
    assert!(readme.find("Newest TOD Paper").unwrap() < readme.find("Older TOD Paper").unwrap());
    assert!(readme.contains("Abstract of 2402.00003 continued."));
    assert!(readme.contains("https://github.com/owner/papers/issues"));

    let last_run = std::fs::read_to_string(dir.path().join("docs/last_run.txt")).unwrap();
    assert_eq!(last_run, "2024-03-01");
}

#[tokio::test]
async fn test_pagination_follows_total_results() {
    let server = MockServer::start();
    let base = server.base_url();
    let first = feed(
        &base,
        3,
        &[
            Entry { id: "2402.00013", title: "Page One A", updated: "2024-02-29" },
            Entry { id: "2402.00012", title: "Page One B", updated: "2024-02-28" },
        ],
    );
    let second = feed(
        &base,
        3,
        &[Entry { id: "2402.00011", title: "Page Two A", updated: "2024-02-27" }],
    );
    let first_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/query")
            .query_param("start", "0")
            .query_param("max_results", "2");
        then.status(200).body(first);
    });
    let second_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/query")
            .query_param("start", "2")
            .query_param("max_results", "2");
        then.status(200).body(second);
    });

    let mut config = test_config(&server);
    config.arxiv.page_size = 2;
    config.code_links.enabled = false;

    let dir = TempDir::new().unwrap();
    let engine = MonitorEngine::new(pipeline(&dir, config, RunMode::Daily));
    let summary = engine.run().await.unwrap();

    first_mock.assert();
    second_mock.assert();
    assert_eq!(summary.fetched, 3);
}

#[tokio::test]
async fn test_daily_run_respects_max_results_and_last_run() {
    let server = MockServer::start();
    let base = server.base_url();
    let body = feed(
        &base,
        3,
        &[
            Entry { id: "2402.00023", title: "Kept A", updated: "2024-02-29" },
            Entry { id: "2402.00022", title: "Kept B", updated: "2024-02-28" },
            Entry { id: "2402.00021", title: "Over Limit", updated: "2024-02-27" },
        ],
    );
    let arxiv_mock = server.mock(|when, then| {
        when.method(GET).path("/api/query").query_param("start", "0");
        then.status(200).body(body);
    });

    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs/last_run.txt"), "2024-02-20\n").unwrap();

    let mut config = test_config(&server);
    config.arxiv.max_results = 2;
    config.code_links.enabled = false;

    let pipeline = pipeline(&dir, config, RunMode::Daily);
    let start = pipeline.start_date().await.unwrap();
    assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 20).unwrap());
    assert!(pipeline
        .search_request(start)
        .query
        .ends_with("submittedDate:[20240220 TO 20240301]"));

    let summary = MonitorEngine::new(pipeline).run().await.unwrap();

    arxiv_mock.assert();
    assert_eq!(summary.fetched, 2);
    let index = std::fs::read_to_string(dir.path().join("docs/arxiv-daily.json")).unwrap();
    assert!(!index.contains("Over Limit"));
}

#[tokio::test]
async fn test_existing_index_entries_are_preserved() {
    let server = MockServer::start();
    let base = server.base_url();
    let body = feed(
        &base,
        1,
        &[Entry { id: "2402.00031", title: "Fresh Paper", updated: "2024-02-29" }],
    );
    server.mock(|when, then| {
        when.method(GET).path("/api/query");
        then.status(200).body(body);
    });

    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("docs")).unwrap();
    std::fs::write(
        dir.path().join("docs/arxiv-daily.json"),
        r#"{"Task Oriented Dialogue Systems": {"2301.00001": "|**2023-01-02**|**Ancient**|cs.CL|x|[2301.00001](u)|null|\n"}}"#,
    )
    .unwrap();

    let mut config = test_config(&server);
    config.code_links.enabled = false;

    let summary = MonitorEngine::new(pipeline(&dir, config, RunMode::Daily))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.new_rows, 1);
    assert_eq!(summary.total_rows, 2);
    let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
    assert!(readme.find("Fresh Paper").unwrap() < readme.find("Ancient").unwrap());
}

#[tokio::test]
async fn test_first_page_failure_still_publishes() {
    let server = MockServer::start();
    let arxiv_mock = server.mock(|when, then| {
        when.method(GET).path("/api/query");
        then.status(503);
    });

    let dir = TempDir::new().unwrap();
    let summary = MonitorEngine::new(pipeline(&dir, test_config(&server), RunMode::Daily))
        .run()
        .await
        .unwrap();

    // one initial try plus one retry
    assert_eq!(arxiv_mock.hits(), 2);
    assert_eq!(summary.fetched, 0);
    assert!(dir.path().join("README.md").exists());
    assert!(dir.path().join("docs/last_run.txt").exists());
}

/// Two full pages announced, the first served normally. Returns the mock for
/// the second page so callers can shape its response.
fn two_page_search<'a>(
    server: &'a MockServer,
    second_page: impl FnOnce(httpmock::Then),
) -> httpmock::Mock<'a> {
    let base = server.base_url();
    let first = feed(
        &base,
        4,
        &[
            Entry { id: "2402.00043", title: "Kept First", updated: "2024-02-29" },
            Entry { id: "2402.00042", title: "Kept Second", updated: "2024-02-28" },
        ],
    );
    server.mock(|when, then| {
        when.method(GET).path("/api/query").query_param("start", "0");
        then.status(200).body(first);
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/query").query_param("start", "2");
        second_page(then);
    })
}

fn two_page_config(server: &MockServer) -> MonitorConfig {
    let mut config = test_config(server);
    config.arxiv.page_size = 2;
    config.arxiv.page_retries = 2;
    config.code_links.enabled = false;
    config
}

#[tokio::test]
async fn test_empty_later_page_ends_search_after_retries() {
    let server = MockServer::start();
    let empty = feed(&server.base_url(), 4, &[]);
    let second_mock = two_page_search(&server, |then| {
        then.status(200).body(empty);
    });

    let dir = TempDir::new().unwrap();
    let summary = MonitorEngine::new(pipeline(&dir, two_page_config(&server), RunMode::Daily))
        .run()
        .await
        .unwrap();

    // one initial try plus two retries
    assert_eq!(second_mock.hits(), 3);
    assert_eq!(summary.fetched, 2);
    let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
    assert!(readme.contains("Kept First"));
    assert!(readme.contains("Kept Second"));
}

#[tokio::test]
async fn test_failed_later_page_keeps_collected_papers() {
    let server = MockServer::start();
    let second_mock = two_page_search(&server, |then| {
        then.status(500);
    });

    let dir = TempDir::new().unwrap();
    let summary = MonitorEngine::new(pipeline(&dir, two_page_config(&server), RunMode::Daily))
        .run()
        .await
        .unwrap();

    assert_eq!(second_mock.hits(), 3);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.total_rows, 2);
}

#[tokio::test]
async fn test_rejected_later_page_is_not_retried() {
    let server = MockServer::start();
    let second_mock = two_page_search(&server, |then| {
        then.status(400);
    });

    let dir = TempDir::new().unwrap();
    let summary = MonitorEngine::new(pipeline(&dir, two_page_config(&server), RunMode::Daily))
        .run()
        .await
        .unwrap();

    assert_eq!(second_mock.hits(), 1);
    assert_eq!(summary.fetched, 2);
}

#[tokio::test]
async fn test_empty_first_page_returns_no_results() {
    let server = MockServer::start();
    let empty = feed(&server.base_url(), 0, &[]);
    let arxiv_mock = server.mock(|when, then| {
        when.method(GET).path("/api/query");
        then.status(200).body(empty);
    });

    let mut config = test_config(&server);
    config.arxiv.page_retries = 2;

    let dir = TempDir::new().unwrap();
    let summary = MonitorEngine::new(pipeline(&dir, config, RunMode::Daily))
        .run()
        .await
        .unwrap();

    assert_eq!(arxiv_mock.hits(), 1);
    assert_eq!(summary.fetched, 0);
    assert_eq!(summary.total_rows, 0);
    assert!(dir.path().join("README.md").exists());
}

#[tokio::test]
async fn test_seed_run_downloads_pdfs_and_checkpoints() {
    let server = MockServer::start();
    let base = server.base_url();
    let body = feed(
        &base,
        2,
        &[
            Entry { id: "2001.00002", title: "Seeded: Two", updated: "2020-06-01" },
            Entry { id: "2001.00001", title: "Seeded One", updated: "2019-12-01" },
        ],
    );
    server.mock(|when, then| {
        when.method(GET).path("/api/query");
        then.status(200).body(body);
    });
    let pdf_mock = server.mock(|when, then| {
        when.method(GET).path_contains("/pdf/");
        then.status(200)
            .header("Content-Type", "application/pdf")
            .body("%PDF-1.4");
    });

    let mut config = test_config(&server);
    config.code_links.enabled = false;
    config.pdf.enabled = true;
    config.arxiv.seed_checkpoint_every = 1;

    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, config, RunMode::Seed);
    let start = pipeline.start_date().await.unwrap();
    assert_eq!(start, NaiveDate::from_ymd_opt(2019, 3, 3).unwrap());
    assert_eq!(pipeline.search_request(start).max_results, None);

    let summary = MonitorEngine::new(pipeline).run().await.unwrap();

    assert_eq!(summary.fetched, 2);
    assert_eq!(pdf_mock.hits(), 2);
    assert!(dir.path().join("data/Seeded_ Two.pdf").exists());
    assert!(dir.path().join("data/Seeded One.pdf").exists());
}
