//! Integration tests for the hint crawler

use std::path::Path;

use hint_ripple::config::{Config, CrawlerConfig, HintsConfig};
use hint_ripple::crawler::{run_scrape, HintSource, HintsClient, ScrapeOptions};
use hint_ripple::expansion::ProgressMark;
use hint_ripple::output::load_statistics;
use hint_ripple::records::read_hints;
use hint_ripple::storage::{ProgressSnapshot, PROGRESS_INDEX, QUERY_LOG, RESULTS_LOG};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders a hint envelope with one `<dict>` per `(term, priority)`
fn plist(hints: &[(String, i16)]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\"><dict>\
         <key>title</key><string>Suggestions</string><key>hints</key><array>",
    );
    for (term, priority) in hints {
        body.push_str(&format!(
            "<dict><key>term</key><string>{}</string><key>priority</key><integer>{}</integer>\
             <key>url</key><string>https://search.itunes.apple.com/x</string></dict>",
            term, priority
        ));
    }
    body.push_str("</array></dict></plist>");
    body
}

fn saturated_page(query: &str, top: i16) -> String {
    let hints: Vec<(String, i16)> = (0..50)
        .map(|i| (format!("{query} result {i}"), top - i as i16))
        .collect();
    plist(&hints)
}

/// Creates a test configuration pointing the hint client at `server`
fn create_test_config(server: &MockServer) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 4,
            min_priority: 0,
            alphabet: "ab".to_string(),
            channel_capacity: 8,
        },
        hints: HintsConfig {
            url: format!("{}/hints", server.uri()),
            media: "software".to_string(),
        },
        ..Config::default()
    }
}

async fn mount_hints(server: &MockServer, query: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/hints"))
        .and(query_param("q", query))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Answers every other query with an empty suggestion list
async fn mount_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/hints"))
        .respond_with(ResponseTemplate::new(200).set_body_string(plist(&[])))
        .with_priority(10)
        .mount(server)
        .await;
}

async fn requested_queries(server: &MockServer) -> Vec<String> {
    let mut queries: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|req| {
            req.url
                .query_pairs()
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    queries.sort();
    queries
}

fn write_seeds(dir: &Path, seeds: &[&str]) -> std::path::PathBuf {
    let path = dir.join("seeds.txt");
    std::fs::write(&path, seeds.join("\n") + "\n").unwrap();
    path
}

#[tokio::test]
async fn test_hints_client_against_mock_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hints"))
        .and(query_param("media", "software"))
        .and(query_param("q", "cat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(plist(&[
            ("cat games".to_string(), 900),
            ("catan".to_string(), 400),
        ])))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let client = hint_ripple::crawler::build_http_client(&config.http).unwrap();
    let hints = HintsClient::new(client, &config.hints).unwrap();

    let got = hints.fetch_hints("cat").await.unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].to_string(), "900\tcat\tcat games");
    assert_eq!(got[1].to_string(), "400\tcat\tcatan");
}

#[tokio::test]
async fn test_hints_client_reports_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let client = hint_ripple::crawler::build_http_client(&config.http).unwrap();
    let hints = HintsClient::new(client, &config.hints).unwrap();

    let err = hints.fetch_hints("cat").await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_ephemeral_crawl_expands_saturated_queries() {
    let server = MockServer::start().await;
    mount_hints(&server, "a", saturated_page("a", 1000)).await;
    mount_hints(
        &server,
        "ab",
        plist(&[("abba".to_string(), 12), ("abc".to_string(), 3)]),
    )
    .await;
    mount_fallback(&server).await;

    let dir = TempDir::new().unwrap();
    let seeds = write_seeds(dir.path(), &["a", "b"]);
    let output = dir.path().join("hints.tsv");

    let config = create_test_config(&server);
    let report = run_scrape(
        &config,
        ScrapeOptions {
            seeds: Some(seeds),
            output: Some(output.clone()),
            ..ScrapeOptions::default()
        },
    )
    .await
    .unwrap();

    // a, b, then a's children aa, ab and "a "
    assert_eq!(report.settled, 5);
    assert_eq!(report.expanded, 1);
    assert_eq!(report.hints, 52);
    assert_eq!(
        requested_queries(&server).await,
        vec!["a", "a ", "aa", "ab", "b"]
    );

    let hints = read_hints(std::io::BufReader::new(std::fs::File::open(&output).unwrap())).unwrap();
    assert_eq!(hints.len(), 52);

    // One task's batch is written contiguously
    let a_positions: Vec<usize> = hints
        .iter()
        .enumerate()
        .filter(|(_, h)| h.query == "a")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(a_positions.len(), 50);
    assert_eq!(a_positions[49] - a_positions[0], 49);
}

#[tokio::test]
async fn test_resumable_crawl_retries_only_unsettled_queries() {
    let server = MockServer::start().await;
    mount_hints(&server, "a", saturated_page("a", 800)).await;
    Mock::given(method("GET"))
        .and(path("/hints"))
        .and(query_param("q", "b"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    mount_fallback(&server).await;

    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state");
    let seeds = write_seeds(dir.path(), &["a", "b"]);
    let config = create_test_config(&server);

    let first = run_scrape(
        &config,
        ScrapeOptions {
            state_dir: Some(state.clone()),
            seeds: Some(seeds.clone()),
            ..ScrapeOptions::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(first.fetch_failures, 1);
    assert_eq!(first.settled, 4);

    let log = std::fs::read_to_string(state.join(QUERY_LOG)).unwrap();
    assert_eq!(log, "a\nb\naa\nab\na \n");

    let snapshot = ProgressSnapshot::load(&state.join(PROGRESS_INDEX)).unwrap();
    assert_eq!(snapshot.get(0), Some(ProgressMark::Saturated(800)));
    assert_eq!(snapshot.get(1), None);
    assert_eq!(snapshot.get(2), Some(ProgressMark::NoResults));

    let stats = load_statistics(&state, 0).unwrap();
    assert_eq!(stats.pending(), 1);

    // Second run: the endpoint recovers and only "b" is fetched again
    server.reset().await;
    mount_hints(&server, "b", plist(&[("bing".to_string(), 5)])).await;
    mount_fallback(&server).await;

    let second = run_scrape(
        &config,
        ScrapeOptions {
            state_dir: Some(state.clone()),
            seeds: Some(seeds),
            ..ScrapeOptions::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(second.settled, 1);
    assert_eq!(requested_queries(&server).await, vec!["b"]);

    let snapshot = ProgressSnapshot::load(&state.join(PROGRESS_INDEX)).unwrap();
    assert_eq!(snapshot.get(1), Some(ProgressMark::Complete(1)));

    let results = std::fs::read_to_string(state.join(RESULTS_LOG)).unwrap();
    assert_eq!(results.lines().count(), 51);
    assert!(results.ends_with("5\tb\tbing\n"));

    let stats = load_statistics(&state, 0).unwrap();
    assert_eq!(stats.pending(), 0);
    assert_eq!(stats.manifest.unwrap().runs, 2);
}

#[tokio::test]
async fn test_malformed_envelope_leaves_query_unsettled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hints"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><b>Http/1.1 Service Unavailable</b></body> </html>"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state");
    let seeds = write_seeds(dir.path(), &["zz"]);
    let config = create_test_config(&server);

    let report = run_scrape(
        &config,
        ScrapeOptions {
            state_dir: Some(state.clone()),
            seeds: Some(seeds),
            ..ScrapeOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.settled, 0);
    let stats = load_statistics(&state, 0).unwrap();
    assert_eq!(stats.queries_logged, 1);
    assert_eq!(stats.settled, 0);
}

#[tokio::test]
async fn test_fresh_discards_previous_state() {
    let server = MockServer::start().await;
    mount_fallback(&server).await;

    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state");
    let config = create_test_config(&server);

    let seeds = write_seeds(dir.path(), &["x"]);
    run_scrape(
        &config,
        ScrapeOptions {
            state_dir: Some(state.clone()),
            seeds: Some(seeds),
            ..ScrapeOptions::default()
        },
    )
    .await
    .unwrap();

    let seeds = write_seeds(dir.path(), &["y"]);
    let report = run_scrape(
        &config,
        ScrapeOptions {
            state_dir: Some(state.clone()),
            seeds: Some(seeds),
            fresh: true,
            ..ScrapeOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(report.settled, 1);
    assert_eq!(std::fs::read_to_string(state.join(QUERY_LOG)).unwrap(), "y\n");
    let stats = load_statistics(&state, 0).unwrap();
    assert_eq!(stats.manifest.unwrap().runs, 1);
}
