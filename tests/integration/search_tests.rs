//! Integration tests for the search snapshot crawl and the diff over snapshots

use hint_ripple::analysis::diff_snapshots;
use hint_ripple::config::{Config, SearchConfig};
use hint_ripple::crawler::{build_http_client, run_search, FetchError, SearchClient, SearchSource};
use hint_ripple::records::read_search_records;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(server: &MockServer) -> Config {
    Config {
        search: SearchConfig {
            url: format!("{}/search", server.uri()),
            country: Some("us".to_string()),
            limit: 50,
            workers: 1,
            pacing_ms: 1,
            max_retries: 2,
        },
        ..Config::default()
    }
}

fn ranking(ids: &[&str]) -> String {
    let results: Vec<String> = ids
        .iter()
        .map(|id| format!(r#"{{"bundleId":"{}","kind":"software"}}"#, id))
        .collect();
    format!(
        r#"{{"resultCount":{},"results":[{}]}}"#,
        ids.len(),
        results.join(",")
    )
}

async fn mount_term(server: &MockServer, term: &str, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("term", term))
        .and(query_param("entity", "software"))
        .and(query_param("country", "us"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ranking(ids)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_client_rejects_duplicate_bundles() {
    let server = MockServer::start().await;
    mount_term(&server, "maps", &["com.a", "com.b", "com.a"]).await;

    let config = create_test_config(&server);
    let client = SearchClient::new(build_http_client(&config.http).unwrap(), &config.search).unwrap();

    match client.fetch_ranking("maps").await {
        Err(FetchError::DuplicateBundle { bundle_id, .. }) => assert_eq!(bundle_id, "com.a"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_snapshot_then_diff() {
    let dir = TempDir::new().unwrap();
    let terms = dir.path().join("terms.txt");
    std::fs::write(&terms, "maps\n").unwrap();

    let first_path = dir.path().join("first.tsv");
    let second_path = dir.path().join("second.tsv");

    let server = MockServer::start().await;
    mount_term(&server, "maps", &["A", "B"]).await;
    let config = create_test_config(&server);
    let report = run_search(&config, Some(terms.clone()), Some(first_path.clone()))
        .await
        .unwrap();
    assert_eq!(report.searched, 1);
    assert_eq!(
        std::fs::read_to_string(&first_path).unwrap(),
        "1\tA\tmaps\n2\tB\tmaps\n"
    );

    server.reset().await;
    mount_term(&server, "maps", &["B", "C"]).await;
    run_search(&config, Some(terms), Some(second_path.clone()))
        .await
        .unwrap();

    let read = |p: &std::path::Path| {
        read_search_records(std::io::BufReader::new(std::fs::File::open(p).unwrap())).unwrap()
    };
    let diffs: Vec<String> = diff_snapshots(read(&first_path), read(&second_path))
        .iter()
        .map(|d| d.to_string())
        .collect();

    assert_eq!(
        diffs,
        vec!["-1\tdie\tA\tmaps", "-1\talive\tB\tmaps", "2\tnew\tC\tmaps"]
    );
}

#[tokio::test]
async fn test_failing_term_is_retried_then_abandoned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let terms = dir.path().join("terms.txt");
    std::fs::write(&terms, "doom\n").unwrap();
    let output = dir.path().join("snapshot.tsv");

    let config = create_test_config(&server);
    let report = run_search(&config, Some(terms), Some(output.clone()))
        .await
        .unwrap();

    assert_eq!(report.retried, 2);
    assert_eq!(report.abandoned, 1);
    assert!(std::fs::read_to_string(&output).unwrap().is_empty());
    server.verify().await;
}
