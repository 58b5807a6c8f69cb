//! Integration tests for the history client against a mock HTTP server.

use fleetpulse::{HistoryClient, HistoryError, MetricFamily, SampleWindow};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HistoryClient {
    HistoryClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_recent_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recent/n1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"cpu":{"usage":10},"updated_at":"2024-05-01T10:00:00Z"},
                {"cpu":{"usage":20},"updated_at":"2024-05-01T10:00:02Z"}]"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let samples = client(&server).fetch_recent("n1").await.unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].cpu.usage, 10.0);
    assert_eq!(samples[1].updated_at, "2024-05-01T10:00:02Z");
}

#[tokio::test]
async fn test_fetch_recent_wrapped_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recent/n2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status":"success","data":[{"process":12},{"process":13},{"process":14}]}"#,
        ))
        .mount(&server)
        .await;

    let outcome = client(&server).seed_for("n2").await;
    assert!(!outcome.is_degraded());

    let mut window = SampleWindow::dashboard(MetricFamily::Process);
    window.seed(&outcome.samples);
    assert_eq!(window.len(), 3);
}

#[tokio::test]
async fn test_server_error_degrades_to_empty_seed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recent/n1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let history = client(&server);
    assert!(matches!(
        history.fetch_recent("n1").await,
        Err(HistoryError::Status { status: 500, .. })
    ));

    let outcome = history.seed_for("n1").await;
    assert!(outcome.is_degraded());
    assert!(outcome.samples.is_empty());

    // The view still works on live data alone
    let mut window = SampleWindow::instance();
    assert!(window.seed(&outcome.samples));
    assert!(window.is_empty());
}

#[tokio::test]
async fn test_malformed_history_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recent/n1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let outcome = client(&server).seed_for("n1").await;
    assert!(matches!(outcome.error, Some(HistoryError::Decode(_))));
}

#[tokio::test]
async fn test_unreachable_server_degrades() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let history = HistoryClient::new(&uri, Duration::from_millis(500)).unwrap();
    let outcome = history.seed_for("n1").await;
    assert!(outcome.is_degraded());
}

#[tokio::test]
async fn test_fetch_nodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status":"success","data":[
                {"uuid":"n1","name":"alpha","os":"debian","mem_total":8589934592,"disk_total":107374182400,"weight":2},
                {"uuid":"n2","name":"beta","cpu_cores":4.0,"price":-1}
            ]}"#,
        ))
        .mount(&server)
        .await;

    let nodes = client(&server).fetch_nodes().await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].name, "alpha");
    assert_eq!(nodes[0].mem_total, 8 * 1024 * 1024 * 1024);
    assert_eq!(nodes[1].cpu_cores, 4);
    assert_eq!(nodes[1].disk_total, 0);
    assert_eq!(nodes[1].price, -1.0);
}

#[tokio::test]
async fn test_base_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/panel/api/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let history = HistoryClient::new(&format!("{}/panel/", server.uri()), Duration::from_secs(5))
        .unwrap();
    assert!(history.fetch_nodes().await.unwrap().is_empty());
}
