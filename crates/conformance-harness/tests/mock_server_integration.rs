//! End-to-end exercise of the mock ingest server: binds a real ephemeral port and
//! drives it with a real `reqwest::Client`. No mocked transport — the mock server
//! under test is itself the test double these checks exist to validate.

use conformance_harness::MockIngestServer;
use serde_json::json;

#[tokio::test]
async fn batch_capture_round_trips_through_control_plane() {
    let server = MockIngestServer::start("127.0.0.1:0").await.expect("server should bind");
    let client = reqwest::Client::new();

    let capture = client
        .post(format!("{}/batch", server.base_url()))
        .header("content-type", "application/json")
        .json(&json!({"batch": [{"event": "login", "distinct_id": "u1"}]}))
        .send()
        .await
        .expect("capture request should succeed");
    assert_eq!(capture.status(), 200);

    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/_control/requests", server.base_url()))
        .send()
        .await
        .expect("control list request should succeed")
        .json()
        .await
        .expect("control list response should be JSON");

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["path"], "/batch");
    assert_eq!(listed[0]["parsed_events"][0]["event"], "login");

    server.shutdown().await;
}

#[tokio::test]
async fn programmed_failure_response_is_served_until_cleared() {
    let server = MockIngestServer::start("127.0.0.1:0").await.expect("server should bind");
    let client = reqwest::Client::new();

    client
        .post(format!("{}/_control/configure", server.base_url()))
        .json(&json!({"responses": [{"status_code": 503, "body": "{\"error\":\"overloaded\"}"}]}))
        .send()
        .await
        .expect("configure request should succeed");

    let first = client
        .post(format!("{}/capture", server.base_url()))
        .body("{}")
        .send()
        .await
        .expect("first capture should succeed at the transport level");
    assert_eq!(first.status(), 503);

    let second = client
        .post(format!("{}/capture", server.base_url()))
        .body("{}")
        .send()
        .await
        .expect("second capture should succeed at the transport level");
    assert_eq!(second.status(), 200);

    server.shutdown().await;
}

#[tokio::test]
async fn clear_requests_preserves_response_programme() {
    let server = MockIngestServer::start("127.0.0.1:0").await.expect("server should bind");
    let client = reqwest::Client::new();

    client
        .post(format!("{}/_control/configure", server.base_url()))
        .json(&json!({"responses": [{"status_code": 500}]}))
        .send()
        .await
        .expect("configure request should succeed");

    client
        .post(format!("{}/_control/requests/clear", server.base_url()))
        .send()
        .await
        .expect("clear request should succeed");

    let resp = client
        .post(format!("{}/capture", server.base_url()))
        .body("{}")
        .send()
        .await
        .expect("capture should succeed at the transport level");
    assert_eq!(resp.status(), 500, "clearing the request log must not clear the response programme");

    server.shutdown().await;
}
