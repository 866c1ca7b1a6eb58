mod common;

use std::time::Duration;

use serde_json::{json, Value};

fn fixture(name: &str) -> String {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/").to_string() + name
}

#[tokio::test]
async fn start_status_stop_round_trip() {
    let (port, _handle) = common::spawn_node_agent().await;
    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();

    let start: Value = client
        .post(format!("{base}/start"))
        .json(&json!({ "script_path": fixture("sleep_long.sh") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let pid = start["pid"].as_u64().unwrap();
    assert_eq!(start["status"], "started");

    let status: Value = client
        .get(format!("{base}/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let processes = status["processes"].as_array().unwrap();
    assert!(processes.iter().any(|p| p["pid"].as_u64() == Some(pid)));

    let stop = client
        .post(format!("{base}/stop"))
        .json(&json!({ "pid": pid }))
        .send()
        .await
        .unwrap();
    assert_eq!(stop.status(), reqwest::StatusCode::OK);

    let status_after: Value = client
        .get(format!("{base}/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let processes_after = status_after["processes"].as_array().unwrap();
    assert!(!processes_after.iter().any(|p| p["pid"].as_u64() == Some(pid)));
}

#[tokio::test]
async fn start_rejects_empty_script_path() {
    let (port, _handle) = common::spawn_node_agent().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://127.0.0.1:{port}/start"))
        .json(&json!({ "script_path": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stop_unknown_pid_returns_404() {
    let (port, _handle) = common::spawn_node_agent().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://127.0.0.1:{port}/stop"))
        .json(&json!({ "pid": 999_999 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stop_accepts_pid_as_string() {
    let (port, _handle) = common::spawn_node_agent().await;
    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();

    let start: Value = client
        .post(format!("{base}/start"))
        .json(&json!({ "script_path": fixture("sleep_long.sh") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let pid = start["pid"].as_u64().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let stop = client
        .post(format!("{base}/stop"))
        .json(&json!({ "pid": pid.to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(stop.status(), reqwest::StatusCode::OK);
}
