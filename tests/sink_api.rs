use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use wikichat::core::config::ServerConfig;
use wikichat::server::{monitor_router, sink_router, MonitorState, SinkState};

async fn spawn(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_sink() -> String {
    spawn(sink_router(Arc::new(SinkState::new()), &ServerConfig::default())).await
}

#[tokio::test]
async fn health_reports_healthy() {
    let base = spawn_sink().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn posted_annotation_is_listed_in_feedback() {
    let base = spawn_sink().await;
    let client = reqwest::Client::new();
    let annotation = json!({
        "span_id": "5b8aa5a2d2c872e8",
        "name": "user_feedback",
        "annotator_kind": "HUMAN",
        "result": { "label": "thumbs_up", "score": 1.0, "explanation": "" },
        "metadata": {}
    });

    let res = client
        .post(format!("{}/v1/span_annotations?sync=false", base))
        .json(&json!({ "data": [annotation.clone()] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "status": "success" }));

    let feedback: Vec<Value> = client
        .get(format!("{}/feedback", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feedback, vec![annotation]);
}

#[tokio::test]
async fn malformed_annotation_body_is_rejected() {
    let base = spawn_sink().await;
    let res = reqwest::Client::new()
        .post(format!("{}/v1/span_annotations", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn traces_accept_json_and_raw_bytes() {
    let base = spawn_sink().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/v1/traces", base))
        .json(&json!({ "spans": [{ "name": "RAG Query Processing" }] }))
        .send()
        .await
        .unwrap();
    let res = client
        .post(format!("{}/v1/traces", base))
        .header("content-type", "application/x-protobuf")
        .body(vec![0x0a, 0xff, 0x00])
        .send()
        .await
        .unwrap();
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "status": "success" }));

    let traces: Vec<Value> = client
        .get(format!("{}/traces", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0]["spans"][0]["name"], "RAG Query Processing");
    assert_eq!(traces[1], json!({ "raw_hex": "0aff00" }));
}

#[tokio::test]
async fn unknown_path_lists_valid_endpoints() {
    let base = spawn_sink().await;
    let res = reqwest::get(format!("{}/nonexistent", base)).await.unwrap();
    assert_eq!(res.status(), 404);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Not found");
    assert_eq!(body["path"], "/nonexistent");
    let endpoints: Vec<&str> = body["valid_endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(endpoints.contains(&"POST /v1/span_annotations"));
    assert!(endpoints.contains(&"GET /feedback"));
}

#[tokio::test]
async fn wrong_method_on_known_path_lists_valid_endpoints() {
    let base = spawn_sink().await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/v1/traces", base)).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/v1/traces");
    assert!(body["valid_endpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("POST /v1/traces")));

    let res = client.post(format!("{}/feedback", base)).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Not found");

    let monitor_state = MonitorState::new(&base, Duration::from_secs(1)).unwrap();
    let monitor = spawn(monitor_router(Arc::new(monitor_state), &ServerConfig::default())).await;
    let res = client.post(format!("{}/traces", monitor)).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert!(body["valid_endpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("GET /traces")));
}

#[tokio::test]
async fn monitor_proxies_reads_from_the_sink() {
    let sink = spawn_sink().await;
    let monitor_state = MonitorState::new(&sink, Duration::from_secs(5)).unwrap();
    let monitor = spawn(monitor_router(Arc::new(monitor_state), &ServerConfig::default())).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/v1/span_annotations", sink))
        .json(&json!({ "data": [{ "span_id": "abc", "result": { "score": 0.0 } }] }))
        .send()
        .await
        .unwrap();

    let feedback: Value = client
        .get(format!("{}/feedback", monitor))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feedback, json!([{ "span_id": "abc", "result": { "score": 0.0 } }]));

    let status: Value = client.get(&monitor).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["status"], "running");
    assert_eq!(status["backend_url"], sink.as_str());
}

#[tokio::test]
async fn monitor_reports_unreachable_sink_as_unavailable() {
    let monitor_state = MonitorState::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
    let monitor = spawn(monitor_router(Arc::new(monitor_state), &ServerConfig::default())).await;

    let res = reqwest::get(format!("{}/traces", monitor)).await.unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Service unavailable");

    // The status page stays up even without a backend.
    assert_eq!(reqwest::get(&monitor).await.unwrap().status(), 200);
}
