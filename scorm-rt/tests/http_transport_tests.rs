//! HttpTransport against a local runtime endpoint

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use scorm_common::api::RuntimeUpdateRequest;
use scorm_rt::{BridgeConfig, BridgeError, HttpTransport, RuntimeTransport};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorded {
    posts: Arc<Mutex<Vec<(Option<String>, Option<String>, RuntimeUpdateRequest)>>>,
}

async fn get_runtime(Path(lesson_id): Path<String>) -> Response {
    match lesson_id.as_str() {
        "lesson-1" => Json(json!({
            "cmi": { "core": { "lesson_status": "incomplete", "score": { "raw": 42 } } }
        }))
        .into_response(),
        "unit/1?part#2" => Json(json!({ "cmi": { "location": "p3" } })).into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn post_runtime(
    State(recorded): State<Recorded>,
    Path(lesson_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if lesson_id == "broken" {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let learner = headers
        .get("x-learner-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let parsed: RuntimeUpdateRequest = serde_json::from_slice(&body).unwrap();
    recorded.posts.lock().unwrap().push((content_type, learner, parsed));
    StatusCode::NO_CONTENT
}

async fn start_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route(
            "/api/scorm/lesson/:lesson_id/runtime",
            get(get_runtime).post(post_runtime),
        )
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorded)
}

fn updates(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_load_existing_state() {
    let (base_url, _) = start_server().await;
    let transport = HttpTransport::new(&BridgeConfig::new(base_url)).unwrap();

    let tree = transport.load("lesson-1").await.unwrap().expect("state present");
    assert_eq!(tree.get("cmi.core.lesson_status"), Some("incomplete"));
    assert_eq!(tree.get("cmi.core.score.raw"), Some("42"));
}

#[tokio::test]
async fn test_lesson_id_with_reserved_characters_reaches_its_route() {
    let (base_url, _) = start_server().await;
    let transport = HttpTransport::new(&BridgeConfig::new(base_url)).unwrap();

    let tree = transport.load("unit/1?part#2").await.unwrap().expect("state present");
    assert_eq!(tree.get("cmi.location"), Some("p3"));
}

#[tokio::test]
async fn test_load_missing_state_is_none() {
    let (base_url, _) = start_server().await;
    let transport = HttpTransport::new(&BridgeConfig::new(base_url)).unwrap();

    assert!(transport.load("never-started").await.unwrap().is_none());
}

#[tokio::test]
async fn test_load_server_error_is_status_error() {
    let (base_url, _) = start_server().await;
    let transport = HttpTransport::new(&BridgeConfig::new(base_url)).unwrap();

    let err = transport.load("broken").await.unwrap_err();
    assert!(matches!(err, BridgeError::Status(500, _)));
}

#[tokio::test]
async fn test_commit_posts_updates_with_learner_header() {
    let (base_url, recorded) = start_server().await;
    let config = BridgeConfig::new(base_url).with_learner("learner-3");
    let transport = HttpTransport::new(&config).unwrap();

    transport
        .commit("lesson-1", &updates(&[("cmi.core.lesson_location", "p2")]))
        .await
        .unwrap();

    let posts = recorded.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0.as_deref(), Some("application/json"));
    assert_eq!(posts[0].1.as_deref(), Some("learner-3"));
    assert_eq!(posts[0].2.updates["cmi.core.lesson_location"], "p2");
}

#[tokio::test]
async fn test_commit_rejected_is_error() {
    let (base_url, _) = start_server().await;
    let transport = HttpTransport::new(&BridgeConfig::new(base_url)).unwrap();

    let err = transport
        .commit("broken", &updates(&[("cmi.exit", "suspend")]))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Status(503, _)));
}

#[tokio::test]
async fn test_beacon_returns_immediately_and_delivers_plain_text() {
    let (base_url, recorded) = start_server().await;
    let transport = HttpTransport::new(&BridgeConfig::new(base_url)).unwrap();

    transport.beacon("lesson-1", updates(&[("cmi.exit", "suspend")]));

    let mut delivered = false;
    for _ in 0..50 {
        if !recorded.posts.lock().unwrap().is_empty() {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered, "beacon never arrived");

    let posts = recorded.posts.lock().unwrap();
    assert!(posts[0].0.as_deref().unwrap_or_default().starts_with("text/plain"));
    assert_eq!(posts[0].2.updates["cmi.exit"], "suspend");
}
