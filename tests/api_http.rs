// tests/api_http.rs
//
// HTTP-level tests for the trigger Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /run/discover (report JSON, 503 when the store is down)
// - POST /run/poll

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::Request,
    Router,
};
use http::StatusCode;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use jobhunter::api::{self, ApiState};
use jobhunter::config::profile::MasterProfile;
use jobhunter::ingest::providers::rss_feed::RssFeedAdapter;
use jobhunter::ingest::types::SourceAdapter;
use jobhunter::llm::StubOracle;
use jobhunter::model::{Status, WatchlistEntry};
use jobhunter::storage::MemoryStorage;
use jobhunter::store::MemoryStore;
use jobhunter::{App, Settings};

const BODY_LIMIT: usize = 1024 * 1024;
const BOARD_XML: &str = include_str!("fixtures/board_rss.xml");

struct Harness {
    store: Arc<MemoryStore>,
    _state_dir: tempfile::TempDir,
    router: Router,
}

/// Same wiring as `serve`, with in-memory collaborators and a fixture feed.
fn harness() -> Harness {
    let state_dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings {
        state_path: state_dir.path().join("observed_status.json"),
        output_dir: state_dir.path().join("output"),
        ..Settings::default()
    };
    let store = Arc::new(MemoryStore::new());
    let app = App {
        settings: Arc::new(settings),
        store: store.clone(),
        oracle: Arc::new(StubOracle::neutral()),
        storage: Arc::new(MemoryStorage::new()),
        profile: Arc::new(MasterProfile::default()),
        sources: Arc::new(|_: &[WatchlistEntry]| {
            let board: Arc<dyn SourceAdapter> = Arc::new(RssFeedAdapter::from_fixture("Board", BOARD_XML));
            vec![board]
        }),
    };
    Harness {
        store,
        _state_dir: state_dir,
        router: api::router(ApiState::new(app)),
    }
}

async fn post(router: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("build POST");
    let resp = router.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let h = harness();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = h.router.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "OK");
}

#[tokio::test]
async fn discover_trigger_returns_the_run_report() {
    let h = harness();
    let (status, v) = post(h.router.clone(), "/run/discover").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["fetched"], 3);
    assert_eq!(v["admitted"], 3, "neutral stub scores sit exactly on the default threshold");
    assert_eq!(v["strong"], 0);
    assert_eq!(v["criteria"][0], "default");
    assert!(v["sources"].is_array());
    assert_eq!(h.store.records().len(), 3);

    // Second trigger finds nothing new.
    let (_, v) = post(h.router, "/run/discover").await;
    assert_eq!(v["admitted"], 0);
    assert_eq!(v["duplicates"], 3);
}

#[tokio::test]
async fn poll_trigger_generates_for_apply_cards() {
    let h = harness();
    post(h.router.clone(), "/run/discover").await;
    let key = h.store.records()[0].key.clone();
    h.store.set_status(&key, Status::Apply);

    let (status, v) = post(h.router, "/run/poll").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["observed"], 3);
    assert_eq!(v["generated"], 1);
    assert!(h.store.record(&key).unwrap().links.tailored_cv.is_some());
}

#[tokio::test]
async fn unreachable_store_maps_to_503() {
    let h = harness();
    h.store.set_available(false);
    let (status, v) = post(h.router, "/run/discover").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(v["error"].as_str().unwrap().contains("unavailable"));
}
