// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt; // for oneshot

use daily_brief::ai::{DynCompletion, MockCompletion};
use daily_brief::api::AppState;
use daily_brief::cache::{ttl_ms, FileStore, MemoryStore, SlotStore, StreamKey};
use daily_brief::config::{PipelineConfig, ServeMode};
use daily_brief::create_router;
use daily_brief::pipeline::{general_stream, uplifting_stream, Orchestrator};
use daily_brief::sources::mediastack::MediastackAdapter;
use daily_brief::sources::{RawItem, SourceAdapter, SourceError};

fn raw_item(title: &str, description: Option<&str>, url: &str) -> RawItem {
    RawItem {
        title: Some(title.to_string()),
        description: description.map(str::to_string),
        url: Some(url.to_string()),
        ..RawItem::default()
    }
}

struct StaticSource {
    label: &'static str,
    items: Vec<RawItem>,
}

#[async_trait]
impl SourceAdapter for StaticSource {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, SourceError> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &'static str {
        self.label
    }
}

struct NoCredsSource;

#[async_trait]
impl SourceAdapter for NoCredsSource {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, SourceError> {
        Err(SourceError::MissingCredentials("REDDIT_USERNAME"))
    }
    fn name(&self) -> &'static str {
        "NoCreds"
    }
}

fn digest_completion() -> DynCompletion {
    Arc::new(MockCompletion::new(move |prompt| {
        if prompt.contains("curating genuinely uplifting") {
            Ok(r#"{"selectedIndices": [0]}"#.to_string())
        } else if prompt.contains("select the most important news stories") {
            Ok(r#"{"selectedIndices": [0]}"#.to_string())
        } else if prompt.contains("uplifting-news digest") {
            Ok(r#"{"title": "Neighbours plant a tiny forest"}"#.to_string())
        } else if prompt.contains("You are an AI news editor") {
            Ok(
                r#"{"title": "Clearer headline", "summary": ["First", "Second", "Third"]}"#
                    .to_string(),
            )
        } else {
            Err(anyhow::anyhow!("unexpected prompt"))
        }
    }))
}

fn test_state(
    general: Arc<dyn SourceAdapter>,
    uplifting: Arc<dyn SourceAdapter>,
    durable: Arc<dyn SlotStore>,
    serve_mode: ServeMode,
) -> AppState {
    let cfg = PipelineConfig::default();
    let orchestrator = Orchestrator::new(
        digest_completion(),
        Arc::new(MemoryStore::new()),
        ttl_ms(cfg.cache_ttl_hours),
        vec![
            general_stream(general, &cfg.general),
            uplifting_stream(uplifting, &cfg.uplifting),
        ],
    );
    AppState {
        orchestrator: Arc::new(orchestrator),
        durable,
        serve_mode,
        // Empty key: the raw probe reports a config error before any
        // network call, which is exactly what these tests rely on.
        raw_probe: Arc::new(MediastackAdapter::new("", "", "", "", 5)),
    }
}

async fn get(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("request build");
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

fn general_batch() -> Vec<RawItem> {
    vec![raw_item(
        "Minister announces budget surplus",
        Some("The federal treasurer confirmed the surplus."),
        "https://news.test/budget",
    )]
}

fn uplifting_batch() -> Vec<RawItem> {
    vec![raw_item(
        "Neighbours plant tiny forest",
        None,
        "https://social.test/forest",
    )]
}

#[tokio::test]
async fn health_endpoint_answers_ok() {
    let app = create_router(test_state(
        Arc::new(StaticSource {
            label: "General",
            items: general_batch(),
        }),
        Arc::new(NoCredsSource),
        Arc::new(MemoryStore::new()),
        ServeMode::Live,
    ));

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn live_mode_serves_general_while_uplifting_fails_with_structured_error() {
    let app = create_router(test_state(
        Arc::new(StaticSource {
            label: "General",
            items: general_batch(),
        }),
        Arc::new(NoCredsSource),
        Arc::new(MemoryStore::new()),
        ServeMode::Live,
    ));

    let (status, body) = get(&app, "/uplifting-news").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("missing credentials"));

    // The sibling stream is unaffected.
    let (status, body) = get(&app, "/news").await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().expect("array payload");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Clearer headline");
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    struct FlakySource;
    #[async_trait]
    impl SourceAdapter for FlakySource {
        async fn fetch_latest(&self) -> Result<Vec<RawItem>, SourceError> {
            Err(SourceError::Status(503))
        }
        fn name(&self) -> &'static str {
            "Flaky"
        }
    }

    let app = create_router(test_state(
        Arc::new(FlakySource),
        Arc::new(NoCredsSource),
        Arc::new(MemoryStore::new()),
        ServeMode::Live,
    ));

    let (status, body) = get(&app, "/news").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("HTTP 503"));
}

#[tokio::test]
async fn produced_mode_is_404_until_cron_writes_then_serves() {
    let dir = tempfile::tempdir().unwrap();
    let durable: Arc<dyn SlotStore> = Arc::new(FileStore::new(dir.path()));

    let app = create_router(test_state(
        Arc::new(StaticSource {
            label: "General",
            items: general_batch(),
        }),
        Arc::new(StaticSource {
            label: "Uplifting",
            items: uplifting_batch(),
        }),
        durable,
        ServeMode::Produced,
    ));

    // Nothing produced yet.
    let (status, body) = get(&app, "/news").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not been produced"));

    // Run the scheduled trigger.
    let (status, body) = get(&app, "/cron/process-daily-news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap().contains("stored"));

    // Both streams now serve from the durable documents.
    let (status, body) = get(&app, "/news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = get(&app, "/uplifting-news").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["title"], "Neighbours plant a tiny forest");
    assert_eq!(body[0]["summary"][0], "Neighbours plant a tiny forest");
}

#[tokio::test]
async fn cron_reports_failure_envelope_but_still_stores_healthy_stream() {
    let dir = tempfile::tempdir().unwrap();
    let durable: Arc<dyn SlotStore> = Arc::new(FileStore::new(dir.path()));

    let app = create_router(test_state(
        Arc::new(StaticSource {
            label: "General",
            items: general_batch(),
        }),
        Arc::new(NoCredsSource),
        durable.clone(),
        ServeMode::Produced,
    ));

    let (status, body) = get(&app, "/cron/process-daily-news").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("failed"));

    // Stream isolation: general landed despite the uplifting failure.
    let slot = durable.get(StreamKey::General).await.unwrap();
    assert_eq!(slot.processed_items.unwrap().len(), 1);

    let (status, _) = get(&app, "/uplifting-news").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn raw_headline_probe_reports_config_error_as_500() {
    let app = create_router(test_state(
        Arc::new(StaticSource {
            label: "General",
            items: general_batch(),
        }),
        Arc::new(NoCredsSource),
        Arc::new(MemoryStore::new()),
        ServeMode::Live,
    ));

    let (status, body) = get(&app, "/news/raw").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to fetch news"));
}
