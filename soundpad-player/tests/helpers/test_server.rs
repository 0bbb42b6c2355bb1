//! Test server wrapper for integration tests
//!
//! Runs the real router and components over a temp asset directory, an
//! in-memory database and a headless output clock.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde_json::Value;
use sqlx::{Pool, Sqlite};
use tokio::sync::broadcast;

use soundpad_common::events::SoundpadEvent;
use soundpad_player::api::{build_router, AppContext};
use soundpad_player::assets::AssetStore;
use soundpad_player::audio::{NullOutput, OutputSink};
use soundpad_player::catalog::{SoundCatalog, SoundId};
use soundpad_player::db;

use super::audio_generator::{write_sounds, FIXTURE_RATE};

/// Test server instance with full API and playback components
pub struct TestServer {
    router: Router,
    pub ctx: AppContext,
    pub db_pool: Pool<Sqlite>,
    _output: NullOutput,
    _assets: tempfile::TempDir,
}

impl TestServer {
    /// Start with the given clips on disk and display names in the catalog
    pub async fn start(clips: &[(char, u32)], names: &[(char, &str)]) -> Self {
        Self::start_with_db(clips, names, None).await
    }

    /// Start against an existing database pool (e.g. to test restored settings)
    pub async fn start_with_db(
        clips: &[(char, u32)],
        names: &[(char, &str)],
        db_pool: Option<Pool<Sqlite>>,
    ) -> Self {
        let assets = tempfile::tempdir().expect("temp asset dir");
        write_sounds(assets.path(), clips);

        let mut catalog = SoundCatalog::new("wav");
        for &(letter, name) in names {
            catalog.set_name(SoundId::parse(&letter.to_string()).unwrap(), name);
        }
        let default_count = catalog.named_count().clamp(1, 26);

        let db_pool = match db_pool {
            Some(pool) => pool,
            None => db::connect_in_memory(default_count)
                .await
                .expect("in-memory database"),
        };

        let sink = Arc::new(OutputSink::new());
        sink.set_sample_rate(FIXTURE_RATE);
        let output = NullOutput::start(Arc::clone(&sink));

        let ctx = AppContext::new(
            catalog,
            AssetStore::Directory(assets.path().to_path_buf()),
            sink,
            db_pool.clone(),
        )
        .await
        .expect("app context");

        TestServer {
            router: build_router(ctx.clone()),
            ctx,
            db_pool,
            _output: output,
            _assets: assets,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SoundpadEvent> {
        self.ctx.state.subscribe_events()
    }

    /// Make an HTTP request; returns status and parsed JSON body (if any)
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (axum::http::StatusCode, Option<Value>) {
        let (status, bytes) = self.request_raw(method, path, body).await;
        let json = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(&bytes).ok()
        };
        (status, json)
    }

    /// Make an HTTP request; returns status and raw body bytes
    pub async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (axum::http::StatusCode, Vec<u8>) {
        use axum::body::Body;
        use axum::http::{Method, Request};
        use tower::ServiceExt;

        let method = match method {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "DELETE" => Method::DELETE,
            other => panic!("Unsupported method: {}", other),
        };

        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = match body {
            Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    /// Router for tests that need the raw response (e.g. SSE streaming)
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Poll `condition` every 5ms until it holds or `timeout` passes
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
