//! HTTP server setup and routing
//!
//! Builds the axum router over a shared [`AppContext`] and serves it.

use crate::assets::AssetStore;
use crate::audio::OutputSink;
use crate::catalog::SoundCatalog;
use crate::db::settings;
use crate::error::{Error, Result};
use crate::panel::ButtonPanel;
use crate::playback::PlaybackController;
use crate::state::SharedState;
use crate::timer::CountdownTimer;
use axum::{
    response::Html,
    routing::{get, post},
    Router,
};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The soundpad page
const UI_HTML: &str = include_str!("ui.html");

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub controller: Arc<PlaybackController>,
    pub timer: Arc<CountdownTimer>,
    pub panel: Arc<ButtonPanel>,
    pub sink: Arc<OutputSink>,
    pub db_pool: Pool<Sqlite>,
}

impl AppContext {
    /// Wire up all components and restore persisted settings.
    ///
    /// Restores the playback speed and regenerates the panel from the stored
    /// button count (or the number of named sounds when nothing is stored).
    pub async fn new(
        catalog: SoundCatalog,
        assets: AssetStore,
        sink: Arc<OutputSink>,
        db_pool: Pool<Sqlite>,
    ) -> Result<Self> {
        let catalog = Arc::new(catalog);
        let state = Arc::new(SharedState::new());
        let (deadline_tx, deadline_rx) = watch::channel(None);

        let controller = Arc::new(PlaybackController::new(
            Arc::clone(&catalog),
            assets,
            Arc::clone(&sink),
            Arc::clone(&state),
            deadline_rx,
        ));
        let timer = Arc::new(CountdownTimer::new(
            Arc::clone(&state),
            Arc::clone(&controller),
            deadline_tx,
        ));
        let panel = Arc::new(ButtonPanel::new(
            Arc::clone(&catalog),
            Arc::clone(&state),
            db_pool.clone(),
        ));

        match settings::get_playback_speed(&db_pool).await {
            Ok(Some(speed)) => {
                let speed = controller.set_speed(speed);
                info!("Restored playback speed: {}", speed);
            }
            Ok(None) => {}
            Err(Error::Config(msg)) => warn!("{}, using normal speed", msg),
            Err(e) => return Err(e),
        }

        let count = panel.initial_count(catalog.named_count().max(1)).await?;
        panel.generate(count as f64).await?;

        Ok(Self {
            state,
            controller,
            timer,
            panel,
            sink,
            db_pool,
        })
    }
}

/// Build the application router
pub fn build_router(ctx: AppContext) -> Router {
    use super::{handlers, sse};

    Router::new()
        .route("/", get(|| async { Html(UI_HTML) }))
        .route("/health", get(handlers::health))
        // Panel
        .route("/buttons", get(handlers::get_buttons).post(handlers::generate_buttons))
        // Playback control
        .route("/playback/play", post(handlers::play))
        .route("/playback/stop", post(handlers::stop))
        .route("/playback/state", get(handlers::get_playback_state))
        .route("/playback/options", post(handlers::set_options))
        .route(
            "/playback/speed",
            get(handlers::get_speed).post(handlers::set_speed),
        )
        // Output
        .route(
            "/audio/volume",
            get(handlers::get_volume).post(handlers::set_volume),
        )
        .route("/audio/devices", get(handlers::list_audio_devices))
        // Countdown
        .route(
            "/timer",
            get(handlers::get_timer)
                .post(handlers::start_timer)
                .delete(handlers::cancel_timer),
        )
        // SSE event stream
        .route("/events", get(sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until `shutdown` resolves
pub async fn run(
    ctx: AppContext,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(ctx.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    // Leave nothing sounding or scheduled behind
    ctx.timer.cancel();
    ctx.controller.stop();

    Ok(())
}
