//! Soundpad - main entry point
//!
//! Loads configuration, opens the settings database, starts audio output
//! and serves the control API until Ctrl+C or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soundpad_player::api::{self, AppContext};
use soundpad_player::assets::AssetStore;
use soundpad_player::audio::{OutputDriver, OutputSink};
use soundpad_player::config::{Config, ConfigOverrides, ConfigSource};
use soundpad_player::db;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "soundpad")]
#[command(about = "Button-triggered sound clip player")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "SOUNDPAD_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "SOUNDPAD_PORT")]
    port: Option<u16>,

    /// Settings database file
    #[arg(short, long, env = "SOUNDPAD_DATABASE")]
    database: Option<PathBuf>,

    /// Directory or http(s) URL containing `sounds/`
    #[arg(short, long, env = "SOUNDPAD_ASSETS")]
    assets: Option<String>,

    /// Audio output device name
    #[arg(long, env = "SOUNDPAD_DEVICE")]
    device: Option<String>,

    /// Run without an audio device
    #[arg(long)]
    headless: bool,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        ConfigOverrides {
            config_file: args.config,
            port: args.port,
            database_path: args.database,
            assets_root: args.assets,
            device: args.device,
            headless: args.headless,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.into()).context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "soundpad={level},soundpad_player={level},soundpad_common={level},tower_http={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Soundpad v{} ({} built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    match &config.source {
        ConfigSource::File(path) => info!("Config file: {}", path.display()),
        ConfigSource::Missing(path) => {
            warn!("Config file {} not found, using defaults", path.display())
        }
        ConfigSource::Defaults => info!("No config file, using defaults"),
    }

    let catalog = config.catalog().context("Invalid [sounds] table")?;
    info!("{} named sounds", catalog.named_count());

    let assets = AssetStore::from_root(&config.assets_root).context("Invalid asset root")?;
    info!("Asset root: {}", assets.describe());

    let db_pool = db::connect(config.database_path(), catalog.named_count().clamp(1, 26))
        .await
        .context("Failed to open settings database")?;

    let sink = Arc::new(OutputSink::new());
    let ctx = AppContext::new(catalog, assets, Arc::clone(&sink), db_pool.clone())
        .await
        .context("Failed to initialize")?;

    let output = OutputDriver::start(
        sink,
        config.audio.headless,
        config.audio.device.clone(),
        config.audio.buffer_size,
    );
    if output.is_headless() {
        info!("Running headless: playback is timed but silent");
    }

    api::run(ctx, config.port, shutdown_signal())
        .await
        .context("Server error")?;

    db_pool.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
