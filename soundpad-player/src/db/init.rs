//! Database initialization
//!
//! Opens (creating if needed) the settings database, creates the schema,
//! and fills in defaults for any missing keys.

use crate::db::settings::{BUTTON_COUNT_KEY, PLAYBACK_SPEED_KEY};
use crate::error::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;

/// Open the database file at `path`, creating file, schema, and defaults as needed.
pub async fn connect(path: &Path, default_button_count: usize) -> Result<Pool<Sqlite>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let url = format!("sqlite:{}?mode=rwc", path.display());
    info!("Opening settings database: {}", path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await?;

    create_schema(&pool).await?;
    init_settings_defaults(&pool, default_button_count).await?;

    Ok(pool)
}

/// In-memory database (tests, throwaway runs).
///
/// Limited to one connection: every SQLite `:memory:` connection is a
/// separate database.
pub async fn connect_in_memory(default_button_count: usize) -> Result<Pool<Sqlite>> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    init_settings_defaults(&pool, default_button_count).await?;

    Ok(pool)
}

/// Create the settings table if missing
pub async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert default values for settings that are absent.
///
/// Existing values are never overwritten.
pub async fn init_settings_defaults(pool: &Pool<Sqlite>, default_button_count: usize) -> Result<()> {
    let button_count = default_button_count.to_string();
    let defaults = [
        (BUTTON_COUNT_KEY, button_count.as_str()),
        (PLAYBACK_SPEED_KEY, "1.0"),
    ];

    for (key, default_value) in defaults {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
                .bind(key)
                .fetch_one(pool)
                .await?;

        if !exists {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;

            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
    }

    Ok(())
}
