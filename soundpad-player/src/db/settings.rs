//! Settings database access
//!
//! Read/write settings from the settings table (key-value store).

use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Number of buttons shown on the panel
pub const BUTTON_COUNT_KEY: &str = "button_count";

/// Playback speed multiplier
pub const PLAYBACK_SPEED_KEY: &str = "playback_speed";

/// Persisted button count, if any.
///
/// Read as a plain number and returned as-is; callers clamp it.
pub async fn get_button_count(db: &Pool<Sqlite>) -> Result<Option<f64>> {
    get_setting::<f64>(db, BUTTON_COUNT_KEY).await
}

pub async fn set_button_count(db: &Pool<Sqlite>, count: usize) -> Result<()> {
    set_setting(db, BUTTON_COUNT_KEY, count).await
}

/// Persisted playback speed, if any
pub async fn get_playback_speed(db: &Pool<Sqlite>) -> Result<Option<f32>> {
    get_setting::<f32>(db, PLAYBACK_SPEED_KEY).await
}

pub async fn set_playback_speed(db: &Pool<Sqlite>, speed: f32) -> Result<()> {
    set_setting(db, PLAYBACK_SPEED_KEY, speed).await
}

/// Generic setting getter
///
/// Returns None if the setting doesn't exist, an error if it can't be parsed.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter (insert or update)
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}
