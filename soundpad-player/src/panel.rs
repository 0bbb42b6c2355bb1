//! Button panel generator
//!
//! Rebuilds the trigger panel from a requested count: one button per
//! letter from A, labelled with the sound's display name. The chosen count
//! is persisted so the panel comes back the same after a restart.

use crate::catalog::{SoundCatalog, SoundId, MAX_SOUNDS};
use crate::db::settings;
use crate::error::{Error, Result};
use crate::state::SharedState;
use soundpad_common::events::ButtonInfo;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};

/// Coerce a requested count into `1..=26`.
///
/// Zero, negative and non-finite input become 1; fractions round up.
pub fn clamp_button_count(raw: f64) -> usize {
    if !raw.is_finite() || raw < 1.0 {
        return 1;
    }
    (raw.ceil() as usize).min(MAX_SOUNDS)
}

/// Buttons for the first `count` letters
pub fn build_buttons(catalog: &SoundCatalog, count: usize) -> Vec<ButtonInfo> {
    (0..count.min(MAX_SOUNDS))
        .filter_map(SoundId::from_index)
        .map(|id| ButtonInfo {
            sound_id: id.to_string(),
            label: catalog.display_name(id),
        })
        .collect()
}

pub struct ButtonPanel {
    catalog: Arc<SoundCatalog>,
    state: Arc<SharedState>,
    db: Pool<Sqlite>,
}

impl ButtonPanel {
    pub fn new(catalog: Arc<SoundCatalog>, state: Arc<SharedState>, db: Pool<Sqlite>) -> Self {
        Self { catalog, state, db }
    }

    /// Regenerate the panel for `raw` buttons and persist the clamped count.
    pub async fn generate(&self, raw: f64) -> Result<Vec<ButtonInfo>> {
        let count = clamp_button_count(raw);
        let buttons = build_buttons(&self.catalog, count);

        self.state.set_buttons(buttons.clone());
        settings::set_button_count(&self.db, count).await?;

        info!(requested = raw, count, "Button panel generated");
        Ok(buttons)
    }

    /// Count to show at startup: the persisted value, else `fallback`.
    ///
    /// The stored value is read as a plain number and clamped like any other
    /// request; an unreadable value is ignored.
    pub async fn initial_count(&self, fallback: usize) -> Result<usize> {
        let stored = match settings::get_button_count(&self.db).await {
            Ok(stored) => stored,
            Err(Error::Config(msg)) => {
                warn!("{}, using {} buttons", msg, fallback);
                None
            }
            Err(e) => return Err(e),
        };
        Ok(clamp_button_count(stored.unwrap_or(fallback as f64)))
    }
}
