//! Sound catalog
//!
//! Maps single-letter sound ids (A–Z) to display names and asset file
//! names. The mapping is sparse: a letter without a configured name is
//! displayed as the letter itself.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Number of addressable sound ids (A–Z)
pub const MAX_SOUNDS: usize = 26;

/// Default asset file extension
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Directory (relative to the asset root) holding the clips
pub const SOUNDS_DIR: &str = "sounds";

/// Single-letter sound identifier, always an uppercase ASCII letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundId(char);

impl SoundId {
    /// Sound id at zero-based panel position (`0` → `A`)
    pub fn from_index(index: usize) -> Option<Self> {
        if index < MAX_SOUNDS {
            Some(SoundId((b'A' + index as u8) as char))
        } else {
            None
        }
    }

    /// Parse a one-letter id; lowercase is accepted and normalized
    pub fn parse(raw: &str) -> Result<Self> {
        let mut chars = raw.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(SoundId(c.to_ascii_uppercase())),
            _ => Err(Error::BadRequest(format!(
                "Sound id must be a single letter A-Z, got '{}'",
                raw
            ))),
        }
    }

    pub fn letter(&self) -> char {
        self.0
    }

    /// Asset file name, e.g. `B.mp3`
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }

    /// Asset path relative to the asset root, e.g. `sounds/B.mp3`
    pub fn relative_path(&self, extension: &str) -> String {
        format!("{}/{}", SOUNDS_DIR, self.file_name(extension))
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display names and asset naming for all sound ids
#[derive(Debug, Clone)]
pub struct SoundCatalog {
    names: BTreeMap<SoundId, String>,
    extension: String,
}

impl SoundCatalog {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            names: BTreeMap::new(),
            extension: extension.into(),
        }
    }

    /// Build a catalog from a `letter → name` table (as found in config).
    ///
    /// Keys that are not a single letter are rejected.
    pub fn from_names<'a, I>(names: I, extension: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut catalog = Self::new(extension);
        for (key, name) in names {
            let id = SoundId::parse(key)
                .map_err(|_| Error::Config(format!("Invalid sound id '{}' in [sounds]", key)))?;
            catalog.set_name(id, name.clone());
        }
        Ok(catalog)
    }

    pub fn set_name(&mut self, id: SoundId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Configured name, or the raw letter when unnamed
    pub fn display_name(&self, id: SoundId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.letter().to_string())
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Number of ids with a configured display name
    pub fn named_count(&self) -> usize {
        self.names.len()
    }

    /// Text for the "now playing" region, e.g. `🎵 Now playing: lion (B.mp3)`
    pub fn now_playing_text(&self, id: SoundId) -> String {
        format!(
            "🎵 Now playing: {} ({})",
            self.display_name(id),
            id.file_name(&self.extension)
        )
    }
}

impl Default for SoundCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}
