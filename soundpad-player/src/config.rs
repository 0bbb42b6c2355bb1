//! Configuration management
//!
//! Bootstrap settings come from, in priority order:
//! 1. Command-line arguments (which also read their own env vars)
//! 2. The TOML config file (`--config`, `SOUNDPAD_CONFIG`, or the platform default)
//! 3. Built-in defaults
//!
//! Runtime settings that change while the service runs (button count,
//! playback speed) live in the database instead; see [`crate::db::settings`].

use crate::catalog::{SoundCatalog, DEFAULT_EXTENSION};
use crate::error::Result;
use serde::Deserialize;
use soundpad_common::config::{default_data_folder, read_toml, resolve_config_path};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "SOUNDPAD_CONFIG";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5730;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,

    /// Path to the SQLite settings database
    pub database_path: Option<PathBuf>,

    pub assets: AssetsConfig,

    pub audio: AudioConfig,

    /// Display names: letter → name, e.g. `B = "lion"`
    pub sounds: BTreeMap<String, String>,

    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: None,
            assets: AssetsConfig::default(),
            audio: AudioConfig::default(),
            sounds: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where clips are loaded from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory or http(s) base URL containing `sounds/`
    pub root: String,

    /// Clip file extension
    pub extension: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name (None = system default)
    pub device: Option<String>,

    /// Run without opening an audio device
    pub headless: bool,

    /// Device buffer size in frames (None = device default)
    pub buffer_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values given on the command line; `None` defers to the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub assets_root: Option<String>,
    pub device: Option<String>,
    pub headless: bool,
}

/// Where the bootstrap config came from, for the startup log
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Configured path does not exist; defaults used
    Missing(PathBuf),
    Defaults,
}

/// Fully resolved bootstrap configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub assets_root: String,
    pub extension: String,
    pub audio: AudioConfig,
    pub sounds: BTreeMap<String, String>,
    pub log_level: String,
    pub source: ConfigSource,
}

impl Config {
    /// Resolve configuration from overrides, the TOML file and defaults.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let path = resolve_config_path(overrides.config_file.as_deref(), CONFIG_ENV_VAR);

        let (toml, source) = match path {
            Some(path) if path.exists() => (read_toml::<TomlConfig>(&path)?, ConfigSource::File(path)),
            Some(path) => (TomlConfig::default(), ConfigSource::Missing(path)),
            None => (TomlConfig::default(), ConfigSource::Defaults),
        };

        Ok(Self::merge(toml, overrides, source))
    }

    fn merge(toml: TomlConfig, overrides: ConfigOverrides, source: ConfigSource) -> Self {
        let database_path = overrides
            .database_path
            .or(toml.database_path)
            .unwrap_or_else(|| default_data_folder().join("soundpad.db"));

        let mut audio = toml.audio;
        if overrides.device.is_some() {
            audio.device = overrides.device;
        }
        audio.headless |= overrides.headless;

        Self {
            port: overrides.port.unwrap_or(toml.port),
            database_path,
            assets_root: overrides.assets_root.unwrap_or(toml.assets.root),
            extension: toml.assets.extension,
            audio,
            sounds: toml.sounds,
            log_level: toml.logging.level,
            source,
        }
    }

    /// Catalog built from the `[sounds]` table
    pub fn catalog(&self) -> Result<SoundCatalog> {
        SoundCatalog::from_names(&self.sounds, self.extension.clone())
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }
}
