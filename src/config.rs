//! Configuration file parser for ~/.config/feedsync/config.toml.
//!
//! The config file is optional. A missing or empty file yields
//! `Config::default()`. Unknown keys are accepted but logged as warnings,
//! since they are usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level configuration. Any subset of keys may be given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render sidebar rows without leading padding.
    pub compact_sidebar: bool,

    /// Sidebar width in columns, including borders.
    pub sidebar_width: u16,

    /// Database location. Defaults to `feedsync.db` in the config directory.
    pub database_path: Option<PathBuf>,

    /// Number of icon lookups (hits and misses) remembered.
    pub icon_cache_size: usize,

    /// Per-request timeout for icon loads, in seconds.
    pub icon_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compact_sidebar: false,
            sidebar_width: 32,
            database_path: None,
            icon_cache_size: 256,
            icon_timeout_secs: 5,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "compact_sidebar",
        "sidebar_width",
        "database_path",
        "icon_cache_size",
        "icon_timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the TOML file; it need not exist
    ///
    /// # Errors
    ///
    /// - [`ConfigError::TooLarge`] if the file exceeds 1 MB
    /// - [`ConfigError::Io`] if the file exists but cannot be read
    /// - [`ConfigError::Parse`] if the contents are not valid TOML for [`Config`]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            compact = config.compact_sidebar,
            width = config.sidebar_width,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn icon_timeout(&self) -> Duration {
        Duration::from_secs(self.icon_timeout_secs.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================
