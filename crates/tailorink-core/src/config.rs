//! Editor configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the auto-save quiet period.
pub const AUTOSAVE_MS_ENV: &str = "TAILORINK_AUTOSAVE_MS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

/// How exported PNG files are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PngNaming {
    /// The side name verbatim (`front`), or `design.png` without a side.
    #[default]
    Compatible,
    /// Always `<side>.png` / `design.png`.
    WithExtension,
}

impl PngNaming {
    /// File name for a PNG export of `side`.
    pub fn file_name(self, side: Option<&str>) -> String {
        match (self, side.filter(|s| !s.is_empty())) {
            (PngNaming::Compatible, Some(side)) => side.to_string(),
            (PngNaming::WithExtension, Some(side)) => format!("{}.png", side),
            (_, None) => "design.png".to_string(),
        }
    }
}

/// Editor configuration.
///
/// Every field has a default; a config file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before an auto-save fires.
    pub autosave_quiet_ms: u64,
    /// Pixel density of PNG renders.
    pub png_multiplier: u32,
    /// Maximum undo depth.
    pub history_limit: usize,
    /// Garment color applied after a successful cart submission.
    pub default_apparel_color: String,
    pub png_naming: PngNaming,
    /// Mirror undo/redo stacks to the local store.
    pub persist_history: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_quiet_ms: 500,
            png_multiplier: 4,
            history_limit: crate::history::DEFAULT_HISTORY_LIMIT,
            default_apparel_color: "#ffffff".to_string(),
            png_naming: PngNaming::Compatible,
            persist_history: true,
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.with_env()
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// Apply environment overrides.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(AUTOSAVE_MS_ENV) {
            self.autosave_quiet_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: AUTOSAVE_MS_ENV.to_string(),
                value,
            })?;
        }
        Ok(self)
    }

    pub fn autosave_quiet(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_ms)
    }

    pub fn png_file_name(&self, side: Option<&str>) -> String {
        self.png_naming.file_name(side)
    }
}
