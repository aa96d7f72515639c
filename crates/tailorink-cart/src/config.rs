//! Cart bridge configuration.

use crate::error::{CartError, CartResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "TAILORINK_API_URL";
/// Environment variable overriding the unit price (minor units).
pub const UNIT_PRICE_ENV: &str = "TAILORINK_UNIT_PRICE";

/// Cart bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Base URL of the store backend, without a trailing slash.
    pub api_url: String,
    /// Price of one printed side, in minor currency units.
    pub unit_price: u64,
    pub max_quantity: u32,
    /// Pause before navigating to the editor after switching designs.
    pub settle_delay_ms: u64,
    /// Editor route used for login returns and cart line edits.
    pub editor_route: String,
    pub request_timeout_secs: u64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:9000".to_string(),
            unit_price: 2500,
            max_quantity: 10,
            settle_delay_ms: 100,
            editor_route: "/design".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl CartConfig {
    /// Load from a JSON file, then apply environment overrides.
    pub fn from_file(path: &Path) -> CartResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CartError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&json)?;
        config.with_env()
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> CartResult<Self> {
        Self::default().with_env()
    }

    pub fn with_env(self) -> CartResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> CartResult<Self> {
        if let Some(url) = lookup(API_URL_ENV) {
            self.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(price) = lookup(UNIT_PRICE_ENV) {
            self.unit_price = price.trim().parse().map_err(|_| {
                CartError::Config(format!(
                    "{} must be an integer, got {:?}",
                    UNIT_PRICE_ENV, price
                ))
            })?;
        }
        Ok(self)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CartConfig::default();
        assert_eq!(config.max_quantity, 10);
        assert_eq!(config.settle_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_env_overrides() {
        let config = CartConfig::default()
            .with_overrides(|key| match key {
                API_URL_ENV => Some("https://shop.example.com/".to_string()),
                UNIT_PRICE_ENV => Some("1999".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.api_url, "https://shop.example.com");
        assert_eq!(config.unit_price, 1999);
    }

    #[test]
    fn test_bad_price() {
        let result = CartConfig::default()
            .with_overrides(|key| (key == UNIT_PRICE_ENV).then(|| "cheap".to_string()));
        assert!(matches!(result, Err(CartError::Config(_))));
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_quantity": 4, "editor_route": "/studio"}}"#).unwrap();

        let config = CartConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_quantity, 4);
        assert_eq!(config.editor_route, "/studio");
        assert_eq!(config.settle_delay_ms, 100);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CartConfig::from_file(&dir.path().join("cart.json"));
        assert!(matches!(result, Err(CartError::Config(_))));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{max_quantity").unwrap();
        let result = CartConfig::from_file(file.path());
        assert!(matches!(result, Err(CartError::Serialization(_))));
    }
}
