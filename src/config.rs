use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cache::DEFAULT_TTL_SECS;
use crate::color::WeightRange;

/// Runtime settings for the dashboard.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "data_source": "https://example.org/ttc/data",
///   "cache_ttl_secs": 300,
///   "debounce_ms": 300
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardConfig {
    /// Directory or `http(s)` base URL the resources are read from.
    #[serde(default = "DashboardConfig::default_data_source")]
    pub data_source: String,
    #[serde(default = "DashboardConfig::default_cache_ttl_secs")]
    pub cache_ttl_secs: i64,
    #[serde(default = "DashboardConfig::default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "DashboardConfig::default_min_line_weight")]
    pub min_line_weight: f64,
    #[serde(default = "DashboardConfig::default_max_line_weight")]
    pub max_line_weight: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_source: Self::default_data_source(),
            cache_ttl_secs: Self::default_cache_ttl_secs(),
            debounce_ms: Self::default_debounce_ms(),
            min_line_weight: Self::default_min_line_weight(),
            max_line_weight: Self::default_max_line_weight(),
        }
    }
}

impl DashboardConfig {
    fn default_data_source() -> String {
        "assets/data".to_string()
    }
    fn default_cache_ttl_secs() -> i64 {
        DEFAULT_TTL_SECS
    }
    fn default_debounce_ms() -> u64 {
        300
    }
    fn default_min_line_weight() -> f64 {
        2.0
    }
    fn default_max_line_weight() -> f64 {
        8.0
    }

    /// Loads the config from a JSON file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Defaults overridden by `DASH_DATA_SOURCE`, `DASH_CACHE_TTL_SECS` and
    /// `DASH_DEBOUNCE_MS`.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(source) = var("DASH_DATA_SOURCE") {
            self.data_source = source;
        }
        if let Some(ttl) = var("DASH_CACHE_TTL_SECS") {
            self.cache_ttl_secs = ttl
                .trim()
                .parse()
                .with_context(|| format!("DASH_CACHE_TTL_SECS is not an integer: {ttl}"))?;
        }
        if let Some(ms) = var("DASH_DEBOUNCE_MS") {
            self.debounce_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("DASH_DEBOUNCE_MS is not an integer: {ms}"))?;
        }
        Ok(self)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs)
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }

    pub fn weights(&self) -> WeightRange {
        WeightRange {
            min: self.min_line_weight,
            max: self.max_line_weight,
        }
    }
}
