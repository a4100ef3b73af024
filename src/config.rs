//! Session configuration with layered loading.
//!
//! Defaults cover the interactive sweet spot (200 ms debounce and
//! coalescing, 30/15 result limits); embedders can override them from a
//! file or `MEDLEY_`-prefixed environment variables.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::session::SearchScope;

/// Recognized aggregator options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Delay before a pattern or scope edit triggers a rebuild.
    pub debounce_ms: u64,
    /// Window over which add/remove notifications are batched. Zero
    /// delivers every notification immediately.
    pub coalesce_ms: u64,
    /// Per-provider result limit when a single provider is scoped.
    pub single_provider_limit: usize,
    /// Per-provider result limit when all providers are merged.
    pub merged_limit: usize,
    /// Page size for "load more". Defaults to the scope's limit.
    pub page_size: Option<usize>,
    /// Run providers one at a time on a single worker instead of the
    /// parallel pool.
    pub serial_search: bool,
    /// Worker pool size for the parallel strategy. Defaults to the
    /// machine's available parallelism.
    pub parallel_workers: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            coalesce_ms: 200,
            single_provider_limit: 30,
            merged_limit: 15,
            page_size: None,
            serial_search: false,
            parallel_workers: None,
        }
    }
}

impl SearchConfig {
    /// Load configuration from the environment only.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an optional file, then let
    /// `MEDLEY_`-prefixed environment variables override it.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }
        builder
            .add_source(Environment::with_prefix("MEDLEY"))
            .build()?
            .try_deserialize()
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }

    /// Result limit for the given scope.
    #[must_use]
    pub fn limit_for(&self, scope: &SearchScope) -> usize {
        match scope {
            SearchScope::All => self.merged_limit,
            SearchScope::Single(_) => self.single_provider_limit,
        }
    }

    /// Page size for "load more" in the given scope.
    #[must_use]
    pub fn page_size_for(&self, scope: &SearchScope) -> usize {
        self.page_size.unwrap_or_else(|| self.limit_for(scope))
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn defaults_match_the_interactive_profile() {
        let config = SearchConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(200));
        assert_eq!(config.coalesce_window(), Duration::from_millis(200));
        assert_eq!(config.limit_for(&SearchScope::Single("files")), 30);
        assert_eq!(config.limit_for(&SearchScope::All), 15);
        assert_eq!(config.page_size_for(&SearchScope::All), 15);
        assert!(!config.serial_search);
    }

    #[test]
    fn file_values_override_defaults() {
        let config: SearchConfig = Config::builder()
            .add_source(File::from_str(
                "debounce_ms = 50\nserial_search = true\npage_size = 10",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert!(config.serial_search);
        assert_eq!(config.page_size_for(&SearchScope::Single("files")), 10);
        // untouched fields keep their defaults
        assert_eq!(config.merged_limit, 15);
    }
}
