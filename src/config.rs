//! Navigator configuration.
//!
//! All settings have defaults; hosts usually only set `origin` and, for
//! browsers that throttle `replaceState`, `throttled_history`.
//!
//! ```
//! use stacked_navigator::NavigatorConfig;
//!
//! let config = NavigatorConfig::from_json(r#"{ "origin": "https://admin.example.org" }"#).unwrap();
//! assert_eq!(config.max_location_len, 1887);
//!
//! let config = NavigatorConfig::default().with_throttled_history(true);
//! assert_eq!(config.replace_delay().as_millis(), 1000);
//! ```

use crate::location::MAX_LOCATION_LEN;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for a [`Navigator`](crate::Navigator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Origin that relative hrefs and stored `href`s are resolved against.
    pub origin: String,
    /// Longest full location written to the address bar verbatim.
    pub max_location_len: usize,
    /// Delay before a scheduled replace write fires.
    pub replace_delay_ms: u64,
    /// Delay used instead when `throttled_history` is set.
    pub throttled_replace_delay_ms: u64,
    /// The host browser throttles rapid `replaceState` calls.
    pub throttled_history: bool,
    /// Ask the host to reload on popstate once the navigator has faulted.
    pub force_reload_on_fault: bool,
    /// Capacity of the path-match cache.
    pub cache_capacity: usize,
}

impl NavigatorConfig {
    const DEFAULT_ORIGIN: &'static str = "http://localhost";
    const DEFAULT_REPLACE_DELAY_MS: u64 = 100;
    const DEFAULT_THROTTLED_REPLACE_DELAY_MS: u64 = 1000;
    const DEFAULT_CACHE_CAPACITY: usize = 64;

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Delay applied to scheduled replace writes.
    pub fn replace_delay(&self) -> Duration {
        if self.throttled_history {
            Duration::from_millis(self.throttled_replace_delay_ms)
        } else {
            Duration::from_millis(self.replace_delay_ms)
        }
    }

    /// Set the origin.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Set the address bar length ceiling.
    pub fn with_max_location_len(mut self, len: usize) -> Self {
        self.max_location_len = len;
        self
    }

    /// Set the replace delay.
    pub fn with_replace_delay(mut self, delay: Duration) -> Self {
        self.replace_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Mark the host browser as throttling `replaceState`.
    pub fn with_throttled_history(mut self, throttled: bool) -> Self {
        self.throttled_history = throttled;
        self
    }

    /// Enable or disable the reload request after a fault.
    pub fn with_force_reload_on_fault(mut self, enabled: bool) -> Self {
        self.force_reload_on_fault = enabled;
        self
    }

    /// Set the path-match cache capacity (zero disables caching).
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            origin: Self::DEFAULT_ORIGIN.to_string(),
            max_location_len: MAX_LOCATION_LEN,
            replace_delay_ms: Self::DEFAULT_REPLACE_DELAY_MS,
            throttled_replace_delay_ms: Self::DEFAULT_THROTTLED_REPLACE_DELAY_MS,
            throttled_history: false,
            force_reload_on_fault: true,
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NavigatorConfig::default();
        assert_eq!(config.max_location_len, MAX_LOCATION_LEN);
        assert_eq!(config.replace_delay(), Duration::from_millis(100));
        assert!(config.force_reload_on_fault);
    }

    #[test]
    fn test_partial_json() {
        let config =
            NavigatorConfig::from_json(r#"{"replace_delay_ms": 5, "throttled_history": false}"#)
                .unwrap();
        assert_eq!(config.replace_delay(), Duration::from_millis(5));
        assert_eq!(config.origin, "http://localhost");
    }

    #[test]
    fn test_builders() {
        let config = NavigatorConfig::default()
            .with_origin("https://example.org")
            .with_replace_delay(Duration::from_millis(20))
            .with_max_location_len(50)
            .with_cache_capacity(0);
        assert_eq!(config.origin, "https://example.org");
        assert_eq!(config.replace_delay_ms, 20);
        assert_eq!(config.max_location_len, 50);
        assert_eq!(config.cache_capacity, 0);
    }
}
