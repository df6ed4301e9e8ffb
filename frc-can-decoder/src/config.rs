//! Session configuration types
//!
//! This module defines the small set of knobs the sessions, the live monitor
//! and the replay scheduler need. Hosts usually deserialize it from their own
//! configuration file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by sessions and the polling loops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// API codes to drop before they touch the controller registry
    #[serde(default)]
    pub ignored_apis: Vec<u16>,

    /// Seconds without a sighting before a live controller goes offline
    #[serde(default = "default_offline_threshold")]
    pub offline_threshold_secs: f64,

    /// Maximum frames read from the transport per poll
    #[serde(default = "default_max_read_per_poll")]
    pub max_read_per_poll: usize,

    /// Fixed wait between ticks of the live and replay loops
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_offline_threshold() -> f64 {
    1.0
}

fn default_max_read_per_poll() -> usize {
    100
}

fn default_tick_interval() -> u64 {
    250
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ignored_apis: Vec::new(),
            offline_threshold_secs: default_offline_threshold(),
            max_read_per_poll: default_max_read_per_poll(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: ignore an API code
    pub fn ignore_api(mut self, api: u16) -> Self {
        if !self.ignored_apis.contains(&api) {
            self.ignored_apis.push(api);
        }
        self
    }

    /// Builder method: set the offline threshold
    pub fn with_offline_threshold(mut self, secs: f64) -> Self {
        self.offline_threshold_secs = secs;
        self
    }

    /// Builder method: set the per-poll read bound
    pub fn with_max_read_per_poll(mut self, count: usize) -> Self {
        self.max_read_per_poll = count;
        self
    }

    /// Builder method: set the tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Check if frames with this API are filtered out
    pub fn is_ignored_api(&self, api: u16) -> bool {
        self.ignored_apis.contains(&api)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new()
            .ignore_api(0x3FF)
            .ignore_api(0x3FF)
            .ignore_api(0x000)
            .with_offline_threshold(2.5)
            .with_max_read_per_poll(16)
            .with_tick_interval(Duration::from_millis(100));

        assert_eq!(config.ignored_apis, vec![0x3FF, 0x000]);
        assert_eq!(config.offline_threshold_secs, 2.5);
        assert_eq!(config.max_read_per_poll, 16);
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_filter_logic() {
        let config = SessionConfig::new().ignore_api(0x061);

        assert!(config.is_ignored_api(0x061));
        assert!(!config.is_ignored_api(0x060));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{ "ignored_apis": [5] }"#).unwrap();
        assert_eq!(config.ignored_apis, vec![5]);
        assert_eq!(config.offline_threshold_secs, 1.0);
        assert_eq!(config.max_read_per_poll, 100);
        assert_eq!(config.tick_interval_ms, 250);
    }
}
