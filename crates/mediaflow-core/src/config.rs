//! Queue configuration.
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults
//! 2. the `system` section of a JSON config file (`mediaflow_config.json`)
//! 3. `MEDIAFLOW_SYSTEM__*` environment variables

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};

use crate::error::MediaflowError;

const SECTION: &str = "system";
const ENV_PREFIX: &str = "MEDIAFLOW_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Upper bound on concurrently Processing tasks.
    #[serde(rename = "max_concurrent_tasks")]
    pub max_workers: usize,

    /// Period of the scheduling pass.
    #[serde(rename = "scheduler_tick_ms")]
    pub tick_interval_ms: u64,

    /// Buffer size for `ChannelEventSink`.
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            tick_interval_ms: 100,
            event_capacity: 256,
        }
    }
}

impl QueueConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_tick_interval(mut self, tick: Duration) -> Self {
        self.tick_interval_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Load defaults, then `path` (if it exists), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, MediaflowError> {
        let mut figment = Self::defaults();
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Figment seeded with the built-in defaults under the `system` key.
    pub fn defaults() -> Figment {
        Figment::from(Serialized::default(SECTION, QueueConfig::default()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, MediaflowError> {
        let config: QueueConfig = figment.extract_inner(SECTION)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MediaflowError> {
        if self.max_workers == 0 {
            return Err(MediaflowError::InvalidConfig(
                "max_concurrent_tasks must be at least 1".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(MediaflowError::InvalidConfig(
                "scheduler_tick_ms must be at least 1".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(MediaflowError::InvalidConfig(
                "event_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn built_in_defaults() {
        let config = QueueConfig::from_figment(QueueConfig::defaults()).unwrap();
        assert_eq!(config, QueueConfig::default());
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn system_section_overrides_defaults() {
        let json = r#"{
            "system": { "max_concurrent_tasks": 2, "cache_size_mb": 1024 },
            "ui": { "theme": "dark" }
        }"#;
        let config =
            QueueConfig::from_figment(QueueConfig::defaults().merge(Json::string(json))).unwrap();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.tick_interval_ms, 100);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let json = r#"{ "system": { "max_concurrent_tasks": 0 } }"#;
        let err = QueueConfig::from_figment(QueueConfig::defaults().merge(Json::string(json)))
            .unwrap_err();
        assert!(matches!(err, MediaflowError::InvalidConfig(_)));
    }

    #[test]
    fn wrong_type_is_a_load_error() {
        let json = r#"{ "system": { "scheduler_tick_ms": "fast" } }"#;
        let err = QueueConfig::from_figment(QueueConfig::defaults().merge(Json::string(json)))
            .unwrap_err();
        assert!(matches!(err, MediaflowError::ConfigLoad(_)));
    }

    #[test]
    fn load_reads_file_and_tolerates_missing_one() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "system": {{ "scheduler_tick_ms": 25 }} }}"#).unwrap();

        let config = QueueConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.tick_interval_ms, 25);

        let missing = file.path().with_extension("absent.json");
        let config = QueueConfig::load(Some(&missing)).unwrap();
        assert_eq!(config.tick_interval_ms, 100);
    }
}
