//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between the last drag update and its durable write.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Settings shared by the storage engine and the widget controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Directory for file-backed storage. `None` keeps records in memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Debounce delay for position updates.
    #[serde(default = "CanvasConfig::default_debounce", with = "millis")]
    pub debounce: Duration,
    /// Finish delete animations instantly.
    #[serde(default)]
    pub reduced_motion: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            debounce: DEFAULT_DEBOUNCE,
            reduced_motion: false,
        }
    }
}

impl CanvasConfig {
    const fn default_debounce() -> Duration {
        DEFAULT_DEBOUNCE
    }

    /// Build a config from the environment, falling back to defaults.
    ///
    /// - `CANVAS_DATA_DIR`: storage directory
    /// - `CANVAS_DEBOUNCE_MS`: debounce delay in milliseconds
    /// - `CANVAS_REDUCED_MOTION`: `1`/`true` to skip delete animations
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup("CANVAS_DATA_DIR")
                .filter(|d| !d.is_empty())
                .map(PathBuf::from),
            debounce: lookup("CANVAS_DEBOUNCE_MS")
                .and_then(|ms| ms.parse().ok())
                .map_or(defaults.debounce, Duration::from_millis),
            reduced_motion: lookup("CANVAS_REDUCED_MOTION")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }

    /// Builder method to set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Builder method to set the debounce delay.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Builder method to set the reduced-motion preference.
    #[must_use]
    pub fn with_reduced_motion(mut self, reduced_motion: bool) -> Self {
        self.reduced_motion = reduced_motion;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CanvasConfig::from_lookup(lookup(&[]));
        assert_eq!(config, CanvasConfig::default());
        assert_eq!(config.debounce, Duration::from_millis(500));
    }

    #[test]
    fn test_env_overrides() {
        let config = CanvasConfig::from_lookup(lookup(&[
            ("CANVAS_DATA_DIR", "/tmp/canvas"),
            ("CANVAS_DEBOUNCE_MS", "250"),
            ("CANVAS_REDUCED_MOTION", "TRUE"),
        ]));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/canvas")));
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert!(config.reduced_motion);
    }

    #[test]
    fn test_bad_debounce_falls_back() {
        let config = CanvasConfig::from_lookup(lookup(&[("CANVAS_DEBOUNCE_MS", "soon")]));
        assert_eq!(config.debounce, DEFAULT_DEBOUNCE);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CanvasConfig =
            serde_json::from_str(r#"{"debounce": 120}"#).expect("parse");
        assert_eq!(config.debounce, Duration::from_millis(120));
        assert!(config.data_dir.is_none());
        assert!(!config.reduced_motion);
    }
}
