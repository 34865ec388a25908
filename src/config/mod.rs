//! Task configuration: work delay and default naming.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```
//! use mailtask::config::TaskConfig;
//!
//! let config = TaskConfig::from_json(r#"{ "delay_ms": 50 }"#).unwrap();
//! assert_eq!(config.delay_ms, 50);
//! assert_eq!(config.name_prefix, "background-task");
//! ```

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default simulated cost of sending one email.
pub const DEFAULT_DELAY_MS: u64 = 200;

/// Prefix used to name tasks that were not given an explicit name.
pub const DEFAULT_NAME_PREFIX: &str = "background-task";

/// Errors produced while loading a [`TaskConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid task config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables shared by every [`BackgroundTask`](crate::background::BackgroundTask)
/// built from it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Length of the bounded delay inside `run()`, in milliseconds.
    pub delay_ms: u64,
    /// Prefix for generated task names (`"{prefix}-{n}"`).
    pub name_prefix: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            name_prefix: DEFAULT_NAME_PREFIX.to_owned(),
        }
    }
}

impl TaskConfig {
    /// Parses a config from a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document is not valid JSON or a
    /// field has the wrong type.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Sets the delay.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the delay as a [`Duration`].
    pub fn delay_duration(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
