//! Machine configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid machine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for a [`HierarchicalStateMachine`](super::HierarchicalStateMachine).
///
/// Missing fields take their default values.
///
/// # Example
///
/// ```rust
/// use arbor_hsm::machine::MachineConfig;
///
/// let config = MachineConfig::from_json(r#"{ "history_limit": 8 }"#).unwrap();
/// assert_eq!(config.history_limit, 8);
///
/// let config = MachineConfig::from_json("{}").unwrap();
/// assert_eq!(config, MachineConfig::default());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Executed transitions kept in the history. Zero disables recording.
    pub history_limit: usize,
}

impl MachineConfig {
    pub const DEFAULT_HISTORY_LIMIT: usize = 64;

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_json() {
        let error = MachineConfig::from_json(r#"{ "history_limit": -1 }"#).unwrap_err();
        assert!(error
            .to_string()
            .starts_with("Invalid machine configuration"));
    }

    #[test]
    fn serializes_round_trip() {
        let config = MachineConfig::default().with_history_limit(0);
        let json = serde_json::to_string(&config).unwrap();

        assert_eq!(json, r#"{"history_limit":0}"#);
        assert_eq!(MachineConfig::from_json(&json).unwrap(), config);
    }
}
