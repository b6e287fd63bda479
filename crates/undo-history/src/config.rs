/// Configuration for the history system.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// History is unbounded unless a cap is configured.
const DEFAULT_MAX_HISTORY_DEPTH: usize = 0;

/// Environment variable overriding `max_history_depth`.
pub const MAX_DEPTH_ENV: &str = "UNDO_HISTORY_MAX_DEPTH";

/// Configuration for an `UndoManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Max sealed groups in the history stack; the oldest are dropped when
    /// exceeded. `0` (the default) means unbounded.
    pub max_history_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_depth: DEFAULT_MAX_HISTORY_DEPTH,
        }
    }
}

impl HistoryConfig {
    /// A configuration that never evicts history.
    pub fn unbounded() -> Self {
        Self {
            max_history_depth: 0,
        }
    }

    /// A configuration that keeps at most `depth` groups in history.
    pub fn with_max_depth(depth: usize) -> Self {
        Self {
            max_history_depth: depth,
        }
    }

    /// Builds a configuration from defaults and the environment.
    ///
    /// Resolution order:
    /// 1. `UNDO_HISTORY_MAX_DEPTH` environment variable
    /// 2. Built-in default
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set but is not a valid count.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(MAX_DEPTH_ENV) {
            config.max_history_depth = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {MAX_DEPTH_ENV} value: {raw:?}"))?;
        }
        Ok(config)
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse history config")
    }

    /// Whether a history of `len` groups is over the configured cap.
    pub(crate) fn exceeds_depth(&self, len: usize) -> bool {
        self.max_history_depth != 0 && len > self.max_history_depth
    }
}
