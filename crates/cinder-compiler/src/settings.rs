//! Evaluator configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings for an [`Evaluator`](crate::Evaluator).
///
/// Every field has a default, so a JSON document only needs the keys it
/// changes:
///
/// ```json
/// { "max_call_depth": 200, "default_usings": ["System"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// File name shown in diagnostics.
    pub file_name: String,
    /// Namespaces brought into scope before the first chunk.
    pub default_usings: Vec<String>,
    /// Maximum nesting of method calls before a stack-overflow fault.
    pub max_call_depth: usize,
    /// Stack size of the executor thread, in bytes.
    pub executor_stack_size: usize,
    pub executor_thread_name: String,
    /// How long a variable snapshot waits for a running unit to release a
    /// field, in milliseconds.
    pub snapshot_timeout_ms: u64,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            file_name: "{interactive}".to_string(),
            default_usings: vec!["System".to_string()],
            max_call_depth: 1000,
            executor_stack_size: 256 * 1024 * 1024,
            executor_thread_name: "cinder-exec".to_string(),
            snapshot_timeout_ms: 50,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl EvaluatorSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let settings = EvaluatorSettings::from_json_str(r#"{ "max_call_depth": 64 }"#).unwrap();
        assert_eq!(
            settings,
            EvaluatorSettings {
                max_call_depth: 64,
                ..EvaluatorSettings::default()
            }
        );
    }

    #[test]
    fn empty_object_is_the_default() {
        let settings = EvaluatorSettings::from_json_str("{}").unwrap();
        assert_eq!(settings, EvaluatorSettings::default());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EvaluatorSettings::from_json_str("{ max_call_depth: }").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EvaluatorSettings::from_path("/nonexistent/cinder.json").unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/cinder.json"));
    }
}
