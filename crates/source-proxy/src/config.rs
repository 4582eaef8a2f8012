//! Proxy configuration
//!
//! # Example
//! ```
//! use source_proxy::config::ProxyConfig;
//!
//! let config = ProxyConfig::default();
//! assert_eq!(config.match_expression, "[0-9]+");
//!
//! let config = ProxyConfig::from_json(r#"{"match_expression": "-([0-9]+)\\.csv$"}"#).unwrap();
//! assert_eq!(config.match_expression, "-([0-9]+)\\.csv$");
//! ```

use crate::sequence::DEFAULT_MATCH_EXPRESSION;

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Proxy configuration.
///
/// Read once at startup. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ProxyConfig {
    /// Regular expression locating the numeric run of a filename.
    ///
    /// If the expression has a capture group, the first group is the run;
    /// otherwise the whole match is.
    ///
    /// Only the leftmost match is used. A pattern that can match the empty
    /// string, such as `[0-9]*`, matches empty at the start of every name
    /// that does not begin with a digit, and such names are stored unchanged.
    ///
    /// Default: `[0-9]+`
    pub match_expression: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            match_expression: DEFAULT_MATCH_EXPRESSION.to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading config file")]
    Io(#[from] io::Error),
    #[error("error parsing config")]
    Json(#[from] serde_json::Error),
}

impl ProxyConfig {
    /// Parses a JSON config document.
    ///
    /// # Errors
    /// Returns an error if `s` is not a valid config document.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.match_expression, "[0-9]+");
    }

    #[test]
    fn test_serde_default_values() {
        let config = ProxyConfig::from_json("{}").expect("deserialize failed");
        assert_eq!(config, ProxyConfig::default());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ProxyConfig {
            match_expression: "v([0-9]+)".to_owned(),
        };
        let json = serde_json::to_string(&config).expect("serialize failed");
        let deserialized = ProxyConfig::from_json(&json).expect("deserialize failed");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_invalid_json() {
        let err = ProxyConfig::from_json(r#"{"match_expression": 7}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"match_expression": "[0-9]{3}"}"#).unwrap();

        let config = ProxyConfig::from_file(&path).unwrap();
        assert_eq!(config.match_expression, "[0-9]{3}");

        let err = ProxyConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
