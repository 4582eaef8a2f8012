//! Access policy files
//!
//! A policy file lists the known API keys with their groups, and the rules
//! granting groups access to resources:
//!
//! ```json
//! {
//!     "api_keys": { "key-0001": ["readers"], "key-0002": ["readers", "writers"] },
//!     "rules": [
//!         { "resource": "tenant-a/*", "group": "readers", "methods": ["GET"] },
//!         { "resource": "tenant-a/*", "group": "writers", "methods": ["PUT"] }
//!     ]
//! }
//! ```

use crate::access::{Rule, SimplePermissions};
use crate::auth::SimpleKeyResolver;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub api_keys: BTreeMap<String, Vec<String>>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("error reading policy file")]
    Io(#[from] io::Error),
    #[error("error parsing policy")]
    Json(#[from] serde_json::Error),
}

impl Policy {
    /// Parses a JSON policy document.
    ///
    /// # Errors
    /// Returns an error if `s` is not a valid policy document.
    pub fn from_json(s: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads a JSON policy file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    #[must_use]
    pub fn into_parts(self) -> (SimpleKeyResolver, SimplePermissions) {
        let mut keys = SimpleKeyResolver::new();
        for (api_key, groups) in self.api_keys {
            keys.insert(api_key, groups);
        }
        (keys, SimplePermissions::from_rules(self.rules))
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("api_keys", &self.api_keys.len())
            .field("rules", &self.rules)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::auth::{ApiKey, KeyResolver};
    use crate::resource::address;

    use http::Method;

    const POLICY: &str = r#"{
        "api_keys": { "key-0001": ["readers"], "key-0002": ["readers", "writers"] },
        "rules": [
            { "resource": "tenant-a/*", "group": "readers", "methods": ["GET"] },
            { "resource": "tenant-a/*", "group": "writers", "methods": ["PUT"] }
        ]
    }"#;

    #[tokio::test]
    async fn into_parts() {
        let policy = Policy::from_json(POLICY).unwrap();
        let (keys, permissions) = policy.into_parts();
        assert_eq!(keys.len(), 2);

        let readers = keys.groups(&ApiKey::from("key-0001")).await;
        let writers = keys.groups(&ApiKey::from("key-0002")).await;
        let resource = address("tenant-a", "file.csv").unwrap();

        assert!(permissions.check(&Method::GET, &resource, &readers));
        assert!(!permissions.check(&Method::PUT, &resource, &readers));
        assert!(permissions.check(&Method::PUT, &resource, &writers));
    }

    #[test]
    fn empty_document() {
        let policy = Policy::from_json("{}").unwrap();
        assert_eq!(policy, Policy::default());
    }

    #[test]
    fn debug_hides_keys() {
        let policy = Policy::from_json(POLICY).unwrap();
        let debug = format!("{policy:?}");
        assert!(!debug.contains("key-0001"));
    }

    #[test]
    fn malformed() {
        let err = Policy::from_json(r#"{"rules": [{"group": "x"}]}"#).unwrap_err();
        assert!(matches!(err, PolicyError::Json(_)));
    }
}
