//! API keys and group resolution
//!
//! The proxy does not validate API keys itself. A [`KeyResolver`] maps a key
//! to the groups it belongs to, and the access layer decides what those
//! groups may do.
//!
//! # Example
//!
//! ```
//! use source_proxy::auth::{ApiKey, KeyResolver, SimpleKeyResolver};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut keys = SimpleKeyResolver::new();
//! keys.insert("key-0001", ["readers"]);
//!
//! let groups = keys.groups(&ApiKey::from("key-0001")).await;
//! assert!(groups.contains("readers"));
//!
//! // Unknown keys resolve to no groups rather than an error.
//! assert!(keys.groups(&ApiKey::from("nope")).await.is_empty());
//! # }
//! ```

mod api_key;
pub use self::api_key::ApiKey;

mod simple_resolver;
pub use self::simple_resolver::SimpleKeyResolver;

use std::collections::BTreeSet;

/// The groups an API key belongs to. May be empty.
pub type GroupSet = BTreeSet<String>;

/// API key to group resolution.
#[async_trait::async_trait]
pub trait KeyResolver: Send + Sync + 'static {
    /// Returns the groups of `api_key`.
    ///
    /// Lookup failures are not errors: implementations return an empty set,
    /// and the permission check then decides what a caller without groups
    /// may do.
    async fn groups(&self, api_key: &ApiKey) -> GroupSet;
}
