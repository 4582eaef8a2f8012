//! Access control
//!
//! This module decides whether a request may reach the source.
//!
//! # Overview
//!
//! - [`PermissionEvaluator`]: the `(method, resource, groups) -> bool` predicate
//! - [`SimplePermissions`]: an in-memory rule list implementing it
//! - [`Authorizer`]: the gate run before every object operation
//!
//! # Example
//!
//! ```
//! use source_proxy::access::{Authorizer, SimplePermissions};
//! use source_proxy::auth::SimpleKeyResolver;
//! use source_proxy::ProxyErrorCode;
//! use http::Method;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let keys = SimpleKeyResolver::from_single("key-0001", ["readers"]);
//! let mut permissions = SimplePermissions::new();
//! permissions.allow("tenant-a/*", "readers", ["GET"]);
//!
//! let authorizer = Authorizer::new(keys, permissions);
//!
//! let resource = authorizer.authorize("key-0001", &Method::GET, "tenant-a", "file.csv").await.unwrap();
//! assert_eq!(resource.as_str(), "tenant-a/file.csv");
//!
//! let err = authorizer.authorize("key-0001", &Method::PUT, "tenant-a", "file.csv").await.unwrap_err();
//! assert_eq!(err.code(), ProxyErrorCode::Forbidden);
//! # }
//! ```

mod authorizer;
pub use self::authorizer::Authorizer;

mod simple_permissions;
pub use self::simple_permissions::{Rule, SimplePermissions, WILDCARD};

use crate::auth::GroupSet;
use crate::resource::ResourceId;

use http::Method;

/// Group-based permission predicate.
///
/// Implementations may read from policy state they own and update; the
/// proxy calls [`can`](Self::can) once per request and never caches the answer.
#[async_trait::async_trait]
pub trait PermissionEvaluator: Send + Sync + 'static {
    /// Returns whether any of `groups` may perform `method` on `resource`.
    ///
    /// `groups` may be empty.
    async fn can(&self, method: &Method, resource: &ResourceId, groups: &GroupSet) -> bool;
}
