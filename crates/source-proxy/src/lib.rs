//! Authorizing gatekeeper for object storage
//!
//! `source-proxy` sits in front of an object store. Every request carries an
//! API key; the key resolves to groups, the groups are checked against the
//! requested method and resource, and only then is the request forwarded to
//! the [`Source`](source::Source).
//!
//! # Operations
//!
//! - **Get**: stream an object to the caller
//! - **GetNext**: ask the source which stored name follows a given one
//! - **Export**: store an upload, advancing the numeric run in its filename
//!   first (`report-007.csv` is stored as `report-008.csv`)
//!
//! # Getting Started
//!
//! 1. Implement [`Source`](source::Source) for your object store
//! 2. Create a [`ProxyService`](service::ProxyService) using [`ProxyServiceBuilder`](service::ProxyServiceBuilder)
//! 3. Configure the key resolver, permissions, and metrics sink
//! 4. Serve [`ProxyService::router`](service::ProxyService::router) with axum
//!
//! # Example
//!
//! ```rust,no_run
//! use source_proxy::policy::Policy;
//! use source_proxy::service::ProxyServiceBuilder;
//! use source_proxy::source::MemorySource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (keys, permissions) = Policy::from_file("policy.json")?.into_parts();
//!
//!     let mut builder = ProxyServiceBuilder::new(MemorySource::new());
//!     builder.set_key_resolver(keys);
//!     builder.set_permissions(permissions);
//!     let service = builder.build()?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8014").await?;
//!     axum::serve(listener, service.router()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`service`]: HTTP routes and the service builder
//! - [`proxy`]: operation orchestration
//! - [`auth`]: API keys and group resolution
//! - [`access`]: permission rules and the authorizer
//! - [`resource`]: resource identifiers
//! - [`sequence`]: filename sequence normalization
//! - [`source`]: the storage seam
//! - [`config`]: proxy configuration
//! - [`policy`]: access policy files
//! - [`metrics`]: operation counters
//! - [`spool`]: upload staging

#![allow(
    clippy::bool_assert_comparison,
    clippy::multiple_crate_versions, // Sometimes not fixable
    clippy::module_name_repetitions,
    clippy::single_match_else,
)]

#[macro_use]
mod error;

pub mod access;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod policy;
pub mod proxy;
pub mod resource;
pub mod sequence;
pub mod service;
pub mod source;
pub mod spool;

pub use self::error::*;
pub use self::proxy::Proxy;
pub use self::resource::ResourceId;
pub use self::service::{ProxyService, ProxyServiceBuilder};
