//! The storage source behind the proxy
//!
//! [`Source`] is the seam to the real object store. [`MemorySource`] keeps
//! objects in memory and is meant for tests and development.

mod memory;
pub use self::memory::MemorySource;

use crate::error::StdError;
use crate::spool::Spool;

use std::io;
use std::sync::Arc;

use tokio::io::AsyncWrite;

/// A failure reported by a [`Source`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Other(StdError),
}

impl SourceError {
    pub fn other(err: impl Into<StdError>) -> Self {
        Self::Other(err.into())
    }
}

/// Object storage the proxy forwards to.
///
/// Objects are addressed by `(prefix, filename)`. Implementations are the
/// sole arbiter of consistency for concurrent writes to the same name.
#[async_trait::async_trait]
pub trait Source: Send + Sync + 'static {
    /// Stores `body` as `prefix`/`filename` and returns the name it was
    /// stored under, which may differ from `filename`.
    ///
    /// `body` is positioned at its start and [`Spool::len`] is its size.
    async fn store(&self, prefix: &str, filename: &str, body: &mut Spool) -> Result<String, SourceError>;

    /// Writes the object `prefix`/`filename` into `sink`.
    async fn fetch(
        &self,
        prefix: &str,
        filename: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), SourceError>;

    /// Returns the first stored name under `prefix` that sorts after
    /// `last_filename`. An empty `last_filename` asks for the first name.
    ///
    /// Returns [`SourceError::NotFound`] when there is no such name.
    async fn fetch_next(&self, prefix: &str, last_filename: &str) -> Result<String, SourceError>;
}

#[async_trait::async_trait]
impl<T: Source> Source for Arc<T> {
    async fn store(&self, prefix: &str, filename: &str, body: &mut Spool) -> Result<String, SourceError> {
        (**self).store(prefix, filename, body).await
    }

    async fn fetch(
        &self,
        prefix: &str,
        filename: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), SourceError> {
        (**self).fetch(prefix, filename, sink).await
    }

    async fn fetch_next(&self, prefix: &str, last_filename: &str) -> Result<String, SourceError> {
        (**self).fetch_next(prefix, last_filename).await
    }
}
