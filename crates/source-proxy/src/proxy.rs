//! Request orchestration
//!
//! [`Proxy`] runs the three object operations against a [`Source`]. It
//! performs no access control; callers run the
//! [`Authorizer`](crate::access::Authorizer) first.

use crate::error::{ProxyError, ProxyResult, StdError};
use crate::metrics::{Operation, OperationGuard, ProxyMetrics};
use crate::sequence::FilenameSequence;
use crate::source::{Source, SourceError};
use crate::spool::Spool;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncWrite;
use tracing::debug;

pub struct Proxy {
    source: Box<dyn Source>,
    sequence: FilenameSequence,
    metrics: Arc<dyn ProxyMetrics>,
}

impl Proxy {
    #[must_use]
    pub fn new(source: impl Source, sequence: FilenameSequence, metrics: Arc<dyn ProxyMetrics>) -> Self {
        Self::from_parts(Box::new(source), sequence, metrics)
    }

    pub(crate) fn from_parts(source: Box<dyn Source>, sequence: FilenameSequence, metrics: Arc<dyn ProxyMetrics>) -> Self {
        Self {
            source,
            sequence,
            metrics,
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &dyn ProxyMetrics {
        &*self.metrics
    }

    /// Stores `body` under `prefix`, advancing the numeric run of `filename`
    /// first, and returns the name the source assigned.
    ///
    /// # Errors
    /// Returns `StorageWriteFailed` if the body cannot be spooled or the
    /// source rejects it.
    #[tracing::instrument(level = "debug", skip(self, body))]
    pub async fn store<S, E>(&self, prefix: &str, filename: &str, body: S) -> ProxyResult<String>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Into<StdError>,
    {
        let guard = OperationGuard::start(&*self.metrics, Operation::Store);

        let filename = self.sequence.normalize(filename);

        let mut spool = Spool::from_stream(body)
            .await
            .map_err(|e| proxy_error!(e, StorageWriteFailed, "error spooling {prefix}/{filename}"))?;

        let new_filename = self
            .source
            .store(prefix, &filename, &mut spool)
            .await
            .map_err(|e| proxy_error!(e, StorageWriteFailed, "error exporting {prefix}/{filename}"))?;

        debug!(size = spool.len(), %new_filename, "exported");
        guard.complete();
        Ok(new_filename)
    }

    /// Streams `prefix`/`filename` into `sink`.
    ///
    /// # Errors
    /// Returns `NotFound` if the source has no such object and
    /// `StorageReadFailed` for any other source failure.
    #[tracing::instrument(level = "debug", skip(self, sink))]
    pub async fn fetch(&self, prefix: &str, filename: &str, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> ProxyResult {
        let guard = OperationGuard::start(&*self.metrics, Operation::Fetch);

        self.source
            .fetch(prefix, filename, sink)
            .await
            .map_err(|e| read_error(e, "error getting", prefix, filename))?;

        guard.complete();
        Ok(())
    }

    /// Returns the stored name following `last_filename` under `prefix`.
    ///
    /// This asks the source; it never guesses from the filename sequence.
    ///
    /// # Errors
    /// Returns `NotFound` if nothing follows `last_filename` and
    /// `StorageReadFailed` for any other source failure.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_next(&self, prefix: &str, last_filename: &str) -> ProxyResult<String> {
        let guard = OperationGuard::start(&*self.metrics, Operation::FetchNext);

        let next_filename = self
            .source
            .fetch_next(prefix, last_filename)
            .await
            .map_err(|e| read_error(e, "error getting next filename", prefix, last_filename))?;

        guard.complete();
        Ok(next_filename)
    }
}

fn read_error(err: SourceError, context: &str, prefix: &str, filename: &str) -> ProxyError {
    match err {
        SourceError::NotFound => proxy_error!(NotFound, "{context}: {prefix}/{filename} not found"),
        err => proxy_error!(err, StorageReadFailed, "{context}: {prefix}/{filename}"),
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}
