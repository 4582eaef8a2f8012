use super::{Source, SourceError};

use crate::spool::Spool;

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

type Key = (String, String);

/// A [`Source`] keeping every object in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    objects: Mutex<BTreeMap<Key, Bytes>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<Key, Bytes>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an object directly, bypassing the proxy.
    pub fn insert(&self, prefix: &str, filename: &str, data: impl Into<Bytes>) {
        self.objects().insert((prefix.to_owned(), filename.to_owned()), data.into());
    }

    #[must_use]
    pub fn get(&self, prefix: &str, filename: &str) -> Option<Bytes> {
        self.objects().get(&(prefix.to_owned(), filename.to_owned())).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }
}

#[async_trait::async_trait]
impl Source for MemorySource {
    async fn store(&self, prefix: &str, filename: &str, body: &mut Spool) -> Result<String, SourceError> {
        let mut data = Vec::with_capacity(usize::try_from(body.len()).unwrap_or_default());
        body.read_to_end(&mut data).await?;
        self.insert(prefix, filename, data);
        Ok(filename.to_owned())
    }

    async fn fetch(
        &self,
        prefix: &str,
        filename: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), SourceError> {
        let data = self.get(prefix, filename).ok_or(SourceError::NotFound)?;
        sink.write_all(&data).await?;
        sink.flush().await?;
        Ok(())
    }

    async fn fetch_next(&self, prefix: &str, last_filename: &str) -> Result<String, SourceError> {
        let after = (prefix.to_owned(), last_filename.to_owned());
        let objects = self.objects();
        let next = objects
            .range((Bound::Excluded(after), Bound::Unbounded))
            .next()
            .filter(|((p, _), _)| p == prefix)
            .map(|((_, filename), _)| filename.clone());
        next.ok_or(SourceError::NotFound)
    }
}
