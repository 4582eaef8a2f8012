//! Upload spooling
//!
//! Sources need the total size of an upload before they start writing it,
//! so the request body is first staged in a temporary file.

use crate::error::StdError;

use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt, ReadBuf};

pin_project_lite::pin_project! {
    /// An upload body staged in an anonymous temporary file.
    ///
    /// The file has no name on disk, so it is reclaimed as soon as the spool
    /// is dropped, however the request ends.
    #[derive(Debug)]
    pub struct Spool {
        #[pin]
        file: File,
        len: u64,
    }
}

impl Spool {
    /// Drains `stream` into a new spool, positioned at the start.
    ///
    /// # Errors
    /// Returns an error if the temporary file cannot be created or written,
    /// or if `stream` yields an error.
    pub async fn from_stream<S, E>(stream: S) -> io::Result<Self>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<StdError>,
    {
        let file = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(io::Error::other)??;
        let mut file = File::from_std(file);

        pin_mut!(stream);
        let len = copy_bytes(stream, &mut file).await?;
        file.seek(SeekFrom::Start(0)).await?;

        Ok(Self { file, len })
    }

    /// Spools an in-memory body.
    ///
    /// # Errors
    /// Returns an error if the temporary file cannot be created or written.
    pub async fn from_bytes(data: impl Into<Bytes>) -> io::Result<Self> {
        let data = data.into();
        Self::from_stream(futures::stream::iter([Ok::<_, io::Error>(data)])).await
    }

    /// Total size of the spooled body in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Seeks back to the start of the body.
    ///
    /// # Errors
    /// Returns an error if the underlying seek fails.
    pub async fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).await?;
        Ok(())
    }
}

impl AsyncRead for Spool {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        self.project().file.poll_read(cx, buf)
    }
}

impl AsyncSeek for Spool {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        self.project().file.start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        self.project().file.poll_complete(cx)
    }
}

async fn copy_bytes<S, E, W>(mut stream: S, writer: &mut W) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<StdError>,
    W: AsyncWrite + Unpin,
{
    let mut nwritten: u64 = 0;
    while let Some(result) = stream.next().await {
        let bytes = result.map_err(|e| io::Error::other(e.into()))?;
        writer.write_all(&bytes).await?;
        nwritten += bytes.len() as u64;
    }
    writer.flush().await?;
    Ok(nwritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn spools_chunks() {
        let chunks = ["hello", ", ", "world"].map(|s| Ok::<_, io::Error>(Bytes::from(s)));
        let mut spool = Spool::from_stream(futures::stream::iter(chunks)).await.unwrap();
        assert_eq!(spool.len(), 12);

        let mut buf = String::new();
        spool.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "hello, world");

        spool.rewind().await.unwrap();
        let mut again = Vec::new();
        spool.read_to_end(&mut again).await.unwrap();
        assert_eq!(again, b"hello, world");
    }

    #[tokio::test]
    async fn empty_body() {
        let mut spool = Spool::from_stream(futures::stream::empty::<Result<Bytes, io::Error>>())
            .await
            .unwrap();
        assert!(spool.is_empty());

        let mut buf = Vec::new();
        assert_eq!(spool.read_to_end(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stream_error_is_returned() {
        let chunks = vec![Ok(Bytes::from_static(b"partial")), Err(io::Error::other("client went away"))];
        let err = Spool::from_stream(futures::stream::iter(chunks)).await.err().unwrap();
        assert_eq!(err.to_string(), "client went away");
    }
}
