use source_proxy::source::{Source, SourceError};
use source_proxy::spool::Spool;

use std::io;
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;
use uuid::Uuid;

/// A [`Source`] storing `prefix/filename` as `<root>/<prefix>/<filename>`.
///
/// Uploads are written to a hidden temporary file next to the target and
/// renamed into place, so a reader never sees a partial object. Names
/// starting with `.` are reserved for those temporary files.
#[derive(Debug)]
pub struct FileSystem {
    root: PathBuf,
}

impl FileSystem {
    /// # Errors
    /// Returns an error if `root` cannot be made absolute.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().absolutize()?.into_owned();
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn prefix_dir(&self, prefix: &str) -> io::Result<PathBuf> {
        check_name(prefix)?;
        Ok(self.root.join(prefix))
    }

    fn object_path(&self, prefix: &str, filename: &str) -> io::Result<PathBuf> {
        check_name(filename)?;
        Ok(self.prefix_dir(prefix)?.join(filename))
    }
}

/// Rejects names that would escape their directory or collide with
/// temporary files.
fn check_name(name: &str) -> io::Result<()> {
    let invalid = name.is_empty() || name.starts_with('.') || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("invalid object name: {name:?}")));
    }
    Ok(())
}

fn not_found(err: io::Error) -> SourceError {
    match err.kind() {
        io::ErrorKind::NotFound => SourceError::NotFound,
        _ => SourceError::Io(err),
    }
}

async fn write_file(path: &Path, body: &mut Spool) -> io::Result<u64> {
    let file = fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    let size = tokio::io::copy(body, &mut writer).await?;
    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(size)
}

#[async_trait::async_trait]
impl Source for FileSystem {
    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn store(&self, prefix: &str, filename: &str, body: &mut Spool) -> Result<String, SourceError> {
        let path = self.object_path(prefix, filename)?;
        let dir = self.prefix_dir(prefix)?;
        fs::create_dir_all(&dir).await?;

        let tmp_path = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        let written = match write_file(&tmp_path, body).await {
            Ok(size) => fs::rename(&tmp_path, &path).await.map(|()| size),
            Err(e) => Err(e),
        };

        match written {
            Ok(size) => {
                debug!(path = %path.display(), size, "stored");
                Ok(filename.to_owned())
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                    debug!(path = %tmp_path.display(), error = %cleanup, "error removing temporary file");
                }
                Err(e.into())
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, sink))]
    async fn fetch(
        &self,
        prefix: &str,
        filename: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<(), SourceError> {
        let path = self.object_path(prefix, filename)?;

        let mut file = fs::File::open(&path).await.map_err(not_found)?;
        if !file.metadata().await?.is_file() {
            return Err(SourceError::NotFound);
        }

        let size = tokio::io::copy(&mut file, sink).await?;
        sink.flush().await?;

        debug!(path = %path.display(), size, "fetched");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch_next(&self, prefix: &str, last_filename: &str) -> Result<String, SourceError> {
        let dir = self.prefix_dir(prefix)?;
        let mut entries = fs::read_dir(&dir).await.map_err(not_found)?;

        let mut next: Option<String> = None;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else { continue };
            if name.starts_with('.') || name.as_str() <= last_filename {
                continue;
            }
            if next.as_ref().is_some_and(|n| *n <= name) {
                continue;
            }
            if entry.file_type().await?.is_file() {
                next = Some(name);
            }
        }

        next.ok_or(SourceError::NotFound)
    }
}
