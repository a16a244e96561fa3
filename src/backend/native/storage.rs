//! Saving response bodies into platform storage directories

use crate::options::Directory;
use crate::{Error, Result};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};

const APP_DIR: &str = "nativehttp";

/// Filesystem roots that [`Directory`] values resolve against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRoots {
    /// User documents
    pub documents: PathBuf,
    /// Private application files
    pub files: PathBuf,
    /// Private cache
    pub cache: PathBuf,
    /// Application files on shared storage
    pub external_files: PathBuf,
    /// Root of shared storage
    pub external_storage: PathBuf,
    /// Cache on shared storage
    pub external_cache: PathBuf,
}

impl Default for DirectoryRoots {
    fn default() -> Self {
        Self::for_app(APP_DIR)
    }
}

impl DirectoryRoots {
    /// Platform directories for an application called `app`
    pub fn for_app(app: &str) -> Self {
        let fallback = std::env::temp_dir().join(app);
        let or_fallback = |dir: Option<PathBuf>, sub: &str| match dir {
            Some(dir) => dir.join(app),
            None => fallback.join(sub),
        };

        Self {
            documents: dirs::document_dir().unwrap_or_else(|| fallback.join("documents")),
            files: or_fallback(dirs::data_dir(), "files"),
            cache: or_fallback(dirs::cache_dir(), "cache"),
            external_files: or_fallback(dirs::data_local_dir(), "external"),
            external_storage: dirs::home_dir().unwrap_or_else(|| fallback.join("storage")),
            external_cache: or_fallback(dirs::cache_dir(), "external-cache").join("external"),
        }
    }

    /// Every root below `base`, one subdirectory each
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            documents: base.join("documents"),
            files: base.join("files"),
            cache: base.join("cache"),
            external_files: base.join("external"),
            external_storage: base.join("external-storage"),
            external_cache: base.join("external-cache"),
        }
    }

    /// Root for a save directory
    pub fn resolve(&self, directory: Directory) -> &Path {
        match directory {
            Directory::Documents => &self.documents,
            Directory::Cache | Directory::Temporary => &self.cache,
            Directory::External => &self.external_files,
            Directory::ExternalStorage => &self.external_storage,
            Directory::ExternalCache => &self.external_cache,
            Directory::Data | Directory::Library | Directory::LibraryNoCloud => &self.files,
        }
    }
}

/// Reject names that would escape the save directory
pub(crate) fn validate_file_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(Error::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// `<millis>.bin`, used when the caller gives no file name
pub(crate) fn default_file_name() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}.bin", millis)
}

/// Stream a response body into `directory/file_name`, creating the directory.
///
/// A partially written file is removed when reading or writing fails.
pub(crate) async fn save_response(
    response: reqwest::Response,
    directory: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    save_stream(response.bytes_stream(), directory, file_name).await
}

async fn save_stream<S, E>(stream: S, directory: &Path, file_name: &str) -> Result<PathBuf>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<Error>,
{
    validate_file_name(file_name)?;

    tokio::fs::create_dir_all(directory).await.map_err(|e| {
        tracing::error!("Failed to create {}: {}", directory.display(), e);
        Error::WritePermissionDenied {
            path: directory.to_path_buf(),
        }
    })?;

    let path = directory.join(file_name);
    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        tracing::error!("Failed to create {}: {}", path.display(), e);
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            Error::WritePermissionDenied {
                path: directory.to_path_buf(),
            }
        } else {
            Error::Io(e)
        }
    })?;

    let written = match write_chunks(stream, &mut file).await {
        Ok(written) => written,
        Err(e) => {
            drop(file);
            if let Err(remove) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Failed to remove partial {}: {}", path.display(), remove);
            }
            return Err(e);
        }
    };

    tracing::debug!("Saved {} bytes to {}", written, path.display());
    Ok(path)
}

/// Copy every chunk into `writer` and flush; returns the byte count
async fn write_chunks<S, E, W>(mut stream: S, writer: &mut W) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<Error>,
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::other("no space left")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn chunks(
        items: Vec<std::io::Result<&'static str>>,
    ) -> impl Stream<Item = std::io::Result<Bytes>> + Unpin {
        futures_util::stream::iter(
            items
                .into_iter()
                .map(|item| item.map(Bytes::from))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn chunks_are_written_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_stream(chunks(vec![Ok("hello "), Ok("world")]), dir.path(), "out.txt")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello world");
    }

    #[tokio::test]
    async fn write_failures_are_reported() {
        let result = write_chunks(chunks(vec![Ok("data")]), &mut FullDisk).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn partial_file_is_removed_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let stream = chunks(vec![
            Ok("partial"),
            Err(std::io::Error::other("connection reset")),
        ]);

        let result = save_stream(stream, dir.path(), "broken.bin").await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!dir.path().join("broken.bin").exists());
    }

    #[test]
    fn directories_resolve_to_roots() {
        let roots = DirectoryRoots::under("/base");
        assert_eq!(roots.resolve(Directory::Documents), Path::new("/base/documents"));
        assert_eq!(roots.resolve(Directory::Temporary), Path::new("/base/cache"));
        assert_eq!(roots.resolve(Directory::Cache), Path::new("/base/cache"));
        assert_eq!(roots.resolve(Directory::External), Path::new("/base/external"));
        assert_eq!(
            roots.resolve(Directory::ExternalStorage),
            Path::new("/base/external-storage")
        );
        assert_eq!(
            roots.resolve(Directory::ExternalCache),
            Path::new("/base/external-cache")
        );
        for directory in [Directory::Data, Directory::Library, Directory::LibraryNoCloud] {
            assert_eq!(roots.resolve(directory), Path::new("/base/files"));
        }
    }

    #[test]
    fn file_names_cannot_escape() {
        assert!(validate_file_name("report.pdf").is_ok());
        assert!(validate_file_name(".hidden").is_ok());
        for name in ["", ".", "..", "../x", "a/b", "a\\b"] {
            assert!(
                matches!(validate_file_name(name), Err(Error::InvalidFileName(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn default_name_is_millis() {
        let name = default_file_name();
        let stem = name.strip_suffix(".bin").unwrap();
        assert!(stem.parse::<u128>().unwrap() > 0);
    }
}
