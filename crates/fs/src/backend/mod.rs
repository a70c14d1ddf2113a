//! Filesystem backend trait and implementations.
//!
//! The updater only ever reads: it enumerates manifests, stats files for
//! change detection and reads their text. Writes exist for tooling and tests.

mod local;
#[cfg(feature = "mock")]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for filesystem readers.
///
/// All operations are asynchronous. Paths are relative to the backend root
/// and must be validated using [`validate_path`](crate::validate_path) before
/// use; implementations enforce this.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use qmlsync_fs::{FileSystem, error::Result};
///
/// async fn manifest(fs: &dyn FileSystem) -> Result<Option<String>> {
///     let path = Path::new("QtQuick/qmldir");
///     if fs.exists(path).await? {
///         Ok(Some(fs.read_to_string(path).await?))
///     } else {
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata matching an optional prefix, recursively.
    ///
    /// The prefix is matched per path component: `"Foo/Sub"` matches
    /// `"Foo/Sub/qmldir"` but not `"Foo/Subdir/qmldir"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use qmlsync_fs::{FileSystem, error::Result};
    /// # async fn example(fs: &dyn FileSystem) -> Result<()> {
    /// let mut stream = fs.list_stream(None);
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read file contents as UTF-8 text.
    ///
    /// Returns [`InvalidEncoding`](crate::error::ErrorKind::InvalidEncoding)
    /// if the content is not valid UTF-8.
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|_| exn::Exn::from(ErrorKind::InvalidEncoding(path.to_path_buf())))
    }

    /// Write file contents, creating parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
