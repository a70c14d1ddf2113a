//! In-memory filesystem backend for testing.

use super::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use crate::FileSystem;

/// In-memory filesystem backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation.
///
/// Every write moves the file's modification time strictly forward, even
/// when the wall clock has not ticked, so change detection in tests never
/// misses a rewrite.
///
/// # Examples
///
/// ```
/// use qmlsync_fs::backend::MockBackend;
/// use qmlsync_fs::FileSystem;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("Foo/qmldir", "module Foo\nFooItem 1.0 FooItem.qml\n"),
/// ]);
/// assert!(backend.exists(Path::new("Foo/qmldir")).await?);
///
/// backend.write(Path::new("Foo/FooItem.qml"), b"Item {}").await?;
/// assert!(backend.exists(Path::new("Foo/FooItem.qml")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, (OffsetDateTime, Vec<u8>)>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = OffsetDateTime::now_utc();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                // MockBackend is intended to be used in tests; panics are
                // expected. There is no error result.
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Bump the modification time of a file without changing its content.
    pub async fn touch(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        let mut guard = self.storage.write().await;
        let (modified, _) = guard.get_mut(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        *modified = Self::next_modified(Some(*modified));
        Ok(())
    }

    fn next_modified(previous: Option<OffsetDateTime>) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        match previous {
            Some(previous) if previous >= now => previous + Duration::nanoseconds(1),
            _ => now,
        }
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl FileSystem for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<FileInfo> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(path, _)| match &validated_prefix {
                        Some(pfx) => path.starts_with(pfx),
                        None => true,
                    })
                    .map(|(path, (modified, data))| FileInfo::new(path.clone(), data.len() as u64, *modified))
                    .collect()
            };
            for info in entries {
                yield Ok(info);
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let (_modified, data) =
            self.storage.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(data)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        let mut guard = self.storage.write().await;
        let modified = Self::next_modified(guard.get(&path).map(|(modified, _)| *modified));
        guard.insert(path, (modified, data.to_vec()));
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let (modified, data) = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(FileInfo::new(path.clone(), data.len() as u64, *modified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.write(Path::new("Foo/qmldir"), b"module Foo").await.unwrap();
        let data = backend.read(Path::new("Foo/qmldir")).await.unwrap();
        assert_eq!(data, b"module Foo");
    }

    #[tokio::test]
    async fn test_with_files() {
        let backend = MockBackend::with_files([("Foo/qmldir", "module Foo"), ("Bar/qmldir", "module Bar")]);
        assert!(backend.exists(Path::new("Foo/qmldir")).await.unwrap());
        assert!(backend.exists(Path::new("./Bar/qmldir")).await.unwrap());
        assert!(!backend.exists(Path::new("Baz/qmldir")).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("missing.qml")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rewrite_moves_modified_forward() {
        let backend = MockBackend::default();
        let path = Path::new("Foo/FooItem.qml");
        backend.write(path, b"Item {}").await.unwrap();
        let first = backend.stat(path).await.unwrap();
        backend.write(path, b"Item {}").await.unwrap();
        let second = backend.stat(path).await.unwrap();
        assert!(second.modified > first.modified);
        backend.touch(path).await.unwrap();
        let third = backend.stat(path).await.unwrap();
        assert!(third.modified > second.modified);
        assert_eq!(third.size, 7);
    }

    #[tokio::test]
    async fn test_touch_not_found() {
        let backend = MockBackend::default();
        let err = backend.touch(Path::new("missing.qml")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MockBackend::default();
        backend.write(Path::new("file.qml"), b"data").await.unwrap();
        backend.delete(Path::new("file.qml")).await.unwrap();
        assert!(!backend.exists(Path::new("file.qml")).await.unwrap());
        let err = backend.delete(Path::new("file.qml")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let backend = MockBackend::with_files([
            ("Foo/qmldir", "a"),
            ("Foo/FooItem.qml", "b"),
            ("Foobar/qmldir", "c"),
        ]);
        let files = backend.list(Some(Path::new("Foo"))).await.unwrap();
        assert_eq!(files.len(), 2);
        let paths: Vec<_> = files.iter().map(|f| &f.path).collect();
        assert!(paths.contains(&&PathBuf::from("Foo/qmldir")));
        assert!(paths.contains(&&PathBuf::from("Foo/FooItem.qml")));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape"), b"bad").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", "bad")]);
    }
}
