//! Size and modification time lookups for change detection.

use exn::ResultExt;
use qmlsync_fs::BackendHandle;
use qmlsync_fs::error::ErrorKind as FsErrorKind;
use qmlsync_store::{FileStatus, SourceId, SourcePathCache};
use std::collections::HashMap;
use tracing::trace;

use crate::error::{ErrorKind, Result};

/// Remembers the on-disk [`FileStatus`] of every file it has been asked about.
///
/// Entries are filled lazily through the filesystem's `stat`, so each file is
/// looked at once until the entry is refreshed or the cache cleared. A file
/// that does not exist is remembered as `None`.
pub struct FileStatusCache {
    fs: BackendHandle,
    paths: SourcePathCache,
    entries: HashMap<SourceId, Option<FileStatus>>,
}
impl FileStatusCache {
    pub fn new(fs: BackendHandle, paths: SourcePathCache) -> Self {
        Self { fs, paths, entries: HashMap::new() }
    }

    async fn read_status(&self, source_id: SourceId) -> Result<Option<FileStatus>> {
        let path = self.paths.source_path(source_id).await.or_raise(|| ErrorKind::Storage)?;
        match self.fs.stat(&path).await {
            Ok(info) => {
                let size = i64::try_from(info.size).unwrap_or(i64::MAX);
                Ok(Some(FileStatus::new(source_id, size, info.modified_nanos())))
            },
            Err(err) if matches!(&*err, FsErrorKind::NotFound(_)) => {
                trace!(%source_id, path = %path.display(), "File does not exist");
                Ok(None)
            },
            Err(err) => Err(err.raise(ErrorKind::FileSystem)),
        }
    }

    /// Current status of a file, or `None` if it does not exist.
    pub async fn find(&mut self, source_id: SourceId) -> Result<Option<FileStatus>> {
        if let Some(entry) = self.entries.get(&source_id) {
            return Ok(*entry);
        }
        let status = self.read_status(source_id).await?;
        self.entries.insert(source_id, status);
        Ok(status)
    }

    /// Modification time in nanoseconds since the Unix epoch.
    pub async fn last_modified(&mut self, source_id: SourceId) -> Result<Option<i64>> {
        Ok(self.find(source_id).await?.map(|status| status.last_modified))
    }

    pub async fn file_size(&mut self, source_id: SourceId) -> Result<Option<i64>> {
        Ok(self.find(source_id).await?.map(|status| status.size))
    }

    /// Re-read a file's status from disk.
    pub async fn update(&mut self, source_id: SourceId) -> Result<()> {
        let status = self.read_status(source_id).await?;
        self.entries.insert(source_id, status);
        Ok(())
    }

    pub async fn update_many(&mut self, source_ids: impl IntoIterator<Item = SourceId>) -> Result<()> {
        for source_id in source_ids {
            self.update(source_id).await?;
        }
        Ok(())
    }

    /// Re-read the given files and return those whose status differs from
    /// the cached one. Files the cache has never seen count as modified.
    ///
    /// A repeated id is reported at most once, since its second read matches
    /// the entry the first one stored.
    pub async fn modified(&mut self, source_ids: &[SourceId]) -> Result<Vec<SourceId>> {
        let mut modified = Vec::new();
        for &source_id in source_ids {
            let status = self.read_status(source_id).await?;
            if self.entries.insert(source_id, status) != Some(status) {
                modified.push(source_id);
            }
        }
        Ok(modified)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
