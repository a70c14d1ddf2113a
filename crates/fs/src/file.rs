//! File metadata returned by filesystem backends.

use std::path::PathBuf;
use time::OffsetDateTime;

/// File metadata returned by listing and `stat` operations.
///
/// Carries exactly what change detection needs: size and modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from the backend root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }

    /// Modification time in nanoseconds since the Unix epoch.
    ///
    /// Saturates at the bounds of `i64` (the year 2262 is somebody else's problem).
    pub fn modified_nanos(&self) -> i64 {
        let nanos = self.modified.unix_timestamp_nanos();
        i64::try_from(nanos).unwrap_or(if nanos < 0 { i64::MIN } else { i64::MAX })
    }

    /// File name component, if it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}
