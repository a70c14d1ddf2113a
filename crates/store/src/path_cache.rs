//! Interning of file and directory paths as integer ids.

use exn::{OptionExt, ResultExt};
use qmlsync_fs::{split_path, validate_path};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::instrument;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::types::{SourceContextId, SourceId};

#[derive(Debug, Default)]
struct Entries {
    context_ids: HashMap<PathBuf, SourceContextId>,
    context_paths: HashMap<SourceContextId, PathBuf>,
    source_ids: HashMap<(SourceContextId, String), SourceId>,
    sources: HashMap<SourceId, (SourceContextId, String)>,
}

/// Maps workspace-relative paths to [`SourceId`]s and directories to
/// [`SourceContextId`]s, and back.
///
/// Ids are assigned by the database the first time a path is seen and never
/// change or get reused afterwards. Lookups are served from memory once a
/// path or id has been resolved; clones share the same memory.
///
/// Paths are normalised first, so `Foo/./Bar/qmldir` and `Foo/Bar/qmldir`
/// share an id. Files at the workspace root live in the context `""`.
#[derive(Debug, Clone)]
pub struct SourcePathCache {
    pool: SqlitePool,
    // Never held across an await point.
    entries: Arc<RwLock<Entries>>,
}
impl From<&Database> for SourcePathCache {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}
impl SourcePathCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, entries: Arc::default() }
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn normalise_directory(directory: &Path) -> Result<PathBuf> {
        if directory.components().all(|c| matches!(c, Component::CurDir | Component::RootDir)) {
            return Ok(PathBuf::new());
        }
        validate_path(directory).or_raise(|| ErrorKind::InvalidPath(directory.to_path_buf()))
    }

    fn is_plain_file_name(name: &str) -> bool {
        !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
    }

    /// Id of a directory, assigning one if the directory is new.
    #[instrument(level = "trace", skip_all, fields(directory = %directory.as_ref().display()))]
    pub async fn source_context_id(&self, directory: impl AsRef<Path>) -> Result<SourceContextId> {
        let directory = Self::normalise_directory(directory.as_ref())?;
        if let Some(id) = self.read().context_ids.get(&directory) {
            return Ok(*id);
        }
        let path = directory.to_str().ok_or_raise(|| ErrorKind::InvalidPath(directory.clone()))?;
        let id: SourceContextId = sqlx::query_scalar(include_str!("../queries/upsert_source_context.sql"))
            .bind(path)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut entries = self.write();
        entries.context_paths.insert(id, directory.clone());
        entries.context_ids.insert(directory, id);
        Ok(id)
    }

    /// Id of a file, assigning one (and one for its directory) if the file is new.
    #[instrument(level = "trace", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn source_id(&self, path: impl AsRef<Path>) -> Result<SourceId> {
        let path = path.as_ref();
        let (directory, name) = split_path(path).or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))?;
        let context_id = self.source_context_id(&directory).await?;
        self.intern_source(context_id, name).await
    }

    /// Id of `file_name` inside the directory `context_id`.
    ///
    /// `file_name` may itself contain directories (`controls/Button.qml`),
    /// in which case the id is the same as for the joined path.
    pub async fn source_id_in(&self, context_id: SourceContextId, file_name: &str) -> Result<SourceId> {
        if Self::is_plain_file_name(file_name) {
            return self.intern_source(context_id, file_name.to_string()).await;
        }
        let joined = self.source_context_path(context_id).await?.join(file_name);
        let (directory, name) = split_path(&joined).or_raise(|| ErrorKind::InvalidPath(joined.clone()))?;
        let context_id = self.source_context_id(&directory).await?;
        self.intern_source(context_id, name).await
    }

    async fn intern_source(&self, context_id: SourceContextId, name: String) -> Result<SourceId> {
        let key = (context_id, name);
        if let Some(id) = self.read().source_ids.get(&key) {
            return Ok(*id);
        }
        let id: SourceId = sqlx::query_scalar(include_str!("../queries/upsert_source.sql"))
            .bind(context_id)
            .bind(&key.1)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut entries = self.write();
        entries.sources.insert(id, key.clone());
        entries.source_ids.insert(key, id);
        Ok(id)
    }

    /// Directory of a file.
    pub async fn source_context_id_of(&self, source_id: SourceId) -> Result<SourceContextId> {
        Ok(self.source(source_id).await?.0)
    }

    /// Path of a directory, `""` for the workspace root.
    pub async fn source_context_path(&self, context_id: SourceContextId) -> Result<PathBuf> {
        if let Some(path) = self.read().context_paths.get(&context_id) {
            return Ok(path.clone());
        }
        let path: Option<String> = sqlx::query_scalar(include_str!("../queries/get_source_context_path.sql"))
            .bind(context_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let path = path.ok_or_raise(|| ErrorKind::UnknownId { kind: "source context", id: context_id.0 })?;
        let path = PathBuf::from(path);
        let mut entries = self.write();
        entries.context_ids.insert(path.clone(), context_id);
        entries.context_paths.insert(context_id, path.clone());
        Ok(path)
    }

    /// Full workspace-relative path of a file.
    pub async fn source_path(&self, source_id: SourceId) -> Result<PathBuf> {
        let (context_id, name) = self.source(source_id).await?;
        Ok(self.source_context_path(context_id).await?.join(name))
    }

    async fn source(&self, source_id: SourceId) -> Result<(SourceContextId, String)> {
        if let Some(source) = self.read().sources.get(&source_id) {
            return Ok(source.clone());
        }
        let row: Option<(SourceContextId, String, String)> = sqlx::query_as(include_str!("../queries/get_source.sql"))
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let (context_id, context_path, name) =
            row.ok_or_raise(|| ErrorKind::UnknownId { kind: "source", id: source_id.0 })?;
        let mut entries = self.write();
        let context_path = PathBuf::from(context_path);
        entries.context_ids.insert(context_path.clone(), context_id);
        entries.context_paths.insert(context_id, context_path);
        entries.source_ids.insert((context_id, name.clone()), source_id);
        entries.sources.insert(source_id, (context_id, name.clone()));
        Ok((context_id, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn cache() -> (Database, SourcePathCache) {
        let db = Database::connect_in_memory().await.unwrap();
        let cache = SourcePathCache::from(&db);
        (db, cache)
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (_db, cache) = cache().await;
        let id = cache.source_id("Foo/Bar/qmldir").await.unwrap();
        assert!(id.is_valid());
        assert_eq!(cache.source_path(id).await.unwrap(), Path::new("Foo/Bar/qmldir"));
        let context_id = cache.source_context_id_of(id).await.unwrap();
        assert_eq!(cache.source_context_path(context_id).await.unwrap(), Path::new("Foo/Bar"));
        assert_eq!(cache.source_context_id("Foo/Bar").await.unwrap(), context_id);
    }

    #[rstest]
    #[case("Foo/./Bar/qmldir")]
    #[case("Foo//Bar/qmldir")]
    #[case("Foo/Baz/../Bar/qmldir")]
    #[case("/Foo/Bar/qmldir")]
    #[tokio::test]
    async fn test_equivalent_spellings_share_an_id(#[case] spelling: &str) {
        let (_db, cache) = cache().await;
        let id = cache.source_id("Foo/Bar/qmldir").await.unwrap();
        assert_eq!(cache.source_id(spelling).await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_distinct_paths_get_distinct_ids() {
        let (_db, cache) = cache().await;
        let a = cache.source_id("Foo/A.qml").await.unwrap();
        let b = cache.source_id("Foo/B.qml").await.unwrap();
        let c = cache.source_id("Bar/A.qml").await.unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.source_context_id_of(a).await.unwrap(), cache.source_context_id_of(b).await.unwrap());
    }

    #[tokio::test]
    async fn test_root_level_file() {
        let (_db, cache) = cache().await;
        let id = cache.source_id("qmldir").await.unwrap();
        let context_id = cache.source_context_id_of(id).await.unwrap();
        assert_eq!(cache.source_context_path(context_id).await.unwrap(), Path::new(""));
        assert_eq!(cache.source_context_id("").await.unwrap(), context_id);
        assert_eq!(cache.source_context_id(".").await.unwrap(), context_id);
        assert_eq!(cache.source_path(id).await.unwrap(), Path::new("qmldir"));
    }

    #[tokio::test]
    async fn test_source_id_in_context() {
        let (_db, cache) = cache().await;
        let context_id = cache.source_context_id("Foo").await.unwrap();
        let id = cache.source_id_in(context_id, "FooItem.qml").await.unwrap();
        assert_eq!(cache.source_id("Foo/FooItem.qml").await.unwrap(), id);
        let nested = cache.source_id_in(context_id, "controls/Button.qml").await.unwrap();
        assert_eq!(cache.source_id("Foo/controls/Button.qml").await.unwrap(), nested);
        assert!(cache.source_id_in(context_id, "../../escape.qml").await.is_err());
    }

    #[tokio::test]
    async fn test_ids_survive_a_new_cache() {
        let (db, cache) = cache().await;
        let id = cache.source_id("Foo/qmldir").await.unwrap();
        let fresh = SourcePathCache::from(&db);
        assert_eq!(fresh.source_path(id).await.unwrap(), Path::new("Foo/qmldir"));
        assert_eq!(fresh.source_id("Foo/qmldir").await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let (_db, cache) = cache().await;
        let err = cache.source_path(SourceId(999)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownId { kind: "source", id: 999 }));
        let err = cache.source_context_path(SourceContextId(999)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownId { .. }));
    }

    #[tokio::test]
    async fn test_invalid_paths() {
        let (_db, cache) = cache().await;
        assert!(cache.source_id("../qmldir").await.is_err());
        assert!(cache.source_id("").await.is_err());
    }
}
