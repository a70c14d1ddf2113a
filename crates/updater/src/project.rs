//! Sources of the manifest list.

use async_trait::async_trait;
use exn::ResultExt;
use futures::TryStreamExt;
use qmlsync_fs::BackendHandle;
use std::path::PathBuf;
use tracing::{debug, instrument};

use crate::error::{ErrorKind, Result};

/// File name every module manifest carries.
pub const QMLDIR: &str = "qmldir";

/// Enumerates the module manifests that belong to a workspace.
#[async_trait]
pub trait ProjectManager: Send + Sync {
    /// Workspace-relative paths of every `qmldir` file, called once per run.
    async fn qml_dirs(&self) -> Result<Vec<PathBuf>>;
}

#[async_trait]
impl<P: ProjectManager + ?Sized> ProjectManager for Box<P> {
    async fn qml_dirs(&self) -> Result<Vec<PathBuf>> {
        (**self).qml_dirs().await
    }
}

/// A fixed list of manifests.
#[derive(Debug, Clone, Default)]
pub struct StaticProject {
    qml_dirs: Vec<PathBuf>,
}
impl StaticProject {
    pub fn new(qml_dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self { qml_dirs: qml_dirs.into_iter().map(Into::into).collect() }
    }
}
#[async_trait]
impl ProjectManager for StaticProject {
    async fn qml_dirs(&self) -> Result<Vec<PathBuf>> {
        Ok(self.qml_dirs.clone())
    }
}

/// Every file named `qmldir` below an optional prefix of the filesystem.
pub struct DiscoveredProject {
    fs: BackendHandle,
    prefix: Option<PathBuf>,
}
impl DiscoveredProject {
    pub fn new(fs: BackendHandle) -> Self {
        Self { fs, prefix: None }
    }

    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}
#[async_trait]
impl ProjectManager for DiscoveredProject {
    #[instrument(level = "debug", skip(self), fields(backend = self.fs.name()))]
    async fn qml_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut qml_dirs: Vec<PathBuf> = self
            .fs
            .list_stream(self.prefix.as_deref())
            .try_filter_map(|info| async move { Ok((info.file_name() == Some(QMLDIR)).then_some(info.path)) })
            .try_collect()
            .await
            .or_raise(|| ErrorKind::FileSystem)?;
        // Walk order depends on the backend.
        qml_dirs.sort();
        debug!(count = qml_dirs.len(), "Discovered manifests");
        Ok(qml_dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmlsync_fs::backend::MockBackend;
    use std::sync::Arc;

    fn backend() -> BackendHandle {
        Arc::new(MockBackend::with_files([
            ("qmldir", "module Root\n"),
            ("Foo/qmldir", "module Foo\n"),
            ("Foo/FooItem.qml", "Item {}"),
            ("Foo/Sub/qmldir", "module Foo.Sub\n"),
            ("Bar/not-a-qmldir", ""),
            ("Bar/qmldir.bak", ""),
        ]))
    }

    #[tokio::test]
    async fn test_static_project() {
        let project = StaticProject::new(["Foo/qmldir", "Bar/qmldir"]);
        assert_eq!(
            project.qml_dirs().await.unwrap(),
            vec![PathBuf::from("Foo/qmldir"), PathBuf::from("Bar/qmldir")]
        );
    }

    #[tokio::test]
    async fn test_discovers_every_qmldir() {
        let project = DiscoveredProject::new(backend());
        assert_eq!(
            project.qml_dirs().await.unwrap(),
            vec![PathBuf::from("Foo/Sub/qmldir"), PathBuf::from("Foo/qmldir"), PathBuf::from("qmldir")]
        );
    }

    #[tokio::test]
    async fn test_discovery_under_prefix() {
        let project = DiscoveredProject::new(backend()).with_prefix("Foo/Sub");
        assert_eq!(project.qml_dirs().await.unwrap(), vec![PathBuf::from("Foo/Sub/qmldir")]);
    }

    #[tokio::test]
    async fn test_boxed_project() {
        let project: Box<dyn ProjectManager> = Box::new(StaticProject::new(["qmldir"]));
        assert_eq!(project.qml_dirs().await.unwrap(), vec![PathBuf::from("qmldir")]);
    }
}
