use async_trait::async_trait;
use qmlsync_store::error::Result;
use qmlsync_store::{FileStatus, ModuleId, ProjectData, ProjectStorage, SourceId, SynchronizationPackage};

/// The part of the project storage the updater talks to.
///
/// [`ProjectStorage`] is the real thing; tests wrap it to observe what a run
/// hands over.
#[async_trait]
pub trait SymbolStorage: Send + Sync {
    /// Id of a module namespace, creating the module on first use.
    async fn module_id(&self, name: &str) -> Result<ModuleId>;

    async fn fetch_module_name(&self, module_id: ModuleId) -> Result<String>;

    /// Files linked to a manifest by the last synchronization.
    async fn fetch_project_datas(&self, project_source_id: SourceId) -> Result<Vec<ProjectData>>;

    /// Status recorded for a file by the last synchronization.
    async fn fetch_file_status(&self, source_id: SourceId) -> Result<Option<FileStatus>>;

    /// Commit one run atomically.
    async fn synchronize(&self, package: &SynchronizationPackage) -> Result<()>;
}

#[async_trait]
impl SymbolStorage for ProjectStorage {
    async fn module_id(&self, name: &str) -> Result<ModuleId> {
        ProjectStorage::module_id(self, name).await
    }

    async fn fetch_module_name(&self, module_id: ModuleId) -> Result<String> {
        ProjectStorage::fetch_module_name(self, module_id).await
    }

    async fn fetch_project_datas(&self, project_source_id: SourceId) -> Result<Vec<ProjectData>> {
        ProjectStorage::fetch_project_datas(self, project_source_id).await
    }

    async fn fetch_file_status(&self, source_id: SourceId) -> Result<Option<FileStatus>> {
        ProjectStorage::fetch_file_status(self, source_id).await
    }

    async fn synchronize(&self, package: &SynchronizationPackage) -> Result<()> {
        ProjectStorage::synchronize(self, package).await
    }
}
