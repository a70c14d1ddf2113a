use exn::ResultExt;
use qmlsync_fs::BackendHandle;
use qmlsync_parse::models::ComponentEntry;
use qmlsync_parse::{parse_document, parse_qmldir, parse_qmltypes};
use qmlsync_store::{
    ChangeLevel, ExportedType, FileType, ModuleId, ProjectData, SourceContextId, SourceId, SourcePathCache,
    SynchronizationPackage, Type,
};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{ErrorKind, Result};
use crate::project::ProjectManager;
use crate::status::FileStatusCache;
use crate::storage::SymbolStorage;
use crate::translate;

/// Outcome of comparing a file on disk against the last synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileState {
    Changed,
    NotChanged,
    NotExists,
}

/// Files a filesystem watcher reported as changed, grouped by directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPaths {
    pub source_context_id: SourceContextId,
    pub source_ids: Vec<SourceId>,
}

/// What one [`ProjectUpdater::update`] run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Manifests listed by the project manager
    pub manifests: usize,
    /// Manifests that changed and were parsed
    pub parsed_manifests: usize,
    pub parsed_type_infos: usize,
    pub parsed_documents: usize,
    /// Types handed to the storage
    pub types: usize,
    pub project_datas: usize,
}
impl Display for UpdateSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            concat!(
                "{} manifests ({} parsed), {} qmltypes and {} QML documents parsed, ",
                "{} types and {} project datas synchronized",
            ),
            self.manifests,
            self.parsed_manifests,
            self.parsed_type_infos,
            self.parsed_documents,
            self.types,
            self.project_datas,
        )
    }
}

/// Everything collected during one run, before it is committed.
#[derive(Default)]
struct Run {
    package: SynchronizationPackage,
    not_updated_file_status_source_ids: Vec<SourceId>,
    not_updated_source_ids: Vec<SourceId>,
    summary: UpdateSummary,
}
impl Run {
    fn mark_updated(&mut self, source_id: SourceId) {
        self.package.updated_source_ids.push(source_id);
    }

    /// Forget everything stored for these files unless they turn out to be
    /// unchanged later in the run.
    fn mark_removed(&mut self, source_ids: impl IntoIterator<Item = SourceId>) {
        for source_id in source_ids {
            self.package.updated_source_ids.push(source_id);
            self.package.updated_file_status_source_ids.push(source_id);
        }
    }

    fn finish(mut self) -> (SynchronizationPackage, UpdateSummary) {
        let package = &mut self.package;
        package.updated_source_ids =
            difference(std::mem::take(&mut package.updated_source_ids), self.not_updated_source_ids);
        package.updated_file_status_source_ids = difference(
            std::mem::take(&mut package.updated_file_status_source_ids),
            self.not_updated_file_status_source_ids,
        );
        self.summary.types = package.types.len();
        self.summary.project_datas = package.project_datas.len();
        (self.package, self.summary)
    }
}

/// Sorted, deduplicated `updated \ not_updated`.
fn difference(mut updated: Vec<SourceId>, mut not_updated: Vec<SourceId>) -> Vec<SourceId> {
    updated.sort_unstable();
    updated.dedup();
    not_updated.sort_unstable();
    updated.retain(|id| not_updated.binary_search(id).is_err());
    updated
}

/// Keeps the project storage in sync with the manifests, qmltypes files and
/// QML documents of a workspace.
///
/// Each [`update`](Self::update) looks at every manifest the project manager
/// lists, re-parses only files whose size or modification time differs from
/// what the storage recorded, and commits the result in one
/// [`synchronize`](SymbolStorage::synchronize) call. A run that fails commits
/// nothing.
///
/// Runs take `&mut self`, so two of them can never overlap.
pub struct ProjectUpdater<P, S> {
    project: P,
    fs: BackendHandle,
    paths: SourcePathCache,
    storage: S,
    file_statuses: FileStatusCache,
}
impl<P: ProjectManager, S: SymbolStorage> ProjectUpdater<P, S> {
    pub fn new(project: P, fs: BackendHandle, paths: SourcePathCache, storage: S) -> Self {
        let file_statuses = FileStatusCache::new(fs.clone(), paths.clone());
        Self { project, fs, paths, storage, file_statuses }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Scan every manifest and commit what changed.
    #[instrument(level = "info", skip(self), fields(backend = self.fs.name()))]
    pub async fn update(&mut self) -> Result<UpdateSummary> {
        // Every file is stat'ed at most once per run.
        self.file_statuses.clear();
        let qml_dirs = self.project.qml_dirs().await.or_raise(|| ErrorKind::Project)?;
        let mut run = Run::default();
        run.summary.manifests = qml_dirs.len();
        for qml_dir in &qml_dirs {
            self.update_qml_dir(qml_dir, &mut run).await?;
        }
        let (package, summary) = run.finish();
        debug!(
            updated_sources = package.updated_source_ids.len(),
            updated_file_statuses = package.updated_file_status_source_ids.len(),
            "Synchronizing"
        );
        self.storage.synchronize(&package).await.or_raise(|| ErrorKind::Storage)?;
        info!(%summary, "Update complete");
        Ok(summary)
    }

    /// Run an update if any of the reported files really changed.
    ///
    /// Returns whether an update ran.
    #[instrument(level = "debug", skip_all, fields(groups = id_paths.len()))]
    pub async fn paths_with_ids_changed(&mut self, id_paths: &[IdPaths]) -> Result<bool> {
        let source_ids: Vec<SourceId> = id_paths.iter().flat_map(|group| group.source_ids.iter().copied()).collect();
        if source_ids.is_empty() {
            return Ok(false);
        }
        let modified = self.file_statuses.modified(&source_ids).await?;
        if modified.is_empty() {
            debug!("Reported files are unchanged");
            return Ok(false);
        }
        debug!(modified = modified.len(), "Reported files changed");
        self.update().await?;
        Ok(true)
    }

    async fn file_state(&mut self, source_id: SourceId, run: &mut Run) -> Result<FileState> {
        let Some(current) = self.file_statuses.find(source_id).await? else {
            return Ok(FileState::NotExists);
        };
        // A status that cannot be stored (e.g. a pre-epoch mtime) counts as unreadable.
        if !current.is_valid() {
            warn!(%source_id, size = current.size, last_modified = current.last_modified, "Invalid file status");
            return Ok(FileState::NotExists);
        }
        let stored = self.storage.fetch_file_status(source_id).await.or_raise(|| ErrorKind::Storage)?;
        if stored.is_some_and(|stored| stored.is_valid() && stored == current) {
            run.not_updated_file_status_source_ids.push(source_id);
            return Ok(FileState::NotChanged);
        }
        run.package.file_statuses.push(current);
        run.package.updated_file_status_source_ids.push(source_id);
        Ok(FileState::Changed)
    }

    #[instrument(level = "debug", skip(self, run))]
    async fn update_qml_dir(&mut self, qml_dir: &Path, run: &mut Run) -> Result<()> {
        let qml_dir_id = self.paths.source_id(qml_dir).await.or_raise(|| ErrorKind::Storage)?;
        let state = self.file_state(qml_dir_id, run).await?;
        trace!(source_id = %qml_dir_id, ?state, "Classified manifest");
        match state {
            FileState::Changed => {
                let text = self.fs.read_to_string(qml_dir).await.or_raise(|| ErrorKind::FileSystem)?;
                let manifest = parse_qmldir(&text);
                run.summary.parsed_manifests += 1;
                run.mark_updated(qml_dir_id);

                let directory_id = self.paths.source_context_id_of(qml_dir_id).await.or_raise(|| ErrorKind::Storage)?;
                let module_id = self.storage.module_id(&manifest.module).await.or_raise(|| ErrorKind::Storage)?;
                let previous = self.fetch_project_datas(qml_dir_id).await?;
                run.mark_removed(previous.iter().map(|data| data.source_id));

                for file_name in &manifest.type_infos {
                    let source_id = self.source_id_in(directory_id, file_name).await?;
                    let data = ProjectData::new(qml_dir_id, source_id, module_id, FileType::QmlTypes);
                    run.package.project_datas.push(data);
                    self.update_type_info(&data, Some(&manifest.module), run).await?;
                }
                for entry in translate::dedup_components(manifest.components) {
                    self.update_component(&entry, qml_dir_id, directory_id, module_id, run).await?;
                }
                run.package.updated_project_source_ids.push(qml_dir_id);
            },
            FileState::NotChanged => {
                let project_datas = self.fetch_project_datas(qml_dir_id).await?;
                for data in project_datas.iter().filter(|data| data.file_type == FileType::QmlTypes) {
                    self.update_type_info(data, None, run).await?;
                }
                for data in project_datas.iter().filter(|data| data.file_type == FileType::QmlDocument) {
                    self.revalidate_component(data, run).await?;
                }
            },
            FileState::NotExists => {
                debug!(source_id = %qml_dir_id, "Manifest does not exist");
                let previous = self.fetch_project_datas(qml_dir_id).await?;
                run.mark_removed(std::iter::once(qml_dir_id).chain(previous.iter().map(|data| data.source_id)));
            },
        }
        Ok(())
    }

    /// Classify and, if it changed, parse a qmltypes file.
    ///
    /// `namespace` is the manifest's module when it was just parsed; otherwise
    /// it is looked up from the stored project data.
    async fn update_type_info(&mut self, data: &ProjectData, namespace: Option<&str>, run: &mut Run) -> Result<()> {
        let path = self.source_path(data.source_id).await?;
        match self.file_state(data.source_id, run).await? {
            FileState::Changed => {
                run.mark_updated(data.source_id);
                let text = self.fs.read_to_string(&path).await.or_raise(|| ErrorKind::FileSystem)?;
                let info = parse_qmltypes(&text).or_raise(|| ErrorKind::CannotParseQmlTypes(path.clone()))?;
                let namespace = match namespace {
                    Some(namespace) => namespace.to_string(),
                    None => self.storage.fetch_module_name(data.module_id).await.or_raise(|| ErrorKind::Storage)?,
                };
                let package = &mut run.package;
                translate::type_info(
                    &self.storage,
                    info,
                    data.source_id,
                    &namespace,
                    &mut package.imports,
                    &mut package.types,
                )
                .await
                .or_raise(|| ErrorKind::Storage)?;
                run.summary.parsed_type_infos += 1;
                debug!(path = %path.display(), "Parsed qmltypes");
            },
            FileState::NotChanged => run.not_updated_source_ids.push(data.source_id),
            FileState::NotExists => exn::bail!(ErrorKind::CannotParseQmlTypes(path)),
        }
        Ok(())
    }

    /// A component declared by a manifest that was just parsed.
    async fn update_component(
        &mut self,
        entry: &ComponentEntry,
        qml_dir_id: SourceId,
        directory_id: SourceContextId,
        module_id: ModuleId,
        run: &mut Run,
    ) -> Result<()> {
        let source_id = self.source_id_in(directory_id, &entry.file_name).await?;
        let path = self.source_path(source_id).await?;
        let type_name = translate::component_type_name(&entry.file_name);
        let mut ty = match self.file_state(source_id, run).await? {
            FileState::Changed => self.parse_component(&path, type_name, source_id, run).await?,
            FileState::NotChanged => {
                let mut ty = Type::new(type_name, source_id);
                ty.change_level = ChangeLevel::Minimal;
                ty
            },
            FileState::NotExists => exn::bail!(ErrorKind::CannotParseQmlDocument(path)),
        };
        run.package.project_datas.push(ProjectData::new(qml_dir_id, source_id, module_id, FileType::QmlDocument));
        run.mark_updated(source_id);
        ty.exported_types.push(ExportedType::new(module_id, entry.type_name.clone(), entry.version));
        run.package.types.push(ty);
        Ok(())
    }

    /// A component linked to a manifest that did not change. Its exported
    /// names stay as stored.
    async fn revalidate_component(&mut self, data: &ProjectData, run: &mut Run) -> Result<()> {
        let path = self.source_path(data.source_id).await?;
        match self.file_state(data.source_id, run).await? {
            FileState::Changed => {
                run.mark_updated(data.source_id);
                let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
                let type_name = translate::component_type_name(file_name);
                let mut ty = self.parse_component(&path, type_name, data.source_id, run).await?;
                ty.change_level = ChangeLevel::ExcludeExportedTypes;
                run.package.types.push(ty);
            },
            FileState::NotChanged => {},
            FileState::NotExists => exn::bail!(ErrorKind::CannotParseQmlDocument(path)),
        }
        Ok(())
    }

    async fn parse_component(
        &self,
        path: &Path,
        type_name: String,
        source_id: SourceId,
        run: &mut Run,
    ) -> Result<Type> {
        let text = self.fs.read_to_string(path).await.or_raise(|| ErrorKind::FileSystem)?;
        let document = parse_document(&text).or_raise(|| ErrorKind::CannotParseQmlDocument(path.to_path_buf()))?;
        let ty = translate::document(&self.storage, document, type_name, source_id, &mut run.package.imports)
            .await
            .or_raise(|| ErrorKind::Storage)?;
        run.summary.parsed_documents += 1;
        debug!(path = %path.display(), "Parsed QML document");
        Ok(ty)
    }

    async fn fetch_project_datas(&self, qml_dir_id: SourceId) -> Result<Vec<ProjectData>> {
        self.storage.fetch_project_datas(qml_dir_id).await.or_raise(|| ErrorKind::Storage)
    }

    async fn source_id_in(&self, directory_id: SourceContextId, file_name: &str) -> Result<SourceId> {
        self.paths.source_id_in(directory_id, file_name).await.or_raise(|| ErrorKind::Storage)
    }

    async fn source_path(&self, source_id: SourceId) -> Result<PathBuf> {
        self.paths.source_path(source_id).await.or_raise(|| ErrorKind::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<SourceId> {
        raw.iter().copied().map(SourceId).collect()
    }

    #[test]
    fn test_difference_is_sorted_and_unique() {
        let result = difference(ids(&[5, 3, 3, 1, 7, 5]), ids(&[7, 2]));
        assert_eq!(result, ids(&[1, 3, 5]));
    }

    #[test]
    fn test_difference_removes_every_occurrence() {
        let result = difference(ids(&[4, 4, 4]), ids(&[4]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_run_finish_filters_both_lists() {
        let mut run = Run::default();
        run.mark_removed(ids(&[1, 2, 3]));
        run.mark_updated(SourceId(4));
        run.not_updated_source_ids = ids(&[2]);
        run.not_updated_file_status_source_ids = ids(&[3]);
        let (package, _) = run.finish();
        assert_eq!(package.updated_source_ids, ids(&[1, 3, 4]));
        assert_eq!(package.updated_file_status_source_ids, ids(&[1, 2]));
    }
}
