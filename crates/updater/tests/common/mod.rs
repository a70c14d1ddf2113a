#![allow(dead_code)]

use async_trait::async_trait;
use qmlsync_fs::backend::MockBackend;
use qmlsync_store::error::Result as StoreResult;
use qmlsync_store::{
    Database, FileStatus, ModuleId, ProjectData, ProjectStorage, SourceId, SourcePathCache, SynchronizationPackage,
};
use qmlsync_updater::{ProjectUpdater, StaticProject, SymbolStorage};
use std::sync::{Arc, Mutex};

pub const FOO_QMLDIR: &str = "module Foo\ntypeinfo foo.qmltypes\nFooItem 1.0 FooItem.qml\n";
pub const FOO_QMLTYPES: &str = r#"
import QtQuick.tooling 1.2
Module {
    dependencies: ["QtQuick 2.0"]
    Component {
        name: "Bar"
        prototype: "QObject"
        exports: ["Foo/Bar 1.0"]
        Property { name: "count"; type: "int" }
    }
}
"#;
pub const FOO_ITEM: &str = "import QtQuick 2.15\n\nItem {\n    property int count: 0\n    signal clicked()\n}\n";

/// Hands every package to the real storage, keeping a copy.
#[derive(Clone)]
pub struct RecordingStorage {
    inner: ProjectStorage,
    packages: Arc<Mutex<Vec<SynchronizationPackage>>>,
}
impl RecordingStorage {
    pub fn packages(&self) -> Vec<SynchronizationPackage> {
        self.packages.lock().unwrap().clone()
    }

    pub fn last_package(&self) -> SynchronizationPackage {
        self.packages.lock().unwrap().last().cloned().expect("synchronize was never called")
    }
}
#[async_trait]
impl SymbolStorage for RecordingStorage {
    async fn module_id(&self, name: &str) -> StoreResult<ModuleId> {
        self.inner.module_id(name).await
    }

    async fn fetch_module_name(&self, module_id: ModuleId) -> StoreResult<String> {
        self.inner.fetch_module_name(module_id).await
    }

    async fn fetch_project_datas(&self, project_source_id: SourceId) -> StoreResult<Vec<ProjectData>> {
        self.inner.fetch_project_datas(project_source_id).await
    }

    async fn fetch_file_status(&self, source_id: SourceId) -> StoreResult<Option<FileStatus>> {
        self.inner.fetch_file_status(source_id).await
    }

    async fn synchronize(&self, package: &SynchronizationPackage) -> StoreResult<()> {
        self.packages.lock().unwrap().push(package.clone());
        self.inner.synchronize(package).await
    }
}

pub struct Workspace {
    pub db: Database,
    pub fs: Arc<MockBackend>,
    pub paths: SourcePathCache,
    pub storage: ProjectStorage,
    pub recorder: RecordingStorage,
}
impl Workspace {
    pub async fn new<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let db = Database::connect_in_memory().await.unwrap();
        let fs = Arc::new(MockBackend::with_files(files));
        let paths = SourcePathCache::from(&db);
        let storage = ProjectStorage::from(&db);
        let recorder = RecordingStorage { inner: storage.clone(), packages: Arc::default() };
        Self { db, fs, paths, storage, recorder }
    }

    /// The `Foo` module: a manifest, a qmltypes file and one component.
    pub async fn foo() -> Self {
        Self::new([("Foo/qmldir", FOO_QMLDIR), ("Foo/foo.qmltypes", FOO_QMLTYPES), ("Foo/FooItem.qml", FOO_ITEM)]).await
    }

    pub fn updater(&self, qml_dirs: &[&str]) -> ProjectUpdater<StaticProject, RecordingStorage> {
        ProjectUpdater::new(
            StaticProject::new(qml_dirs.iter().copied()),
            self.fs.clone(),
            self.paths.clone(),
            self.recorder.clone(),
        )
    }

    pub async fn id(&self, path: &str) -> SourceId {
        self.paths.source_id(path).await.unwrap()
    }

    pub async fn module(&self, name: &str) -> ModuleId {
        self.storage.module_id(name).await.unwrap()
    }
}
