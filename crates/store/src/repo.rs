use exn::{OptionExt, ResultExt};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{ExportedTypeRow, ImportRow, ProjectDataRow, TypeRow, version_to_columns};
use crate::types::{
    ChangeLevel, ExportedType, ExportedTypeName, FileStatus, Import, ModuleId, ProjectData, SourceId,
    SynchronizationPackage, Type, TypeId,
};

/// Module ids, file statuses, project datas, types and imports.
///
/// Reads go straight to the pool. The only write is [`ProjectStorage::synchronize`],
/// which applies a whole [`SynchronizationPackage`] or nothing.
#[derive(Debug, Clone)]
pub struct ProjectStorage {
    pool: SqlitePool,
}
impl From<&Database> for ProjectStorage {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}
impl ProjectStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Modules
    // =========================================================================

    /// Id of a module namespace, creating the module if it is new.
    #[instrument(level = "trace", skip(self))]
    pub async fn module_id(&self, name: &str) -> Result<ModuleId> {
        sqlx::query_scalar(include_str!("../queries/upsert_module.sql"))
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    pub async fn fetch_module_name(&self, module_id: ModuleId) -> Result<String> {
        let name: Option<String> = sqlx::query_scalar(include_str!("../queries/get_module_name.sql"))
            .bind(module_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        name.ok_or_raise(|| ErrorKind::UnknownId { kind: "module", id: module_id.0 })
    }

    /// Every known module, ordered by name.
    pub async fn fetch_modules(&self) -> Result<Vec<(ModuleId, String)>> {
        sqlx::query_as(include_str!("../queries/list_modules.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// The status recorded for a file by the last synchronization, if any.
    pub async fn fetch_file_status(&self, source_id: SourceId) -> Result<Option<FileStatus>> {
        sqlx::query_as(include_str!("../queries/get_file_status.sql"))
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Files linked to a manifest by the last synchronization.
    pub async fn fetch_project_datas(&self, project_source_id: SourceId) -> Result<Vec<ProjectData>> {
        let rows: Vec<ProjectDataRow> = sqlx::query_as(include_str!("../queries/list_project_datas_for_project.sql"))
            .bind(project_source_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ProjectData::try_from).collect()
    }

    pub async fn fetch_all_project_datas(&self) -> Result<Vec<ProjectData>> {
        let rows: Vec<ProjectDataRow> = sqlx::query_as(include_str!("../queries/list_project_datas.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ProjectData::try_from).collect()
    }

    /// Types declared by a file, with the names they are exported under.
    pub async fn fetch_types(&self, source_id: SourceId) -> Result<Vec<Type>> {
        let rows: Vec<TypeRow> = sqlx::query_as(include_str!("../queries/list_types_for_source.sql"))
            .bind(source_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut types = Vec::with_capacity(rows.len());
        for row in rows {
            let type_id = row.type_id.ok_or_raise(|| ErrorKind::InvalidData("type id"))?;
            let mut ty = Type::try_from(row)?;
            let exports: Vec<ExportedTypeRow> =
                sqlx::query_as(include_str!("../queries/list_exported_types_for_type.sql"))
                    .bind(type_id)
                    .fetch_all(&self.pool)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            for export in exports {
                let export = ExportedTypeName::try_from(export)?;
                ty.exported_types.push(ExportedType::new(export.module_id, export.name, export.version));
            }
            types.push(ty);
        }
        Ok(types)
    }

    /// Every name exported into a module, ordered by name and version.
    pub async fn fetch_exported_types(&self, module_id: ModuleId) -> Result<Vec<ExportedTypeName>> {
        let rows: Vec<ExportedTypeRow> = sqlx::query_as(include_str!("../queries/list_exported_types_for_module.sql"))
            .bind(module_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ExportedTypeName::try_from).collect()
    }

    pub async fn fetch_imports(&self, source_id: SourceId) -> Result<Vec<Import>> {
        let rows: Vec<ImportRow> = sqlx::query_as(include_str!("../queries/list_imports_for_source.sql"))
            .bind(source_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Import::try_from).collect()
    }

    // =========================================================================
    // Synchronize
    // =========================================================================

    /// Apply one updater run in a single transaction.
    ///
    /// Everything stored for the ids listed in the package is replaced by
    /// what the package contains; anything else is left alone. Returns
    /// [`ErrorKind::Constraint`] without touching the database if the package
    /// refers to sources it does not claim to update.
    #[instrument(level = "debug", skip_all, fields(
        types = package.types.len(),
        project_datas = package.project_datas.len(),
        updated_sources = package.updated_source_ids.len(),
    ))]
    pub async fn synchronize(&self, package: &SynchronizationPackage) -> Result<()> {
        Self::validate(package)?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        Self::sync_file_statuses(&mut tx, package).await?;
        Self::sync_imports(&mut tx, package).await?;
        Self::sync_types(&mut tx, package).await?;
        Self::sync_project_datas(&mut tx, package).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        debug!("synchronization committed");
        Ok(())
    }

    fn validate(package: &SynchronizationPackage) -> Result<()> {
        let updated: HashSet<SourceId> = package.updated_source_ids.iter().copied().collect();
        let projects: HashSet<SourceId> = package.updated_project_source_ids.iter().copied().collect();
        if let Some(ty) = package.types.iter().find(|ty| !updated.contains(&ty.source_id)) {
            exn::bail!(ErrorKind::Constraint(format!(
                "type {} belongs to source {} which is not being updated",
                ty.type_name, ty.source_id
            )));
        }
        if let Some(import) = package.imports.iter().find(|import| !updated.contains(&import.source_id)) {
            exn::bail!(ErrorKind::Constraint(format!(
                "import of module {} belongs to source {} which is not being updated",
                import.module_id, import.source_id
            )));
        }
        if let Some(data) = package.project_datas.iter().find(|data| !projects.contains(&data.project_source_id)) {
            exn::bail!(ErrorKind::Constraint(format!(
                "project data for source {} belongs to manifest {} which is not being updated",
                data.source_id, data.project_source_id
            )));
        }
        if let Some(status) = package.file_statuses.iter().find(|status| !status.is_valid()) {
            exn::bail!(ErrorKind::Constraint(format!("invalid file status for source {}", status.source_id)));
        }
        Ok(())
    }

    async fn sync_file_statuses(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        for source_id in &package.updated_file_status_source_ids {
            sqlx::query(include_str!("../queries/delete_file_status.sql"))
                .bind(source_id)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for status in &package.file_statuses {
            sqlx::query(include_str!("../queries/upsert_file_status.sql"))
                .bind(status.source_id)
                .bind(status.size)
                .bind(status.last_modified)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }

    /// Sources whose only types in the package are `Minimal` did not change
    /// on disk, so their stored imports stay.
    fn minimal_only_sources(package: &SynchronizationPackage) -> HashSet<SourceId> {
        let mut minimal: HashMap<SourceId, bool> = HashMap::new();
        for ty in &package.types {
            let entry = minimal.entry(ty.source_id).or_insert(true);
            *entry &= ty.change_level == ChangeLevel::Minimal;
        }
        minimal.into_iter().filter_map(|(id, only_minimal)| only_minimal.then_some(id)).collect()
    }

    async fn sync_imports(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        let keep = Self::minimal_only_sources(package);
        for source_id in package.updated_source_ids.iter().filter(|id| !keep.contains(id)) {
            sqlx::query(include_str!("../queries/delete_imports_for_source.sql"))
                .bind(source_id)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for import in &package.imports {
            let (major, minor) = version_to_columns(import.version);
            sqlx::query(include_str!("../queries/insert_import.sql"))
                .bind(import.source_id)
                .bind(import.module_id)
                .bind(major)
                .bind(minor)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }

    async fn sync_types(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        let kept: HashSet<(SourceId, &str)> =
            package.types.iter().map(|ty| (ty.source_id, ty.type_name.as_str())).collect();
        for source_id in &package.updated_source_ids {
            let stored: Vec<(TypeId, String)> =
                sqlx::query_as(include_str!("../queries/list_type_names_for_source.sql"))
                    .bind(source_id)
                    .fetch_all(&mut *conn)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            for (type_id, name) in stored {
                if kept.contains(&(*source_id, name.as_str())) {
                    continue;
                }
                debug!(%source_id, type_name = %name, "removing type");
                sqlx::query(include_str!("../queries/delete_type.sql"))
                    .bind(type_id)
                    .execute(&mut *conn)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            }
        }

        // A type may show up more than once; its exports are reset only the first time.
        let mut reset: HashSet<TypeId> = HashSet::new();
        for ty in &package.types {
            let type_id = Self::write_type(conn, ty).await?;
            if ty.change_level == ChangeLevel::ExcludeExportedTypes {
                continue;
            }
            if reset.insert(type_id) {
                sqlx::query(include_str!("../queries/delete_exported_types_for_type.sql"))
                    .bind(type_id)
                    .execute(&mut *conn)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            }
            for export in &ty.exported_types {
                let (major, minor) = version_to_columns(export.version);
                sqlx::query(include_str!("../queries/upsert_exported_type.sql"))
                    .bind(export.module_id)
                    .bind(&export.name)
                    .bind(major)
                    .bind(minor)
                    .bind(type_id)
                    .execute(&mut *conn)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            }
        }
        Ok(())
    }

    async fn write_type(conn: &mut SqliteConnection, ty: &Type) -> Result<TypeId> {
        if ty.change_level == ChangeLevel::Minimal {
            return sqlx::query_scalar(include_str!("../queries/ensure_type.sql"))
                .bind(ty.source_id)
                .bind(&ty.type_name)
                .bind(&ty.prototype)
                .bind(ty.access_semantics.as_str())
                .fetch_one(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database);
        }
        let row = TypeRow::try_from(ty)?;
        sqlx::query_scalar(include_str!("../queries/upsert_type.sql"))
            .bind(row.source_id)
            .bind(row.name)
            .bind(row.prototype)
            .bind(row.access_semantics)
            .bind(row.properties)
            .bind(row.functions)
            .bind(row.signals)
            .bind(row.enumerations)
            .fetch_one(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn sync_project_datas(conn: &mut SqliteConnection, package: &SynchronizationPackage) -> Result<()> {
        let projects: HashSet<SourceId> =
            package.updated_project_source_ids.iter().chain(&package.updated_source_ids).copied().collect();
        for project_source_id in projects {
            sqlx::query(include_str!("../queries/delete_project_datas_for_project.sql"))
                .bind(project_source_id)
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for data in &package.project_datas {
            sqlx::query(include_str!("../queries/upsert_project_data.sql"))
                .bind(data.project_source_id)
                .bind(data.source_id)
                .bind(data.module_id)
                .bind(data.file_type.as_str())
                .execute(&mut *conn)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }
}
