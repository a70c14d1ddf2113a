use super::version_from_columns;
use crate::error::Error;
use crate::types::{ExportedTypeName, Import, ModuleId, SourceId, TypeId};

#[derive(sqlx::FromRow)]
pub(crate) struct ExportedTypeRow {
    module_id: ModuleId,
    name: String,
    major: i64,
    minor: i64,
    type_id: TypeId,
    type_name: String,
    source_id: SourceId,
}
impl TryFrom<ExportedTypeRow> for ExportedTypeName {
    type Error = Error;
    fn try_from(row: ExportedTypeRow) -> Result<Self, Self::Error> {
        Ok(ExportedTypeName {
            module_id: row.module_id,
            name: row.name,
            version: version_from_columns(row.major, row.minor)?,
            type_id: row.type_id,
            type_name: row.type_name,
            source_id: row.source_id,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ImportRow {
    source_id: SourceId,
    module_id: ModuleId,
    major: i64,
    minor: i64,
}
impl TryFrom<ImportRow> for Import {
    type Error = Error;
    fn try_from(row: ImportRow) -> Result<Self, Self::Error> {
        Ok(Import {
            module_id: row.module_id,
            version: version_from_columns(row.major, row.minor)?,
            source_id: row.source_id,
        })
    }
}
