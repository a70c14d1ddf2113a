use crate::error::{Error, ErrorKind};
use crate::types::{FileType, ModuleId, ProjectData, SourceId};
use exn::OptionExt;

#[derive(sqlx::FromRow)]
pub(crate) struct ProjectDataRow {
    project_source_id: SourceId,
    source_id: SourceId,
    module_id: ModuleId,
    file_type: String,
}
impl TryFrom<ProjectDataRow> for ProjectData {
    type Error = Error;
    fn try_from(row: ProjectDataRow) -> Result<Self, Self::Error> {
        Ok(ProjectData {
            project_source_id: row.project_source_id,
            source_id: row.source_id,
            module_id: row.module_id,
            file_type: FileType::parse(&row.file_type).ok_or_raise(|| ErrorKind::InvalidData("file type"))?,
        })
    }
}
