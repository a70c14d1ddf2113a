mod exported;
mod project;
mod type_row;

pub(crate) use self::exported::{ExportedTypeRow, ImportRow};
pub(crate) use self::project::ProjectDataRow;
pub(crate) use self::type_row::TypeRow;

use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use qmlsync_parse::models::Version;

/// Missing version parts are stored as `-1`.
pub(crate) fn version_to_columns(version: Version) -> (i64, i64) {
    (version.major.map_or(-1, i64::from), version.minor.map_or(-1, i64::from))
}

pub(crate) fn version_from_columns(major: i64, minor: i64) -> Result<Version, Error> {
    let part = |value: i64| -> Result<Option<u32>, Error> {
        if value < 0 {
            return Ok(None);
        }
        Ok(Some(u32::try_from(value).or_raise(|| ErrorKind::InvalidData("version"))?))
    };
    Ok(Version { major: part(major)?, minor: part(minor)? })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_columns() {
        assert_eq!(version_to_columns(Version::new(2, 15)), (2, 15));
        assert_eq!(version_to_columns(Version::major(6)), (6, -1));
        assert_eq!(version_to_columns(Version::none()), (-1, -1));
        assert_eq!(version_from_columns(6, -1).unwrap(), Version::major(6));
        assert_eq!(version_from_columns(-1, -1).unwrap(), Version::none());
        assert!(version_from_columns(i64::MAX, 0).is_err());
    }
}
