//! Path validation and normalisation.
//!
//! Paths double as identity keys in the source path cache, so two spellings
//! of the same file must normalise to the same [`PathBuf`].

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a workspace path for security and correctness.
/// Ensures that paths don't escape the backend root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use qmlsync_fs::validate_path;
/// // Valid paths
/// assert!(validate_path("QtQuick/Controls/qmldir").is_ok());
/// assert!(validate_path("a/../Button.qml").is_ok()); // (never leaves the root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../still-wrong/.././Foo//./qmldir/").unwrap(),
///     Path::new("Foo/qmldir")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Validates a file path and splits it into its directory (empty for files at
/// the root) and its UTF-8 file name.
///
/// ```
/// use std::path::Path;
/// use qmlsync_fs::split_path;
/// let (directory, name) = split_path("Foo/./Bar/qmldir").unwrap();
/// assert_eq!(directory, Path::new("Foo/Bar"));
/// assert_eq!(name, "qmldir");
/// ```
pub fn split(path: impl AsRef<Path>) -> Result<(PathBuf, String)> {
    let validated = validate(path.as_ref())?;
    let name = validated
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(path.as_ref().to_path_buf())))?;
    let directory = validated.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok((directory, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate(Path::new("Foo/qmldir")).unwrap(), Path::new("Foo/qmldir"));
        assert_eq!(validate(Path::new("a/b/c/Item.qml")).unwrap(), Path::new("a/b/c/Item.qml"));
        assert_eq!(validate(Path::new("qmldir")).unwrap(), Path::new("qmldir"));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(validate(Path::new("a//b//c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/./b/./c")).unwrap(), Path::new("a/b/c"));
        // Leading root is dropped: everything is relative to the backend root.
        assert_eq!(validate(Path::new("/a/b")).unwrap(), Path::new("a/b"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate(Path::new("../etc/passwd")).is_err());
        assert!(validate(Path::new("a/../../b")).is_err());
        assert!(validate(Path::new("..")).is_err());
        assert!(validate(Path::new("../..")).is_err());
    }

    #[test]
    fn test_reverse_attempts() {
        assert_eq!(validate(Path::new("a/b/..")).unwrap(), Path::new("a"));
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate(Path::new("a\0b")).is_err());
        assert!(validate(Path::new("\0")).is_err());
    }

    #[test]
    fn test_empty_paths() {
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new(".")).is_err());
        assert!(validate(Path::new("./")).is_err());
        assert!(validate(Path::new("//")).is_err());
    }

    #[test]
    fn test_trailing_slashes() {
        assert_eq!(validate(Path::new("Foo/")).unwrap(), Path::new("Foo"));
        assert_eq!(validate(Path::new("Foo///")).unwrap(), Path::new("Foo"));
    }

    #[test]
    fn test_split_nested() {
        let (directory, name) = split("Foo/Bar/Item.qml").unwrap();
        assert_eq!(directory, Path::new("Foo/Bar"));
        assert_eq!(name, "Item.qml");
    }

    #[test]
    fn test_split_root_level() {
        let (directory, name) = split("qmldir").unwrap();
        assert_eq!(directory, Path::new(""));
        assert_eq!(name, "qmldir");
    }

    #[test]
    fn test_split_rejects_traversal() {
        assert!(split("../qmldir").is_err());
    }
}
