//! Input sanitization for claimed file names
//!
//! Validates and normalizes the file names and sizes callers declare before
//! anything touches disk or a compiler. Checks run on the normalized path,
//! not the raw string, so `foo/../../etc/passwd` and friends are caught after
//! normalization rather than by substring matching.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::config::FileExtension;

/// Rejection reasons for claimed file names and sizes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("file name is empty")]
    EmptyName,

    #[error("absolute paths are not allowed: {0:?}")]
    AbsolutePath(String),

    #[error("parent directory segments are not allowed: {0:?}")]
    ParentSegment(String),

    #[error("home directory markers are not allowed: {0:?}")]
    HomeMarker(String),

    #[error("illegal character in file name: {0:?}")]
    IllegalCharacter(String),

    #[error("file has no extension: {0:?}")]
    MissingExtension(String),

    #[error("file extension {extension:?} is not on the allow-list")]
    ExtensionNotAllowed { extension: String },

    #[error("file size {size} exceeds the limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("path escapes the sandbox root: {0:?}")]
    OutsideSandbox(String),
}

/// Validate a claimed file name and return its normalized relative path.
///
/// Accepts simple names and forward-slash subpaths (`pkg/Main.java`).
/// Rejects, on the normalized form: empty names, absolute paths, parent
/// directory segments, home-directory markers, backslashes and control
/// characters, and extensions outside the allow-list.
pub fn sanitize_file_name(
    name: &str,
    allowed: &[FileExtension],
) -> Result<PathBuf, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    if name.contains('\\') || name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::IllegalCharacter(name.to_owned()));
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    ValidationError::IllegalCharacter(name.to_owned())
                })?;
                if part.starts_with('~') {
                    return Err(ValidationError::HomeMarker(name.to_owned()));
                }
                normalized.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(ValidationError::ParentSegment(name.to_owned()));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ValidationError::AbsolutePath(name.to_owned()));
            }
        }
    }

    let file_name = normalized
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(ValidationError::EmptyName)?;

    let extension = file_name
        .rsplit_once('.')
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .map(|(_, ext)| ext)
        .ok_or_else(|| ValidationError::MissingExtension(name.to_owned()))?;

    if !allowed.iter().any(|e| e.as_str() == extension) {
        return Err(ValidationError::ExtensionNotAllowed {
            extension: extension.to_owned(),
        });
    }

    Ok(normalized)
}

/// Enforce the byte-size cap before any content I/O
pub fn check_size(size: u64, limit: u64) -> Result<(), ValidationError> {
    if size > limit {
        return Err(ValidationError::TooLarge { size, limit });
    }
    Ok(())
}

/// Join a sanitized relative path under the sandbox root and re-check that
/// the result stays inside it.
pub fn confine(root: &Path, relative: &Path) -> Result<PathBuf, ValidationError> {
    let joined = root.join(relative);
    if !joined.starts_with(root)
        || joined
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ValidationError::OutsideSandbox(
            relative.display().to_string(),
        ));
    }
    Ok(joined)
}
