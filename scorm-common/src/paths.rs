//! Path-safety helpers
//!
//! Archive entry names and requested file paths come from content authors
//! and learners' browsers. Both are turned into filesystem paths only through
//! [`sanitize_relative_path`].

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Maximum media id length accepted as a cache directory name
pub const MAX_MEDIA_ID_LEN: usize = 128;

/// Why a relative path was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafePath {
    #[error("path contains a backslash")]
    Backslash,

    #[error("path is absolute")]
    Absolute,

    #[error("path starts with a drive letter")]
    DriveLetter,

    #[error("path contains a '..' segment")]
    ParentSegment,

    #[error("path contains a NUL byte")]
    NulByte,

    #[error("path contains a control character")]
    ControlCharacter,

    #[error("path is empty")]
    Empty,
}

/// Turn an untrusted `/`-separated relative path into a safe `PathBuf`
///
/// Backslashes, control characters, absolute paths, drive-letter prefixes
/// and `..` segments are refused outright. Empty and `.` segments are dropped.
pub fn sanitize_relative_path(raw: &str) -> Result<PathBuf, UnsafePath> {
    if raw.contains('\\') {
        return Err(UnsafePath::Backslash);
    }
    if raw.contains('\0') {
        return Err(UnsafePath::NulByte);
    }
    if raw.chars().any(char::is_control) {
        return Err(UnsafePath::ControlCharacter);
    }
    if raw.starts_with('/') {
        return Err(UnsafePath::Absolute);
    }

    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(UnsafePath::DriveLetter);
    }

    let mut clean = PathBuf::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(UnsafePath::ParentSegment),
            other => clean.push(other),
        }
    }

    // Belt and braces: whatever the platform parses, only plain names remain
    if clean.as_os_str().is_empty() {
        return Err(UnsafePath::Empty);
    }
    if !clean.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(UnsafePath::Absolute);
    }

    Ok(clean)
}

/// True when `candidate` lies strictly below `root`
///
/// Component-wise comparison; callers pass canonical paths when symlinks
/// matter.
pub fn is_strictly_within(root: &Path, candidate: &Path) -> bool {
    candidate != root && candidate.starts_with(root)
}

/// Media ids become directory names: `[A-Za-z0-9_-]{1,128}`
pub fn is_valid_media_id(media_id: &str) -> bool {
    !media_id.is_empty()
        && media_id.len() <= MAX_MEDIA_ID_LEN
        && media_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
