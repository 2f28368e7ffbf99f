//! Reading files out of an extracted package

use std::path::{Component, Path, PathBuf};

use scorm_common::paths::is_strictly_within;
use tracing::warn;

use super::MARKER_FILE;

/// Resolve `relative` below `dir`, matching names case-insensitively
///
/// Packages authored on case-insensitive filesystems often reference
/// `Index.HTML` while shipping `index.html`. Each segment prefers an exact
/// match. Blocking.
pub fn find_file_case_insensitive(dir: &Path, relative: &Path) -> Option<PathBuf> {
    let segments: Vec<&std::ffi::OsStr> = relative
        .components()
        .map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect::<Option<_>>()?;

    let (last, parents) = segments.split_last()?;
    let mut current = dir.to_path_buf();

    for segment in parents {
        current = match_entry(&current, segment, true)?;
    }
    match_entry(&current, last, false)
}

fn match_entry(dir: &Path, name: &std::ffi::OsStr, want_dir: bool) -> Option<PathBuf> {
    let kind_ok = |p: &Path| if want_dir { p.is_dir() } else { p.is_file() };

    let exact = dir.join(name);
    if kind_ok(&exact) {
        return Some(exact);
    }

    let wanted = name.to_string_lossy().to_lowercase();
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .is_some_and(|n| n.to_string_lossy().to_lowercase() == wanted)
                && kind_ok(path)
        })
}

/// Read `relative` from an extracted package directory
///
/// Falls back to a case-insensitive lookup. The resolved file must stay
/// strictly inside `dir` after canonicalization.
pub async fn read_extracted_file(dir: &Path, relative: &Path) -> Option<Vec<u8>> {
    if relative == Path::new(MARKER_FILE) {
        return None;
    }

    let direct = dir.join(relative);
    let found = if tokio::fs::metadata(&direct).await.is_ok_and(|m| m.is_file()) {
        direct
    } else {
        let dir = dir.to_path_buf();
        let relative = relative.to_path_buf();
        tokio::task::spawn_blocking(move || find_file_case_insensitive(&dir, &relative))
            .await
            .ok()
            .flatten()?
    };

    let root = tokio::fs::canonicalize(dir).await.ok()?;
    let resolved = tokio::fs::canonicalize(&found).await.ok()?;
    if !is_strictly_within(&root, &resolved) {
        warn!(path = %found.display(), "Resolved file escapes package directory");
        return None;
    }

    match tokio::fs::read(&resolved).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(path = %resolved.display(), error = %e, "Failed to read extracted file");
            None
        }
    }
}
