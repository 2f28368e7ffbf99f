//! ZIP extraction with zip-slip protection

use std::io::Cursor;
use std::path::Path;

use scorm_common::paths::{is_strictly_within, sanitize_relative_path};
use tracing::{debug, warn};
use zip::ZipArchive;

use super::{CacheError, MARKER_FILE};

/// Outcome of one extraction
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    pub files_written: usize,
    pub directories_created: usize,
    /// Entry names refused as unsafe or unreadable
    pub skipped: Vec<String>,
}

impl ExtractionReport {
    fn skip(&mut self, name: &str, reason: &str) {
        warn!(entry = %name, reason = %reason, "Skipping archive entry");
        self.skipped.push(name.to_string());
    }
}

/// Extract `bytes` (a ZIP archive) below `dir`
///
/// Every entry is sanitized and its resolved parent re-verified inside the
/// canonical extraction directory. Unsafe entries are skipped, never fatal.
/// Blocking; run it off the async executor.
pub fn extract_zip_to_disk(bytes: &[u8], dir: &Path) -> Result<ExtractionReport, CacheError> {
    extract_with_heartbeat(bytes, dir, || {})
}

/// [`extract_zip_to_disk`], calling `heartbeat` before each entry
pub(crate) fn extract_with_heartbeat(
    bytes: &[u8],
    dir: &Path,
    mut heartbeat: impl FnMut(),
) -> Result<ExtractionReport, CacheError> {
    std::fs::create_dir_all(dir)?;
    let root = std::fs::canonicalize(dir)?;

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| CacheError::Archive(e.to_string()))?;
    let mut report = ExtractionReport::default();

    for index in 0..archive.len() {
        heartbeat();
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                report.skip(&format!("#{}", index), &e.to_string());
                continue;
            }
        };
        let name = entry.name().to_string();

        let relative = match sanitize_relative_path(&name) {
            Ok(relative) => relative,
            Err(reason) => {
                report.skip(&name, &reason.to_string());
                continue;
            }
        };

        if relative == Path::new(MARKER_FILE) {
            report.skip(&name, "collides with extraction marker");
            continue;
        }

        let target = root.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            if !is_strictly_within(&root, &std::fs::canonicalize(&target)?) {
                report.skip(&name, "directory resolves outside extraction root");
                continue;
            }
            report.directories_created += 1;
            continue;
        }

        let (Some(parent), Some(file_name)) = (target.parent(), target.file_name()) else {
            report.skip(&name, "no file name");
            continue;
        };

        std::fs::create_dir_all(parent)?;
        let resolved = std::fs::canonicalize(parent)?.join(file_name);
        if !is_strictly_within(&root, &resolved) {
            report.skip(&name, "resolves outside extraction root");
            continue;
        }

        // Never write through a symlink left by an earlier entry
        if std::fs::symlink_metadata(&resolved).is_ok_and(|m| m.file_type().is_symlink()) {
            report.skip(&name, "target is a symlink");
            continue;
        }

        let mut out = std::fs::File::create(&resolved)?;
        std::io::copy(&mut entry, &mut out)?;
        report.files_written += 1;
        debug!(entry = %name, "Extracted");
    }

    Ok(report)
}
