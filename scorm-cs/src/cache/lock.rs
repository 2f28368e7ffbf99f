//! Per-package extraction lock
//!
//! The lock is a file created with `create_new`, so it excludes other
//! processes sharing the cache root as well as other tasks in this one.
//! Its first word is a token unique to the holder; the holder only ever
//! refreshes or removes a file that still carries its own token.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

/// Held extraction lock; the lock file is removed on drop if still ours
#[derive(Debug)]
pub struct ExtractionLock {
    path: PathBuf,
    token: String,
}

impl ExtractionLock {
    /// Try to take the lock at `path`
    ///
    /// `Ok(None)` when another holder owns it.
    pub fn try_acquire(path: &Path) -> std::io::Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e),
        };

        let token = uuid::Uuid::new_v4().to_string();
        let owner = format!(
            "{} {} {}\n",
            token,
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );
        // An untagged lock could never be released by anyone
        if let Err(e) = file.write_all(owner.as_bytes()).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = std::fs::remove_file(path);
            return Err(e);
        }

        debug!(lock = %path.display(), "Extraction lock acquired");
        Ok(Some(Self {
            path: path.to_path_buf(),
            token,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True while the lock file still carries this holder's token
    pub fn is_held(&self) -> bool {
        std::fs::read_to_string(&self.path)
            .is_ok_and(|contents| contents.split_whitespace().next() == Some(self.token.as_str()))
    }

    /// Bump the lock's modification time so waiters do not judge it stale
    ///
    /// Returns false when the lock is no longer ours.
    pub fn refresh(&self) -> bool {
        if !self.is_held() {
            warn!(lock = %self.path.display(), "Extraction lock lost to another holder");
            return false;
        }

        let touched = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|file| file.set_modified(SystemTime::now()));
        match touched {
            Ok(()) => true,
            Err(e) => {
                warn!(lock = %self.path.display(), error = %e, "Failed to refresh extraction lock");
                false
            }
        }
    }
}

impl Drop for ExtractionLock {
    fn drop(&mut self) {
        if !self.is_held() {
            warn!(lock = %self.path.display(), "Extraction lock taken over, leaving it in place");
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(lock = %self.path.display(), "Extraction lock released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(lock = %self.path.display(), error = %e, "Failed to remove extraction lock"),
        }
    }
}

/// Age of the lock file at `path`, `None` when it does not exist
pub fn lock_age(path: &Path) -> Option<Duration> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

/// Break a lock whose holder is presumed dead
///
/// Returns true when the caller should retry acquisition right away: the
/// lock was stale and removed, or it is already gone. The file is first
/// renamed to a private tombstone, so two waiters can never both remove
/// it, and a lock re-taken between the age check and the rename is put
/// back.
pub fn break_if_stale(path: &Path, stale_after: Duration) -> bool {
    let Some(age) = lock_age(path) else {
        return true;
    };
    if age < stale_after {
        return false;
    }

    let tombstone = path.with_extension(format!("stale-{}", uuid::Uuid::new_v4()));
    match std::fs::rename(path, &tombstone) {
        Ok(()) => {}
        // Another waiter broke it first
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
        Err(e) => {
            warn!(lock = %path.display(), error = %e, "Failed to break stale lock");
            return false;
        }
    }

    if lock_age(&tombstone).is_some_and(|age| age < stale_after) {
        debug!(lock = %path.display(), "Lock was re-taken before it could be broken, restoring");
        if let Err(e) = std::fs::hard_link(&tombstone, path) {
            warn!(lock = %path.display(), error = %e, "Failed to restore extraction lock");
        }
        let _ = std::fs::remove_file(&tombstone);
        return false;
    }

    warn!(
        lock = %path.display(),
        age_secs = age.as_secs(),
        "Removed stale extraction lock"
    );
    if let Err(e) = std::fs::remove_file(&tombstone) {
        warn!(lock = %tombstone.display(), error = %e, "Failed to remove lock tombstone");
    }
    true
}
