//! On-disk cache of extracted SCORM packages
//!
//! Layout below the configured root:
//!
//! ```text
//! <root>/scorm/<media_id>/           extracted package
//! <root>/scorm/<media_id>/.extracted completion marker
//! <root>/scorm/<media_id>.lock       held while one worker extracts
//! ```
//!
//! A package is served only once its marker exists. Extraction for one
//! media id happens at most once across every task and process sharing the
//! root; concurrent requesters wait on the lock with bounded backoff.

mod extract;
mod lock;
mod lookup;

pub use extract::{extract_zip_to_disk, ExtractionReport};
pub use lock::ExtractionLock;
pub use lookup::{find_file_case_insensitive, read_extracted_file};

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use scorm_common::config::{require_cache_dir, ExtractionConfig};
use scorm_common::paths::{is_valid_media_id, sanitize_relative_path};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::media::{MediaError, MediaStore};

/// Subdirectory of the cache root holding packages
pub const PACKAGE_SUBDIR: &str = "scorm";

/// Completion marker written after a successful extraction
pub const MARKER_FILE: &str = ".extracted";

/// Extraction cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Another worker held the lock for longer than the policy allows
    #[error("Timed out after {waited:?} waiting for extraction of {media_id}")]
    LockTimeout { media_id: String, waited: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Media store error: {0}")]
    Media(#[from] MediaError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How long and how eagerly to wait for another worker's extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_wait: Duration,
    pub stale_after: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

impl From<&ExtractionConfig> for LockPolicy {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            initial_backoff: Duration::from_millis(config.lock_retry_initial_ms.max(1)),
            max_backoff: Duration::from_millis(config.lock_retry_max_ms.max(1)),
            max_wait: Duration::from_millis(config.lock_max_wait_ms),
            stale_after: Duration::from_secs(config.stale_lock_secs),
        }
    }
}

/// Extraction cache rooted at the configured cache directory
#[derive(Debug)]
pub struct ExtractionCache {
    root: PathBuf,
    policy: LockPolicy,
}

impl ExtractionCache {
    /// Fails with a configuration error when no cache root is configured
    pub fn new(cache_root: Option<PathBuf>, policy: LockPolicy) -> scorm_common::Result<Self> {
        let root = require_cache_dir(cache_root)?;
        info!(root = %root.display(), "SCORM extraction cache enabled");
        Ok(Self { root, policy })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    pub fn extraction_dir(&self, media_id: &str) -> PathBuf {
        self.root.join(PACKAGE_SUBDIR).join(media_id)
    }

    fn marker_path(&self, media_id: &str) -> PathBuf {
        self.extraction_dir(media_id).join(MARKER_FILE)
    }

    fn lock_path(&self, media_id: &str) -> PathBuf {
        self.root
            .join(PACKAGE_SUBDIR)
            .join(format!("{}.lock", media_id))
    }

    /// True once the package's completion marker exists
    pub async fn is_extracted(&self, media_id: &str) -> bool {
        tokio::fs::try_exists(self.marker_path(media_id))
            .await
            .unwrap_or(false)
    }

    /// Serve `file_path` from the package `media_id`, extracting it first if
    /// needed
    ///
    /// `Ok(None)` covers every "not available" outcome: bad ids or paths,
    /// unknown media, failed downloads, corrupt archives and missing files.
    /// Only a lock wait that exceeds the policy is reported as an error.
    pub async fn get_extracted_file(
        &self,
        media_id: &str,
        file_path: &str,
        media: &dyn MediaStore,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        if !is_valid_media_id(media_id) {
            warn!(media_id = %media_id, "Refusing invalid media id");
            return Ok(None);
        }

        let relative = match sanitize_relative_path(file_path) {
            Ok(relative) => relative,
            Err(reason) => {
                warn!(media_id = %media_id, path = %file_path, reason = %reason, "Refusing unsafe content path");
                return Ok(None);
            }
        };

        let dir = self.extraction_dir(media_id);

        if self.is_extracted(media_id).await {
            return Ok(read_extracted_file(&dir, &relative).await);
        }

        match self.ensure_extracted(media_id, media).await {
            Ok(true) => Ok(read_extracted_file(&dir, &relative).await),
            Ok(false) => Ok(None),
            Err(e @ CacheError::LockTimeout { .. }) => Err(e),
            Err(e) => {
                error!(media_id = %media_id, error = %e, "Package extraction failed");
                Ok(None)
            }
        }
    }

    /// Make sure the package is extracted; `Ok(false)` when the media is
    /// unknown
    async fn ensure_extracted(
        &self,
        media_id: &str,
        media: &dyn MediaStore,
    ) -> Result<bool, CacheError> {
        let lock_path = self.lock_path(media_id);
        let started = Instant::now();
        let mut backoff = self.policy.initial_backoff;

        loop {
            if let Some(lock) = ExtractionLock::try_acquire(&lock_path)? {
                return self.extract_locked(lock, media_id, media).await;
            }

            if self.is_extracted(media_id).await {
                return Ok(true);
            }

            if lock::break_if_stale(&lock_path, self.policy.stale_after) {
                continue;
            }

            let waited = started.elapsed();
            if waited >= self.policy.max_wait {
                warn!(media_id = %media_id, waited_ms = waited.as_millis() as u64, "Gave up waiting for extraction lock");
                return Err(CacheError::LockTimeout {
                    media_id: media_id.to_string(),
                    waited,
                });
            }

            let pause = backoff.min(self.policy.max_wait - waited);
            debug!(media_id = %media_id, pause_ms = pause.as_millis() as u64, "Extraction in progress elsewhere, waiting");
            tokio::time::sleep(pause).await;
            backoff = (backoff * 2).min(self.policy.max_backoff);
        }
    }

    /// Fetch and extract while holding `lock`
    ///
    /// Once the archive is downloaded the lock moves onto the blocking
    /// thread and is released only after the marker is written, so a
    /// cancelled request can never free it while files are still being
    /// written.
    async fn extract_locked(
        &self,
        lock: ExtractionLock,
        media_id: &str,
        media: &dyn MediaStore,
    ) -> Result<bool, CacheError> {
        // The previous holder may have finished between our checks
        if self.is_extracted(media_id).await {
            debug!(media_id = %media_id, "Package extracted by another worker");
            return Ok(true);
        }

        let Some(record) = media.get(media_id).await? else {
            warn!(media_id = %media_id, "Media not found");
            return Ok(false);
        };

        let bytes = media.download(&record.file).await?;
        let dir = self.extraction_dir(media_id);
        let refresh_every = self.policy.stale_after / 4;

        let report = tokio::task::spawn_blocking(move || {
            extract_and_mark(lock, &bytes, &dir, refresh_every)
        })
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))??;

        info!(
            media_id = %media_id,
            files = report.files_written,
            skipped = report.skipped.len(),
            "SCORM package extracted"
        );
        Ok(true)
    }
}

/// Blocking half of an extraction; `lock` is dropped on return
fn extract_and_mark(
    lock: ExtractionLock,
    bytes: &[u8],
    dir: &Path,
    refresh_every: Duration,
) -> Result<ExtractionReport, CacheError> {
    lock.refresh();
    let mut last_refresh = Instant::now();

    let report = extract::extract_with_heartbeat(bytes, dir, || {
        if last_refresh.elapsed() >= refresh_every {
            lock.refresh();
            last_refresh = Instant::now();
        }
    })?;

    std::fs::write(dir.join(MARKER_FILE), chrono::Utc::now().to_rfc3339())?;
    drop(lock);
    Ok(report)
}
