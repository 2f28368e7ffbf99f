//! Shared doubles for scorm-cs integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scorm_cs::cache::LockPolicy;
use scorm_cs::media::{MediaError, MediaRecord, MediaStore};
use zip::write::SimpleFileOptions;

/// Build a ZIP archive in memory; names ending in `/` become directories
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .unwrap();
        } else {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Uncompressed package of `count` files `f<i>.bin`, `size` bytes each,
/// large enough that extraction takes a noticeable while
pub fn bulky_package(count: usize, size: usize) -> Vec<u8> {
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..count {
        writer.start_file(format!("f{}.bin", i), options).unwrap();
        writer.write_all(&vec![i as u8; size]).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A typical single-SCO package
pub fn sample_package() -> Vec<u8> {
    zip_bytes(&[
        ("imsmanifest.xml", b"<manifest identifier=\"sample\"/>"),
        ("index.html", b"<html><body>Lesson</body></html>"),
        ("assets/", b""),
        ("assets/style.css", b"body { margin: 0 }"),
    ])
}

/// Short waits so timeout paths finish quickly
pub fn fast_policy() -> LockPolicy {
    LockPolicy {
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        max_wait: Duration::from_secs(10),
        stale_after: Duration::from_secs(600),
    }
}

/// In-memory media store counting every call
#[derive(Default)]
pub struct CountingMediaStore {
    packages: Mutex<HashMap<String, Vec<u8>>>,
    pub gets: AtomicUsize,
    pub downloads: AtomicUsize,
    /// Simulated transfer time, widens race windows
    pub download_delay: Duration,
    pub fail_download: bool,
}

impl CountingMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(self, media_id: &str, bytes: Vec<u8>) -> Self {
        self.packages
            .lock()
            .unwrap()
            .insert(media_id.to_string(), bytes);
        self
    }

    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = delay;
        self
    }

    pub fn failing_downloads(mut self) -> Self {
        self.fail_download = true;
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStore for CountingMediaStore {
    async fn get(&self, media_id: &str) -> Result<Option<MediaRecord>, MediaError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let known = self.packages.lock().unwrap().contains_key(media_id);
        Ok(known.then(|| MediaRecord {
            file: format!("mem://{}", media_id),
        }))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if !self.download_delay.is_zero() {
            tokio::time::sleep(self.download_delay).await;
        }
        if self.fail_download {
            return Err(MediaError::Status(502, url.to_string()));
        }
        let media_id = url.trim_start_matches("mem://");
        self.packages
            .lock()
            .unwrap()
            .get(media_id)
            .cloned()
            .ok_or_else(|| MediaError::Status(404, url.to_string()))
    }
}
