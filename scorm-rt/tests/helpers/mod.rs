//! Test doubles for the runtime transport

#![allow(dead_code)]

use async_trait::async_trait;
use scorm_common::CmiTree;
use scorm_rt::{BridgeError, BridgeResult, RuntimeTransport};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory transport that records every call
#[derive(Default)]
pub struct MockTransport {
    pub stored: Mutex<Option<CmiTree>>,
    pub commits: Mutex<Vec<BTreeMap<String, String>>>,
    pub beacons: Mutex<Vec<BTreeMap<String, String>>>,
    pub loads: AtomicUsize,
    pub fail_load: AtomicBool,
    pub fail_commit: AtomicBool,
}

impl MockTransport {
    pub fn with_state(tree: CmiTree) -> Self {
        let transport = Self::default();
        *transport.stored.lock().unwrap() = Some(tree);
        transport
    }

    pub fn commit_count(&self) -> usize {
        self.commits.lock().unwrap().len()
    }

    pub fn commits(&self) -> Vec<BTreeMap<String, String>> {
        self.commits.lock().unwrap().clone()
    }

    pub fn beacons(&self) -> Vec<BTreeMap<String, String>> {
        self.beacons.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuntimeTransport for MockTransport {
    async fn load(&self, _lesson_id: &str) -> BridgeResult<Option<CmiTree>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(BridgeError::Network("connection refused".to_string()));
        }
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn commit(&self, _lesson_id: &str, updates: &BTreeMap<String, String>) -> BridgeResult<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(BridgeError::Status(503, "unavailable".to_string()));
        }
        self.commits.lock().unwrap().push(updates.clone());
        Ok(())
    }

    fn beacon(&self, _lesson_id: &str, updates: BTreeMap<String, String>) {
        self.beacons.lock().unwrap().push(updates);
    }
}
