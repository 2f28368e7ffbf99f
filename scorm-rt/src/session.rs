//! SCORM session state machine
//!
//! Calls from the SCO are synchronous: the in-memory tree is updated before
//! the call returns, so a `GetValue` right after a `SetValue` sees the new
//! value. Only the network side effect is deferred to the scheduler.
//! `terminate` is the one call that awaits its flush.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scorm_common::cmi::element::{
    CREDIT_CREDIT, ENTRY_AB_INITIO, ENTRY_RESUME, EXIT_SUSPEND, MODE_NORMAL, STATUS_COMPLETED,
    STATUS_NOT_ATTEMPTED, STATUS_UNKNOWN,
};
use scorm_common::cmi::normalize_value;
use scorm_common::{CmiElement, CmiTree, ScormVersion};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::scheduler::CommitScheduler;
use crate::transport::RuntimeTransport;

struct SessionState {
    tree: CmiTree,
    active: bool,
}

/// One learner's runtime session for one lesson
pub struct ScormSession {
    lesson_id: String,
    state: Mutex<SessionState>,
    scheduler: CommitScheduler,
}

impl ScormSession {
    /// Load prior state and prepare the learner context
    ///
    /// A failed load is logged and the session starts from an empty tree.
    /// The session is inactive until `initialize`.
    pub async fn load(
        lesson_id: impl Into<String>,
        transport: Arc<dyn RuntimeTransport>,
        config: &BridgeConfig,
    ) -> Self {
        let lesson_id = lesson_id.into();

        let stored = match transport.load(&lesson_id).await {
            Ok(Some(tree)) => {
                debug!(lesson_id = %lesson_id, "Loaded stored runtime state");
                tree
            }
            Ok(None) => CmiTree::new(),
            Err(e) => {
                warn!(lesson_id = %lesson_id, error = %e, "Runtime state load failed, starting empty");
                CmiTree::new()
            }
        };

        let tree = prepare_context(stored);
        info!(
            lesson_id = %lesson_id,
            entry = tree.get("cmi.entry").unwrap_or_default(),
            "SCORM session ready"
        );

        let scheduler = CommitScheduler::new(lesson_id.clone(), transport, config.commit_debounce);

        Self {
            lesson_id,
            state: Mutex::new(SessionState {
                tree,
                active: false,
            }),
            scheduler,
        }
    }

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    pub fn is_active(&self) -> bool {
        self.lock_state().active
    }

    /// Copy of the current CMI tree
    pub fn snapshot(&self) -> CmiTree {
        self.lock_state().tree.clone()
    }

    /// Number of updates not yet committed
    pub fn pending_updates(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// `Initialize` / `LMSInitialize`
    pub fn initialize(&self) -> bool {
        let mut state = self.lock_state();
        if state.active {
            debug!(lesson_id = %self.lesson_id, "Initialize called on active session");
        }
        state.active = true;
        info!(lesson_id = %self.lesson_id, "SCORM session initialized");
        true
    }

    /// `GetValue` / `LMSGetValue`
    ///
    /// Empty string when inactive, unset, or not a value.
    pub fn get_value(&self, path: &str) -> String {
        let state = self.lock_state();
        if !state.active {
            warn!(lesson_id = %self.lesson_id, path = %path, "GetValue on inactive session");
            return String::new();
        }
        state.tree.get(path).unwrap_or_default().to_string()
    }

    /// `SetValue` / `LMSSetValue`
    ///
    /// `false` only when the session is inactive. Writes to rejected paths
    /// (unsafe keys, malformed paths) are dropped without failing the call.
    pub fn set_value(&self, path: &str, value: &str) -> bool {
        let value = normalize_value(path, value);
        {
            let mut state = self.lock_state();
            if !state.active {
                warn!(lesson_id = %self.lesson_id, path = %path, "SetValue on inactive session");
                return false;
            }
            if let Err(e) = state.tree.set(path, value) {
                warn!(lesson_id = %self.lesson_id, error = %e, "SetValue dropped");
                return true;
            }
        }

        self.scheduler.enqueue(path, value);
        self.scheduler.schedule_flush();
        true
    }

    /// `Commit` / `LMSCommit`
    ///
    /// Starts a send and returns without waiting for it.
    pub fn commit(&self) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(lesson_id = %self.lesson_id, "No async runtime, commit deferred");
            return true;
        };

        let scheduler = self.scheduler.clone();
        handle.spawn(async move {
            // Failure is logged and re-queued inside
            let _ = scheduler.flush_now().await;
        });
        true
    }

    /// `Terminate` / `LMSFinish`
    ///
    /// Marks the exit as `suspend` so the learner can resume, promotes a
    /// SCORM 1.2 `not attempted` status to `completed`, and waits for the
    /// final flush. The session is deactivated even when the flush fails.
    pub async fn terminate(&self, version: ScormVersion) -> bool {
        {
            let mut state = self.lock_state();
            if !state.active {
                warn!(lesson_id = %self.lesson_id, "Terminate on inactive session");
                return false;
            }

            if let Some(exit_path) = CmiElement::Exit.path(version) {
                self.write_internal(&mut state.tree, exit_path, EXIT_SUSPEND);
            }

            if version == ScormVersion::Scorm12 {
                if let Some(status_path) = CmiElement::LessonStatus.path(ScormVersion::Scorm12) {
                    if state.tree.get(status_path) == Some(STATUS_NOT_ATTEMPTED) {
                        self.write_internal(&mut state.tree, status_path, STATUS_COMPLETED);
                    }
                }
            }
        }

        if let Err(e) = self.scheduler.flush_now().await {
            warn!(
                lesson_id = %self.lesson_id,
                error = %e,
                pending = self.scheduler.pending_len(),
                "Final flush failed"
            );
        }

        self.lock_state().active = false;
        info!(lesson_id = %self.lesson_id, "SCORM session terminated");
        true
    }

    /// Page is unloading: mark the exit and beacon what is pending
    ///
    /// Does nothing unless the session is active.
    pub fn handle_unload(&self) -> bool {
        {
            let mut state = self.lock_state();
            if !state.active {
                return false;
            }
            for path in CmiElement::Exit.paths() {
                self.write_internal(&mut state.tree, path, EXIT_SUSPEND);
            }
        }

        let sent = self.scheduler.beacon_pending();
        info!(lesson_id = %self.lesson_id, updates = sent, "Unload beacon sent");
        true
    }

    /// Stop the debounce timer; pending updates stay unsent
    pub fn detach(&self) {
        self.scheduler.cancel_timer();
        let pending = self.scheduler.pending_len();
        if pending > 0 {
            debug!(lesson_id = %self.lesson_id, pending, "Session detached with uncommitted updates");
        }
    }

    fn write_internal(&self, tree: &mut CmiTree, path: &str, value: &str) {
        match tree.set(path, value) {
            Ok(()) => self.scheduler.enqueue(path, value),
            Err(e) => warn!(lesson_id = %self.lesson_id, error = %e, "Runtime write failed"),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Populate learner context in both namespaces
///
/// `entry` is `resume` when suspend data survived a previous session.
/// Status defaults never overwrite stored values.
fn prepare_context(mut tree: CmiTree) -> CmiTree {
    let resumed = CmiElement::SuspendData
        .paths()
        .any(|path| tree.get(path).is_some_and(|v| !v.is_empty()));
    let entry = if resumed { ENTRY_RESUME } else { ENTRY_AB_INITIO };

    let context = [
        (CmiElement::Entry, entry),
        (CmiElement::Mode, MODE_NORMAL),
        (CmiElement::Credit, CREDIT_CREDIT),
    ];
    for (element, value) in context {
        for path in element.paths() {
            if let Err(e) = tree.set(path, value) {
                warn!(path = %path, error = %e, "Could not set learner context");
            }
        }
    }

    let defaults = [
        (CmiElement::LessonStatus, STATUS_NOT_ATTEMPTED),
        (CmiElement::CompletionStatus, STATUS_UNKNOWN),
    ];
    for (element, value) in defaults {
        for path in element.paths() {
            if !tree.contains(path) {
                if let Err(e) = tree.set(path, value) {
                    warn!(path = %path, error = %e, "Could not set status default");
                }
            }
        }
    }

    tree
}
