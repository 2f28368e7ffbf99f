//! Mount/unmount of the API surfaces
//!
//! The surfaces are attached only after the session's initial load has
//! finished, so a SCO can never read before historical data exists. After
//! `unmount` every call fails with `ApiUnavailable`, the equivalent of the
//! content finding its global API object gone.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use scorm_common::ScormVersion;
use tracing::{debug, info};

use crate::api::{dispatch, RuntimeApi};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::session::ScormSession;
use crate::transport::RuntimeTransport;

struct Mounted {
    session: Arc<ScormSession>,
    surfaces: HashMap<ScormVersion, Arc<RuntimeApi>>,
}

/// Holds the API surfaces exposed to embedded content
#[derive(Default)]
pub struct ApiHost {
    mounted: RwLock<Option<Mounted>>,
}

impl ApiHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the session, then expose `API` and `API_1484_11`
    ///
    /// Mounting over an existing session unmounts it first.
    pub async fn mount(
        &self,
        lesson_id: &str,
        transport: Arc<dyn RuntimeTransport>,
        config: &BridgeConfig,
    ) -> Arc<ScormSession> {
        let session = Arc::new(ScormSession::load(lesson_id, transport, config).await);

        let surfaces = HashMap::from([
            (ScormVersion::Scorm12, Arc::new(RuntimeApi::scorm12(session.clone()))),
            (ScormVersion::Scorm2004, Arc::new(RuntimeApi::scorm2004(session.clone()))),
        ]);

        let previous = self
            .mounted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Mounted {
                session: session.clone(),
                surfaces,
            });
        if let Some(previous) = previous {
            debug!(lesson_id = %previous.session.lesson_id(), "Replacing mounted session");
            previous.session.detach();
        }

        info!(lesson_id = %lesson_id, "SCORM API mounted");
        session
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The surface published under `name` (`API` or `API_1484_11`)
    pub fn surface(&self, name: &str) -> BridgeResult<Arc<RuntimeApi>> {
        let version = ScormVersion::from_api_object_name(name)
            .ok_or_else(|| BridgeError::ApiUnavailable(name.to_string()))?;

        self.mounted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|m| m.surfaces.get(&version).cloned())
            .ok_or_else(|| BridgeError::ApiUnavailable(name.to_string()))
    }

    /// Invoke `surface.method(args...)` as the content would
    pub async fn call(&self, surface: &str, method: &str, args: &[&str]) -> BridgeResult<String> {
        let api = self.surface(surface)?;
        dispatch(api.as_ref(), method, args)
            .await
            .ok_or_else(|| BridgeError::UnknownMethod(method.to_string()))
    }

    /// Forward a page-unload notification; `false` when nothing is mounted
    /// or the session is inactive
    pub fn before_unload(&self) -> bool {
        let session = self
            .mounted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|m| m.session.clone());

        session.is_some_and(|s| s.handle_unload())
    }

    /// Remove the surfaces
    pub fn unmount(&self) {
        let previous = self
            .mounted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(previous) = previous {
            previous.session.detach();
            info!(lesson_id = %previous.session.lesson_id(), "SCORM API unmounted");
        }
    }
}
