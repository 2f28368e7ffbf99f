//! scorm-rt - SCORM Session Bridge
//!
//! Sits between a third-party SCO (Shareable Content Object) and the
//! runtime-state endpoint. The SCO sees the synchronous SCORM 1.2 (`API`) and
//! SCORM 2004 (`API_1484_11`) surfaces; persistence happens asynchronously
//! behind a debounced commit scheduler.
//!
//! Typical embedding:
//!
//! ```no_run
//! use std::sync::Arc;
//! use scorm_rt::{ApiHost, BridgeConfig, HttpTransport};
//!
//! # async fn run() -> Result<(), scorm_rt::BridgeError> {
//! let config = BridgeConfig::new("http://127.0.0.1:5740");
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let host = ApiHost::new();
//! host.mount("lesson-1", transport, &config).await;
//!
//! host.call("API", "LMSInitialize", &[""]).await?;
//! host.call("API", "LMSSetValue", &["cmi.core.lesson_status", "incomplete"]).await?;
//! host.call("API", "LMSFinish", &[""]).await?;
//! host.unmount();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod host;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use api::{dispatch, RuntimeApi, ScormApi, ScormMethod};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use host::ApiHost;
pub use scheduler::CommitScheduler;
pub use session::ScormSession;
pub use transport::{HttpTransport, RuntimeTransport};

/// SCORM wire value for success
pub const SCORM_TRUE: &str = "true";

/// SCORM wire value for failure
pub const SCORM_FALSE: &str = "false";

/// Convert a bool into the SCORM wire string
pub(crate) fn scorm_bool(value: bool) -> String {
    if value { SCORM_TRUE } else { SCORM_FALSE }.to_string()
}
