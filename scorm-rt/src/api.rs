//! SCORM 1.2 and 2004 API surfaces
//!
//! Both surfaces are thin adapters over the same [`ScormSession`]. Every call
//! answers with a SCORM wire string; nothing is ever raised to the SCO.
//! The error-code functions report "no error" unconditionally.

use std::sync::Arc;

use async_trait::async_trait;
use scorm_common::ScormVersion;

use crate::scorm_bool;
use crate::session::ScormSession;

/// The calls a SCO can make, independent of naming generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScormMethod {
    Initialize,
    GetValue,
    SetValue,
    Commit,
    Terminate,
    GetLastError,
    GetErrorString,
    GetDiagnostic,
}

impl ScormMethod {
    const ALL: [ScormMethod; 8] = [
        ScormMethod::Initialize,
        ScormMethod::GetValue,
        ScormMethod::SetValue,
        ScormMethod::Commit,
        ScormMethod::Terminate,
        ScormMethod::GetLastError,
        ScormMethod::GetErrorString,
        ScormMethod::GetDiagnostic,
    ];

    /// Function name as exposed on the version's API object
    pub fn name(self, version: ScormVersion) -> &'static str {
        match (self, version) {
            (ScormMethod::Initialize, ScormVersion::Scorm12) => "LMSInitialize",
            (ScormMethod::GetValue, ScormVersion::Scorm12) => "LMSGetValue",
            (ScormMethod::SetValue, ScormVersion::Scorm12) => "LMSSetValue",
            (ScormMethod::Commit, ScormVersion::Scorm12) => "LMSCommit",
            (ScormMethod::Terminate, ScormVersion::Scorm12) => "LMSFinish",
            (ScormMethod::GetLastError, ScormVersion::Scorm12) => "LMSGetLastError",
            (ScormMethod::GetErrorString, ScormVersion::Scorm12) => "LMSGetErrorString",
            (ScormMethod::GetDiagnostic, ScormVersion::Scorm12) => "LMSGetDiagnostic",
            (ScormMethod::Initialize, ScormVersion::Scorm2004) => "Initialize",
            (ScormMethod::GetValue, ScormVersion::Scorm2004) => "GetValue",
            (ScormMethod::SetValue, ScormVersion::Scorm2004) => "SetValue",
            (ScormMethod::Commit, ScormVersion::Scorm2004) => "Commit",
            (ScormMethod::Terminate, ScormVersion::Scorm2004) => "Terminate",
            (ScormMethod::GetLastError, ScormVersion::Scorm2004) => "GetLastError",
            (ScormMethod::GetErrorString, ScormVersion::Scorm2004) => "GetErrorString",
            (ScormMethod::GetDiagnostic, ScormVersion::Scorm2004) => "GetDiagnostic",
        }
    }

    /// Resolve a function name on the version's API object
    pub fn parse(version: ScormVersion, name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name(version) == name)
    }
}

/// Interface injected into whatever bridges to the content's execution
/// context (webview, JS engine, test harness)
#[async_trait]
pub trait ScormApi: Send + Sync {
    fn version(&self) -> ScormVersion;

    fn initialize(&self, param: &str) -> String;

    fn get_value(&self, element: &str) -> String;

    fn set_value(&self, element: &str, value: &str) -> String;

    fn commit(&self, param: &str) -> String;

    /// Resolves after the final flush
    async fn terminate(&self, param: &str) -> String;

    fn get_last_error(&self) -> String {
        "0".to_string()
    }

    fn get_error_string(&self, _code: &str) -> String {
        String::new()
    }

    fn get_diagnostic(&self, _code: &str) -> String {
        String::new()
    }
}

/// Session-backed API surface for one SCORM generation
#[derive(Clone)]
pub struct RuntimeApi {
    session: Arc<ScormSession>,
    version: ScormVersion,
}

impl RuntimeApi {
    /// `window.API`
    pub fn scorm12(session: Arc<ScormSession>) -> Self {
        Self {
            session,
            version: ScormVersion::Scorm12,
        }
    }

    /// `window.API_1484_11`
    pub fn scorm2004(session: Arc<ScormSession>) -> Self {
        Self {
            session,
            version: ScormVersion::Scorm2004,
        }
    }

    pub fn session(&self) -> &Arc<ScormSession> {
        &self.session
    }
}

#[async_trait]
impl ScormApi for RuntimeApi {
    fn version(&self) -> ScormVersion {
        self.version
    }

    fn initialize(&self, _param: &str) -> String {
        scorm_bool(self.session.initialize())
    }

    fn get_value(&self, element: &str) -> String {
        self.session.get_value(element)
    }

    fn set_value(&self, element: &str, value: &str) -> String {
        scorm_bool(self.session.set_value(element, value))
    }

    fn commit(&self, _param: &str) -> String {
        scorm_bool(self.session.commit())
    }

    async fn terminate(&self, _param: &str) -> String {
        scorm_bool(self.session.terminate(self.version).await)
    }
}

/// Route a call by function name
///
/// Missing arguments are treated as empty strings, the way a JS caller
/// omitting them would be. `None` when the name is not part of the surface.
pub async fn dispatch(api: &dyn ScormApi, method: &str, args: &[&str]) -> Option<String> {
    let arg = |i: usize| args.get(i).copied().unwrap_or("");

    let result = match ScormMethod::parse(api.version(), method)? {
        ScormMethod::Initialize => api.initialize(arg(0)),
        ScormMethod::GetValue => api.get_value(arg(0)),
        ScormMethod::SetValue => api.set_value(arg(0), arg(1)),
        ScormMethod::Commit => api.commit(arg(0)),
        ScormMethod::Terminate => api.terminate(arg(0)).await,
        ScormMethod::GetLastError => api.get_last_error(),
        ScormMethod::GetErrorString => api.get_error_string(arg(0)),
        ScormMethod::GetDiagnostic => api.get_diagnostic(arg(0)),
    };

    Some(result)
}
