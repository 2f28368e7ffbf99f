//! Well-known CMI elements and their SCORM 1.2 / 2004 paths
//!
//! SCORM 1.2 keeps learner context under `cmi.core.*`, SCORM 2004 flattens it
//! to `cmi.*`. Both namespaces live in the same tree, so the element table
//! below is what keeps the two API surfaces consistent.

use serde::{Deserialize, Serialize};

/// Maximum stored size of suspend data, in bytes
pub const SUSPEND_DATA_LIMIT: usize = 4096;

pub const STATUS_NOT_ATTEMPTED: &str = "not attempted";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_UNKNOWN: &str = "unknown";
pub const EXIT_SUSPEND: &str = "suspend";
pub const ENTRY_RESUME: &str = "resume";
pub const ENTRY_AB_INITIO: &str = "ab-initio";
pub const MODE_NORMAL: &str = "normal";
pub const CREDIT_CREDIT: &str = "credit";

/// SCORM runtime API generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScormVersion {
    /// SCORM 1.2 (`window.API`, `LMS*` calls)
    #[serde(rename = "1.2")]
    Scorm12,
    /// SCORM 2004 (`window.API_1484_11`)
    #[serde(rename = "2004")]
    Scorm2004,
}

impl ScormVersion {
    pub const ALL: [ScormVersion; 2] = [ScormVersion::Scorm12, ScormVersion::Scorm2004];

    /// Name of the global API object the content looks up
    pub fn api_object_name(self) -> &'static str {
        match self {
            ScormVersion::Scorm12 => "API",
            ScormVersion::Scorm2004 => "API_1484_11",
        }
    }

    pub fn from_api_object_name(name: &str) -> Option<Self> {
        match name {
            "API" => Some(ScormVersion::Scorm12),
            "API_1484_11" => Some(ScormVersion::Scorm2004),
            _ => None,
        }
    }
}

/// CMI elements the runtime reads or writes itself
///
/// Anything else a package stores (interactions, objectives, vendor
/// extensions) goes through the generic tree untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmiElement {
    LessonStatus,
    CompletionStatus,
    SuccessStatus,
    Entry,
    Exit,
    Mode,
    Credit,
    SuspendData,
    Location,
    ScoreRaw,
    SessionTime,
}

impl CmiElement {
    /// Path of this element in the given namespace
    ///
    /// Returns `None` for elements that only exist in one version
    /// (completion and success status are 2004-only).
    pub fn path(self, version: ScormVersion) -> Option<&'static str> {
        use CmiElement::*;
        use ScormVersion::*;

        let path = match (self, version) {
            (LessonStatus, Scorm12) => "cmi.core.lesson_status",
            (LessonStatus, Scorm2004) => return None,
            (CompletionStatus, Scorm12) => return None,
            (CompletionStatus, Scorm2004) => "cmi.completion_status",
            (SuccessStatus, Scorm12) => return None,
            (SuccessStatus, Scorm2004) => "cmi.success_status",
            (Entry, Scorm12) => "cmi.core.entry",
            (Entry, Scorm2004) => "cmi.entry",
            (Exit, Scorm12) => "cmi.core.exit",
            (Exit, Scorm2004) => "cmi.exit",
            (Mode, Scorm12) => "cmi.core.lesson_mode",
            (Mode, Scorm2004) => "cmi.mode",
            (Credit, Scorm12) => "cmi.core.credit",
            (Credit, Scorm2004) => "cmi.credit",
            (SuspendData, Scorm12) => "cmi.core.suspend_data",
            (SuspendData, Scorm2004) => "cmi.suspend_data",
            (Location, Scorm12) => "cmi.core.lesson_location",
            (Location, Scorm2004) => "cmi.location",
            (ScoreRaw, Scorm12) => "cmi.core.score.raw",
            (ScoreRaw, Scorm2004) => "cmi.score.raw",
            (SessionTime, Scorm12) => "cmi.core.session_time",
            (SessionTime, Scorm2004) => "cmi.session_time",
        };

        Some(path)
    }

    /// Every namespace path this element occupies
    pub fn paths(self) -> impl Iterator<Item = &'static str> {
        ScormVersion::ALL.into_iter().filter_map(move |v| self.path(v))
    }

    /// Reverse lookup from a path to a known element
    pub fn from_path(path: &str) -> Option<(Self, ScormVersion)> {
        const ELEMENTS: [CmiElement; 11] = [
            CmiElement::LessonStatus,
            CmiElement::CompletionStatus,
            CmiElement::SuccessStatus,
            CmiElement::Entry,
            CmiElement::Exit,
            CmiElement::Mode,
            CmiElement::Credit,
            CmiElement::SuspendData,
            CmiElement::Location,
            CmiElement::ScoreRaw,
            CmiElement::SessionTime,
        ];

        ELEMENTS.into_iter().find_map(|element| {
            ScormVersion::ALL
                .into_iter()
                .find(|v| element.path(*v) == Some(path))
                .map(|v| (element, v))
        })
    }
}

/// True for `cmi.suspend_data` and `cmi.core.suspend_data`
pub fn is_suspend_data_path(path: &str) -> bool {
    CmiElement::SuspendData.paths().any(|p| p == path)
}

/// Cap suspend data at [`SUSPEND_DATA_LIMIT`] bytes
///
/// Cuts on a char boundary, so multi-byte input may come back a few bytes
/// short of the limit. ASCII input is cut to exactly the limit.
pub fn truncate_suspend_data(value: &str) -> &str {
    if value.len() <= SUSPEND_DATA_LIMIT {
        return value;
    }

    let mut end = SUSPEND_DATA_LIMIT;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Apply per-element value rules before a write
pub fn normalize_value<'a>(path: &str, value: &'a str) -> &'a str {
    if is_suspend_data_path(path) {
        truncate_suspend_data(value)
    } else {
        value
    }
}
