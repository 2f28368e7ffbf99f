//! Dot-delimited CMI paths
//!
//! Every path that reaches the CMI tree goes through [`CmiPath::parse`], which
//! is where the unsafe-key guard lives. Content packages are third-party code
//! and their `SetValue` arguments are untrusted.

use std::fmt;
use thiserror::Error;

/// Segments that are never created or written in a CMI tree
pub const UNSAFE_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Path rejection reasons
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty CMI path")]
    Empty,

    #[error("empty segment in CMI path '{0}'")]
    EmptySegment(String),

    #[error("unsafe segment '{segment}' in CMI path '{path}'")]
    UnsafeSegment { path: String, segment: String },

    #[error("CMI path '{0}' descends through a value")]
    ThroughLeaf(String),

    #[error("CMI path '{0}' names a group, not a value")]
    ReplacesBranch(String),
}

/// Returns true for segments on the unsafe-key blocklist
pub fn is_unsafe_segment(segment: &str) -> bool {
    UNSAFE_KEYS.contains(&segment)
}

/// A validated CMI path such as `cmi.core.lesson_status`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CmiPath {
    raw: String,
}

impl CmiPath {
    /// Parse and validate a dot-delimited path
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(raw.to_string()));
            }
            if is_unsafe_segment(segment) {
                return Err(PathError::UnsafeSegment {
                    path: raw.to_string(),
                    segment: segment.to_string(),
                });
            }
        }

        Ok(Self {
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }

    /// Last segment (the leaf name)
    pub fn leaf(&self) -> &str {
        self.raw.rsplit('.').next().unwrap_or(&self.raw)
    }
}

impl fmt::Display for CmiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
