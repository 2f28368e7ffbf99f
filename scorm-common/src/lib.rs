//! # SCORM Common Library
//!
//! Shared code for the SCORM runtime bridge (scorm-rt) and the content
//! server (scorm-cs):
//! - CMI data model (typed trie, path guard, well-known elements)
//! - Runtime API request/response types
//! - Configuration loading
//! - Path-safety helpers used by the extraction cache
//! - Extension → content type table

pub mod api;
pub mod cmi;
pub mod config;
pub mod error;
pub mod mime;
pub mod paths;

pub use cmi::{CmiElement, CmiPath, CmiTree, ScormVersion};
pub use error::{Error, Result};
