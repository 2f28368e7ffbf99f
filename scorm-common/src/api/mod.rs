//! Runtime API wire types shared by the bridge and the content server

pub mod types;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

pub use types::{ErrorBody, ErrorResponse, RegisterPackageRequest, RuntimeUpdateRequest};

/// Bytes escaped inside one URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Path of the runtime-state endpoint for a lesson
pub fn runtime_path(lesson_id: &str) -> String {
    format!("/api/scorm/lesson/{}/runtime", encode_segment(lesson_id))
}

/// Path of an extracted package file for a lesson
///
/// `/` in `file_path` separates segments; everything else is escaped.
pub fn content_path(lesson_id: &str, file_path: &str) -> String {
    let file_path = file_path
        .trim_start_matches('/')
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/");

    format!(
        "/api/scorm/lesson/{}/content/{}",
        encode_segment(lesson_id),
        file_path
    )
}

/// Header carrying the learner identity (set by the authenticating proxy)
pub const LEARNER_HEADER: &str = "x-learner-id";

/// Learner id used when no identity header is present
pub const ANONYMOUS_LEARNER: &str = "anonymous";
