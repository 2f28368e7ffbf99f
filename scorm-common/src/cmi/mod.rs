//! CMI (Computer-Managed Instruction) runtime data model

pub mod element;
pub mod path;
pub mod tree;

pub use element::{
    is_suspend_data_path, normalize_value, truncate_suspend_data, CmiElement, ScormVersion,
    SUSPEND_DATA_LIMIT,
};
pub use path::{is_unsafe_segment, CmiPath, PathError, UNSAFE_KEYS};
pub use tree::{CmiNode, CmiTree};
