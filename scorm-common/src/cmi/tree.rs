//! CMI state tree
//!
//! A trie keyed by path segment. Leaves hold SCORM wire values, which are
//! always strings, even for scores and booleans.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use super::element::normalize_value;
use super::path::{is_unsafe_segment, CmiPath, PathError};
use crate::{Error, Result};

/// A node of the CMI trie
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmiNode {
    Leaf(String),
    Branch(BTreeMap<String, CmiNode>),
}

/// Nested CMI document addressed by dot paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmiTree {
    root: BTreeMap<String, CmiNode>,
}

impl CmiTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Value stored at `path`
    ///
    /// `None` when the path is invalid, unset, or names a group rather than
    /// a value.
    pub fn get(&self, path: &str) -> Option<&str> {
        let path = CmiPath::parse(path).ok()?;
        let mut segments = path.segments();

        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            node = match node {
                CmiNode::Branch(children) => children.get(segment)?,
                CmiNode::Leaf(_) => return None,
            };
        }

        match node {
            CmiNode::Leaf(value) => Some(value.as_str()),
            CmiNode::Branch(_) => None,
        }
    }

    /// True when `path` holds a value
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Write `value` at `path`, creating intermediate groups
    ///
    /// Refuses to descend through an existing value or to replace a group
    /// with a value. The tree is left untouched on error.
    pub fn set(&mut self, path: &str, value: &str) -> std::result::Result<(), PathError> {
        let parsed = CmiPath::parse(path)?;
        let segments: Vec<&str> = parsed.segments().collect();
        let (leaf, parents) = segments.split_last().ok_or(PathError::Empty)?;

        // Nodes created here are always new branches, so an error further
        // down can only be hit before anything was inserted.
        let mut children = &mut self.root;
        for segment in parents {
            children = match children
                .entry((*segment).to_string())
                .or_insert_with(|| CmiNode::Branch(BTreeMap::new()))
            {
                CmiNode::Branch(next) => next,
                CmiNode::Leaf(_) => return Err(PathError::ThroughLeaf(path.to_string())),
            };
        }

        match children.entry((*leaf).to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                CmiNode::Leaf(existing) => {
                    *existing = value.to_string();
                    Ok(())
                }
                CmiNode::Branch(_) => Err(PathError::ReplacesBranch(path.to_string())),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(CmiNode::Leaf(value.to_string()));
                Ok(())
            }
        }
    }

    /// Write `value` at `path` after applying element rules (suspend-data cap)
    pub fn set_normalized(&mut self, path: &str, value: &str) -> std::result::Result<(), PathError> {
        self.set(path, normalize_value(path, value))
    }

    /// Apply a batch of updates, skipping rejected paths
    ///
    /// Returns the number of updates applied.
    pub fn merge<'a, I>(&mut self, updates: I) -> usize
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut applied = 0;
        for (path, value) in updates {
            match self.set_normalized(path, value) {
                Ok(()) => applied += 1,
                Err(e) => debug!(path = %path, error = %e, "Skipping CMI update"),
            }
        }
        applied
    }

    /// Flattened `(path, value)` view, sorted by path
    pub fn leaves(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, children: &BTreeMap<String, CmiNode>, out: &mut Vec<(String, String)>) {
            for (key, node) in children {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                match node {
                    CmiNode::Leaf(value) => out.push((path, value.clone())),
                    CmiNode::Branch(next) => walk(&path, next, out),
                }
            }
        }

        let mut out = Vec::new();
        walk("", &self.root, &mut out);
        out
    }

    /// Nested JSON object form (runtime endpoint wire format)
    pub fn to_json(&self) -> Value {
        fn node_to_json(children: &BTreeMap<String, CmiNode>) -> Value {
            let map: Map<String, Value> = children
                .iter()
                .map(|(key, node)| {
                    let value = match node {
                        CmiNode::Leaf(v) => Value::String(v.clone()),
                        CmiNode::Branch(next) => node_to_json(next),
                    };
                    (key.clone(), value)
                })
                .collect();
            Value::Object(map)
        }

        node_to_json(&self.root)
    }

    /// Build a tree from a nested JSON object
    ///
    /// Numbers and booleans become their string form; nulls, arrays and
    /// unsafe keys are dropped.
    pub fn from_json(value: &Value) -> Result<Self> {
        fn object_to_children(map: &Map<String, Value>) -> BTreeMap<String, CmiNode> {
            let mut children = BTreeMap::new();
            for (key, value) in map {
                if key.is_empty() || key.contains('.') || is_unsafe_segment(key) {
                    continue;
                }
                let node = match value {
                    Value::String(s) => CmiNode::Leaf(s.clone()),
                    Value::Number(n) => CmiNode::Leaf(n.to_string()),
                    Value::Bool(b) => CmiNode::Leaf(b.to_string()),
                    Value::Object(next) => CmiNode::Branch(object_to_children(next)),
                    Value::Null | Value::Array(_) => continue,
                };
                children.insert(key.clone(), node);
            }
            children
        }

        match value {
            Value::Object(map) => Ok(Self {
                root: object_to_children(map),
            }),
            other => Err(Error::InvalidInput(format!(
                "CMI state must be a JSON object, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Serialize for CmiTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CmiTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        CmiTree::from_json(&value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get_returns_value() {
        let mut tree = CmiTree::new();
        for path in [
            "cmi.core.lesson_status",
            "cmi.suspend_data",
            "cmi.interactions.0.id",
            "adl.nav.request",
            "single",
        ] {
            tree.set(path, "v").unwrap();
            assert_eq!(tree.get(path), Some("v"), "{}", path);
        }
    }

    #[test]
    fn test_set_overwrites_existing_leaf() {
        let mut tree = CmiTree::new();
        tree.set("cmi.core.lesson_status", "incomplete").unwrap();
        tree.set("cmi.core.lesson_status", "passed").unwrap();
        assert_eq!(tree.get("cmi.core.lesson_status"), Some("passed"));
    }

    #[test]
    fn test_set_with_unsafe_segment_is_noop() {
        let mut tree = CmiTree::new();
        tree.set("cmi.core.lesson_status", "incomplete").unwrap();
        let before = tree.clone();

        assert!(tree.set("__proto__.polluted", "yes").is_err());
        assert!(tree.set("cmi.constructor.prototype", "yes").is_err());
        assert!(tree.set("cmi.core.prototype", "yes").is_err());

        assert_eq!(tree, before);
        assert_eq!(tree.get("__proto__.polluted"), None);
    }

    #[test]
    fn test_set_refuses_to_descend_through_leaf() {
        let mut tree = CmiTree::new();
        tree.set("cmi.core.lesson_status", "incomplete").unwrap();
        let before = tree.clone();

        let err = tree.set("cmi.core.lesson_status.detail", "x").unwrap_err();
        assert!(matches!(err, PathError::ThroughLeaf(_)));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_set_refuses_to_replace_branch() {
        let mut tree = CmiTree::new();
        tree.set("cmi.core.lesson_status", "incomplete").unwrap();

        let err = tree.set("cmi.core", "flat").unwrap_err();
        assert!(matches!(err, PathError::ReplacesBranch(_)));
        assert_eq!(tree.get("cmi.core.lesson_status"), Some("incomplete"));
    }

    #[test]
    fn test_get_on_branch_or_missing_is_none() {
        let mut tree = CmiTree::new();
        tree.set("cmi.core.lesson_status", "incomplete").unwrap();
        assert_eq!(tree.get("cmi.core"), None);
        assert_eq!(tree.get("cmi.core.missing"), None);
        assert_eq!(tree.get("cmi..core"), None);
        assert_eq!(tree.get(""), None);
    }

    #[test]
    fn test_merge_applies_cap_and_skips_invalid() {
        let mut tree = CmiTree::new();
        let mut updates = BTreeMap::new();
        updates.insert("cmi.suspend_data".to_string(), "z".repeat(5000));
        updates.insert("cmi.__proto__.x".to_string(), "bad".to_string());
        updates.insert("cmi.location".to_string(), "page-3".to_string());

        let applied = tree.merge(&updates);

        assert_eq!(applied, 2);
        assert_eq!(tree.get("cmi.suspend_data").map(str::len), Some(4096));
        assert_eq!(tree.get("cmi.location"), Some("page-3"));
    }

    #[test]
    fn test_json_conversion_is_nested() {
        let mut tree = CmiTree::new();
        tree.set("cmi.core.lesson_status", "completed").unwrap();
        tree.set("cmi.suspend_data", "abc").unwrap();

        assert_eq!(
            tree.to_json(),
            json!({
                "cmi": {
                    "core": { "lesson_status": "completed" },
                    "suspend_data": "abc"
                }
            })
        );
    }

    #[test]
    fn test_from_json_coerces_scalars_and_drops_unsafe_keys() {
        let value = json!({
            "cmi": {
                "score": { "raw": 85, "passed": true },
                "__proto__": { "polluted": "yes" },
                "list": [1, 2],
                "nothing": null
            }
        });

        let tree = CmiTree::from_json(&value).unwrap();
        assert_eq!(tree.get("cmi.score.raw"), Some("85"));
        assert_eq!(tree.get("cmi.score.passed"), Some("true"));
        assert_eq!(
            tree.leaves(),
            vec![
                ("cmi.score.passed".to_string(), "true".to_string()),
                ("cmi.score.raw".to_string(), "85".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(CmiTree::from_json(&json!("cmi")).is_err());
        assert!(CmiTree::from_json(&json!([])).is_err());
    }

    #[test]
    fn test_serde_uses_nested_json() {
        let tree: CmiTree = serde_json::from_str(r#"{"cmi":{"entry":"resume"}}"#).unwrap();
        assert_eq!(tree.get("cmi.entry"), Some("resume"));
        assert_eq!(serde_json::to_string(&tree).unwrap(), r#"{"cmi":{"entry":"resume"}}"#);
    }
}
