//! Output tree representation and location rewriting.
//!
//! A completed job's result object is an arbitrarily nested composition of
//! lists and keyed mappings terminated by file records. [`OutputNode`] is
//! the tagged form of that tree; [`rewrite_locations`] replaces each file
//! record's local-filesystem reference with a URL the API can serve back,
//! and [`lookup`] walks the same tree in reverse for artifact retrieval.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

/// One node of a job's output description.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputNode {
    /// Ordered sequence; addressed by zero-based index.
    Sequence(Vec<OutputNode>),
    /// Keyed mapping that is not itself a file record; addressed by key.
    Mapping(IndexMap<String, OutputNode>),
    /// File record: an object carrying a `location` or `path` marker.
    File(FileLeaf),
    /// Anything else. Malformed as an output description, kept verbatim.
    Scalar(Value),
}

/// A file record leaf. All original fields are preserved so the tree
/// round-trips; `path` and `basename` are what artifact retrieval needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLeaf {
    fields: IndexMap<String, Value>,
}

impl FileLeaf {
    /// Local filesystem path and display name, if both are present.
    ///
    /// A leaf missing either is not servable as a file and yields `None`
    /// (the retrieval endpoint turns that into a 404).
    pub fn as_file(&self) -> Option<(&Path, &str)> {
        let path = self.fields.get("path")?.as_str()?;
        let basename = self.fields.get("basename")?.as_str()?;
        Some((Path::new(path), basename))
    }

    /// Overwrite the leaf's `location` with a service-addressable URL.
    pub fn set_location(&mut self, location: String) {
        self.fields
            .insert("location".to_string(), Value::String(location));
    }

    pub fn location(&self) -> Option<&str> {
        self.fields.get("location")?.as_str()
    }
}

impl OutputNode {
    /// Classify a raw JSON value into the tagged tree.
    ///
    /// An object is a file leaf when it carries a `location` or `path` key;
    /// any other object is a mapping to recurse into.
    pub fn from_value(value: Value) -> OutputNode {
        match value {
            Value::Array(items) => {
                OutputNode::Sequence(items.into_iter().map(OutputNode::from_value).collect())
            }
            Value::Object(map) => {
                if map.contains_key("location") || map.contains_key("path") {
                    OutputNode::File(FileLeaf {
                        fields: map.into_iter().collect(),
                    })
                } else {
                    OutputNode::Mapping(
                        map.into_iter()
                            .map(|(k, v)| (k, OutputNode::from_value(v)))
                            .collect(),
                    )
                }
            }
            other => OutputNode::Scalar(other),
        }
    }

    /// Serialize the tree back to plain JSON for the status snapshot.
    pub fn to_value(&self) -> Value {
        match self {
            OutputNode::Sequence(items) => {
                Value::Array(items.iter().map(OutputNode::to_value).collect())
            }
            OutputNode::Mapping(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
            OutputNode::File(leaf) => Value::Object(
                leaf.fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            OutputNode::Scalar(v) => v.clone(),
        }
    }
}

/// Rewrite every file leaf's location to `<base>/<addressing-path>`.
///
/// Sequences contribute their zero-based index to the addressing path,
/// mappings contribute their key. Scalar nodes are logged and left alone;
/// a malformed output never fails the job.
pub fn rewrite_locations(node: &mut OutputNode, base: &str) {
    match node {
        OutputNode::Sequence(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                rewrite_locations(item, &format!("{base}/{index}"));
            }
        }
        OutputNode::Mapping(map) => {
            for (key, value) in map.iter_mut() {
                rewrite_locations(value, &format!("{base}/{key}"));
            }
        }
        OutputNode::File(leaf) => {
            leaf.set_location(base.to_string());
        }
        OutputNode::Scalar(_) => {
            tracing::warn!(location = %base, "could not rewrite malformed output node");
        }
    }
}

/// Walk the tree by a slash-delimited path: numeric segments index into
/// sequences, everything else keys into mappings.
///
/// Out-of-range indices, non-numeric indices into sequences, missing keys,
/// empty segments, and paths descending into leaves all yield `None`.
pub fn lookup<'a>(node: &'a OutputNode, path: &str) -> Option<&'a OutputNode> {
    let mut current = node;
    for segment in path.split('/') {
        if segment.is_empty() {
            return None;
        }
        current = match current {
            OutputNode::Sequence(items) => items.get(segment.parse::<usize>().ok()?)?,
            OutputNode::Mapping(map) => map.get(segment)?,
            OutputNode::File(_) | OutputNode::Scalar(_) => return None,
        };
    }
    Some(current)
}

/// Resolve a dotted path to a servable file, if it names a file leaf with
/// both `path` and `basename`.
pub fn lookup_file(node: &OutputNode, path: &str) -> Option<(PathBuf, String)> {
    match lookup(node, path)? {
        OutputNode::File(leaf) => {
            let (path, basename) = leaf.as_file()?;
            Some((path.to_path_buf(), basename.to_string()))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
