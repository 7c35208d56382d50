//! Generic key-value tree shared by every config dialect

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::format::ConfigFormat;

/// Ordered mapping from key to boolean, number, string or nested tree
///
/// Arrays (and JSON `null`) are opaque leaves: they are compared and replaced
/// wholesale, never merged element-wise. Key order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Map<String, Value>);

impl ConfigTree {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a tree from a JSON object, treating any other value as empty
    ///
    /// Intended for static catalog data written with `serde_json::json!`.
    pub fn from_object(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tree has no keys
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `key` is present at the top level
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Top-level value for `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts a top-level value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Iterates top-level entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Top-level keys in order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Borrows the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts into a JSON object value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Looks up a value by key path, descending through nested trees
    pub fn get_path(&self, path: &KeyPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.0.get(first)?;
        for segment in rest {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Sets a value by key path, creating (or replacing non-object) intermediate nodes
    pub fn set_path(&mut self, path: &KeyPath, value: Value) {
        let Some((last, parents)) = path.segments().split_last() else {
            return;
        };
        let mut current = &mut self.0;
        for segment in parents {
            let slot = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.clone(), value);
    }

    /// Every leaf key path in document order
    ///
    /// Nested trees are traversed rather than reported; arrays and scalars are
    /// leaves. An empty nested tree yields no paths.
    pub fn leaf_paths(&self) -> Vec<KeyPath> {
        let mut paths = Vec::new();
        collect_leaves(&self.0, &mut Vec::new(), &mut paths);
        paths
    }
}

fn collect_leaves(map: &Map<String, Value>, prefix: &mut Vec<String>, out: &mut Vec<KeyPath>) {
    for (key, value) in map {
        prefix.push(key.clone());
        match value {
            Value::Object(nested) => collect_leaves(nested, prefix, out),
            _ => out.push(KeyPath(prefix.clone())),
        }
        prefix.pop();
    }
}

impl From<Map<String, Value>> for ConfigTree {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ConfigTree {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CodecError::parse(
                ConfigFormat::Json,
                format!("expected an object at the top level, found {}", kind_of(&other)),
            )),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Path of keys from the root of a tree down to one value
///
/// Segments are kept separate so keys that themselves contain dots
/// (`mixin.ai.pathing` in a properties file) stay addressable. Displayed
/// joined with `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Builds a path from its segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Path segments from the root
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// First segment, if any
    pub fn root(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Whether `self` equals `other` or is one of its ancestors
    pub fn is_prefix_of(&self, other: &KeyPath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Recursively merges `source` into a copy of `target`
///
/// For every key of `source`:
/// - with `preserve_existing`, a key already present in `target` keeps the
///   target's value untouched and is not descended into;
/// - otherwise, if both sides hold nested trees the merge recurses;
/// - otherwise the source value replaces the target value (arrays included).
///
/// Neither input is modified. The merge is not commutative.
pub fn deep_merge(target: &ConfigTree, source: &ConfigTree, preserve_existing: bool) -> ConfigTree {
    ConfigTree(merge_maps(&target.0, &source.0, preserve_existing))
}

fn merge_maps(
    target: &Map<String, Value>,
    source: &Map<String, Value>,
    preserve_existing: bool,
) -> Map<String, Value> {
    let mut result = target.clone();

    for (key, source_value) in source {
        let target_value = target.get(key);

        if preserve_existing && target_value.is_some() {
            continue;
        }

        let merged = match (target_value, source_value) {
            (Some(Value::Object(nested_target)), Value::Object(nested_source)) => {
                Value::Object(merge_maps(nested_target, nested_source, preserve_existing))
            }
            _ => source_value.clone(),
        };
        result.insert(key.clone(), merged);
    }

    result
}
