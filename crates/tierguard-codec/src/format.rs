//! Parsing and serialization for the supported config dialects
//!
//! JSON parsing is strict. Properties and TOML parsing are permissive: blank
//! lines and `#` comments are skipped, each remaining line is split at its
//! first `=`, and lines that do not fit are dropped without error so a stray
//! malformed line only loses that line.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{CodecError, Result};
use crate::tree::ConfigTree;

/// Header written at the top of properties and TOML files
const FILE_HEADER: &str = "# Configuration file";

/// On-disk dialect of a managed config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// Pretty-printed JSON object
    Json,
    /// Flat `key=value` Java-style properties
    Properties,
    /// Flat TOML subset with at most one section header
    Toml,
}

impl ConfigFormat {
    /// Every supported format
    pub const ALL: [ConfigFormat; 3] = [Self::Json, Self::Properties, Self::Toml];

    /// File extension associated with the format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Properties => "properties",
            Self::Toml => "toml",
        }
    }

    /// Detects the format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|format| format.extension() == ext)
    }

    /// Detects the format from a path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Parses `content` into a tree
    ///
    /// Only JSON can fail; properties and TOML never do.
    pub fn parse(self, content: &str) -> Result<ConfigTree> {
        match self {
            Self::Json => parse_json(content),
            Self::Properties => Ok(parse_flat(content, false)),
            Self::Toml => Ok(parse_flat(content, true)),
        }
    }

    /// Serializes a tree
    ///
    /// `section` is only meaningful for TOML, where it becomes a `[section]`
    /// header. Flat formats silently skip values they cannot represent (nested
    /// trees, arrays, nulls); [`ConfigFormat::round_trip_valid`] catches the loss.
    pub fn serialize(self, tree: &ConfigTree, section: Option<&str>) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(tree.as_map())
                .map_err(|e| CodecError::Serialize(e.to_string())),
            Self::Properties => Ok(serialize_properties(tree)),
            Self::Toml => Ok(serialize_toml(tree, section)),
        }
    }

    /// Whether reparsing `serialized` yields a tree structurally equal to `tree`
    pub fn round_trip_valid(self, tree: &ConfigTree, serialized: &str) -> bool {
        match self.parse(serialized) {
            Ok(reparsed) => reparsed == *tree,
            Err(_) => false,
        }
    }

    /// Serializes `tree` and checks the result survives a reparse
    ///
    /// `file` only labels the error.
    pub fn serialize_validated(
        self,
        tree: &ConfigTree,
        section: Option<&str>,
        file: &str,
    ) -> Result<String> {
        let content = self.serialize(tree, section)?;
        if self.round_trip_valid(tree, &content) {
            Ok(content)
        } else {
            Err(CodecError::RoundTrip {
                file: file.to_string(),
            })
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn parse_json(content: &str) -> Result<ConfigTree> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| CodecError::parse(ConfigFormat::Json, e.to_string()))?;
    ConfigTree::try_from(value)
}

fn parse_flat(content: &str, skip_sections: bool) -> ConfigTree {
    let mut tree = ConfigTree::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if skip_sections && trimmed.starts_with('[') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        tree.insert(key, infer_scalar(value.trim()));
    }

    tree
}

/// Infers a boolean, number or string from a flat-format value
fn infer_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Some(number) = parse_number(raw) {
        return Value::Number(number);
    }

    let unquoted = raw
        .strip_prefix(['"', '\''])
        .unwrap_or(raw);
    let unquoted = unquoted
        .strip_suffix(['"', '\''])
        .unwrap_or(unquoted);
    Value::String(unquoted.to_string())
}

fn parse_number(raw: &str) -> Option<Number> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Number::from(n));
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Some(Number::from(n));
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Renders a scalar for a flat format, `None` when it cannot be represented
fn render_scalar(value: &Value, always_quote: bool) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if always_quote => Some(format!("\"{s}\"")),
        Value::String(s) => {
            // Bare only when the parser would read it back unchanged
            let reads_back = s.trim() == s && infer_scalar(s) == Value::String(s.clone());
            if reads_back {
                Some(s.clone())
            } else {
                Some(format!("\"{s}\""))
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn serialize_properties(tree: &ConfigTree) -> String {
    let mut out = format!("{FILE_HEADER}\n");
    for (key, value) in tree.iter() {
        if let Some(rendered) = render_scalar(value, false) {
            out.push_str(&format!("{key}={rendered}\n"));
        }
    }
    out
}

fn serialize_toml(tree: &ConfigTree, section: Option<&str>) -> String {
    let mut out = format!("{FILE_HEADER}\n");
    if let Some(section) = section.filter(|s| !s.is_empty()) {
        out.push_str(&format!("[{section}]\n"));
    }
    for (key, value) in tree.iter() {
        if let Some(rendered) = render_scalar(value, true) {
            out.push_str(&format!("{key} = {rendered}\n"));
        }
    }
    out
}
