#![warn(missing_docs)]

//! Config codec for tierguard
//!
//! Parses and serializes the three config dialects used by managed mod files
//! (JSON, flat `key=value` properties and a flat TOML subset) into a generic
//! [`ConfigTree`], and provides the deep merge, round-trip validation, content
//! hashing and atomic write primitives everything else is built on.

pub mod error;
pub mod format;
pub mod hash;
pub mod tree;
pub mod writer;

pub use error::{CodecError, Result};
pub use format::ConfigFormat;
pub use hash::{content_hash, file_hash};
pub use tree::{deep_merge, ConfigTree, KeyPath};
pub use writer::AtomicWriter;
