//! The fixed table of managed config files

use std::path::Path;

use tierguard_codec::ConfigFormat;

/// A config file tierguard may read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedFile {
    /// File name inside the config directory
    pub filename: &'static str,
    /// Dialect the file is written in
    pub format: ConfigFormat,
    /// TOML section header emitted when serializing, if any
    pub section: Option<&'static str>,
}

impl ManagedFile {
    /// Location of this file inside `config_dir`
    pub fn path_in(&self, config_dir: &Path) -> std::path::PathBuf {
        config_dir.join(self.filename)
    }
}

/// Every managed file, in apply order
pub const MANAGED_FILES: [ManagedFile; 7] = [
    ManagedFile {
        filename: "sodium-options.json",
        format: ConfigFormat::Json,
        section: None,
    },
    ManagedFile {
        filename: "lithium.properties",
        format: ConfigFormat::Properties,
        section: None,
    },
    ManagedFile {
        filename: "ferritecore-common.toml",
        format: ConfigFormat::Toml,
        section: Some("mixin"),
    },
    ManagedFile {
        filename: "entityculling.json",
        format: ConfigFormat::Json,
        section: None,
    },
    ManagedFile {
        filename: "immediatelyfast.json",
        format: ConfigFormat::Json,
        section: None,
    },
    ManagedFile {
        filename: "modernfix-mixins.properties",
        format: ConfigFormat::Properties,
        section: None,
    },
    ManagedFile {
        filename: "sodiumleafculling.json",
        format: ConfigFormat::Json,
        section: None,
    },
];

/// Looks up a managed file by name
pub fn managed_file(filename: &str) -> Option<&'static ManagedFile> {
    MANAGED_FILES.iter().find(|f| f.filename == filename)
}
