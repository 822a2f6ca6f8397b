use std::path::Path;

use liveset_extract::schema::MERGE_MARKER;
use liveset_extract::DocumentPaths;
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, MergeResult};

/// Configuration for a merge run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Ids at or below this value are structural and never renumbered.
    pub pointee_threshold: i64,
    /// Prefix written onto the name of every track moved during
    /// conflict resolution.
    pub conflict_prefix: String,
    /// Attribute flagging tracks that come from the incoming set.
    pub merge_marker: String,
    pub paths: DocumentPaths,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            pointee_threshold: 1000,
            conflict_prefix: "conflict-".into(),
            merge_marker: MERGE_MARKER.into(),
            paths: DocumentPaths::default(),
        }
    }
}

impl MergeConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> MergeResult<Self> {
        toml::from_str(input).map_err(|e| MergeError::Config(e.to_string()))
    }

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> MergeResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MergeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
