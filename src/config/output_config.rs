use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DEFAULT_CONFLICT_LATEST_MARKER, DEFAULT_CONFLICT_MODIFIED_MARKER,
    DEFAULT_CONFLICT_ORIGINAL_MARKER, DEFAULT_CONFLICT_SEPARATOR, DEFAULT_CONTEXT_LINES,
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    #[serde(default = "default_conflict_modified")]
    pub conflict_modified: String,

    #[serde(default = "default_conflict_original")]
    pub conflict_original: String,

    #[serde(default = "default_conflict_separator")]
    pub conflict_separator: String,

    #[serde(default = "default_conflict_latest")]
    pub conflict_latest: String,

    #[serde(default)]
    pub display_original_in_conflict: bool,

    /// Render the refined sub-diff of a conflict instead of one marker
    /// block. Ignored when the original is displayed.
    #[serde(default)]
    pub display_resolved_conflicts: bool,
}

fn default_context_lines() -> usize {
    debug!("Using default unified diff context: {DEFAULT_CONTEXT_LINES}");
    DEFAULT_CONTEXT_LINES
}

fn default_conflict_modified() -> String {
    debug!("Using default modified marker: {DEFAULT_CONFLICT_MODIFIED_MARKER}");
    DEFAULT_CONFLICT_MODIFIED_MARKER.to_owned()
}

fn default_conflict_original() -> String {
    debug!("Using default original marker: {DEFAULT_CONFLICT_ORIGINAL_MARKER}");
    DEFAULT_CONFLICT_ORIGINAL_MARKER.to_owned()
}

fn default_conflict_separator() -> String {
    debug!("Using default conflict separator: {DEFAULT_CONFLICT_SEPARATOR}");
    DEFAULT_CONFLICT_SEPARATOR.to_owned()
}

fn default_conflict_latest() -> String {
    debug!("Using default latest marker: {DEFAULT_CONFLICT_LATEST_MARKER}");
    DEFAULT_CONFLICT_LATEST_MARKER.to_owned()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            conflict_modified: default_conflict_modified(),
            conflict_original: default_conflict_original(),
            conflict_separator: default_conflict_separator(),
            conflict_latest: default_conflict_latest(),
            display_original_in_conflict: false,
            display_resolved_conflicts: false,
        }
    }
}
