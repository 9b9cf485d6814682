use serde::{Deserialize, Serialize};
use tracing::debug;

/// How `diff3` treats regions that both sides changed.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDetection {
    /// Any differing token makes the whole region a conflict.
    Basic,

    /// Like `Basic`, but additionally diffs the two conflicting sides against
    /// each other and attaches the result to the conflict hunk.
    #[default]
    Refined,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DiffConfig {
    #[serde(default = "default_conflict_detection")]
    pub conflict_detection: ConflictDetection,
}

fn default_conflict_detection() -> ConflictDetection {
    let mode = ConflictDetection::default();
    debug!("Using default conflict detection: {mode:?}");
    mode
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            conflict_detection: default_conflict_detection(),
        }
    }
}
