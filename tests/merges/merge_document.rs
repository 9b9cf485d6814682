use serde::Deserialize;
use svn_delta_core::{Config, ConflictDetection, MergeLabels, MergeResult};

pub const LABELS: MergeLabels<'static> = MergeLabels {
    original: "base",
    modified: "mine",
    latest: "theirs",
};

/// One merge case: three versions of a text and the merged result.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeDocument {
    name: String,
    original: String,
    modified: String,
    latest: String,
    expected: String,
    #[serde(default)]
    conflicts: usize,
    #[serde(default)]
    conflict_detection: Option<ConflictDetection>,
    #[serde(default)]
    display_original_in_conflict: bool,
}

impl MergeDocument {
    pub fn name(&self) -> &str { &self.name }

    pub fn original(&self) -> &str { &self.original }

    pub fn modified(&self) -> &str { &self.modified }

    pub fn latest(&self) -> &str { &self.latest }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(conflict_detection) = self.conflict_detection {
            config.diff.conflict_detection = conflict_detection;
        }
        config.output.display_original_in_conflict = self.display_original_in_conflict;
        config
    }

    pub fn assert_eq(&self, result: &MergeResult) {
        pretty_assertions::assert_eq!(result.text, self.expected, "text of '{}'", self.name);
        pretty_assertions::assert_eq!(result.conflicts, self.conflicts, "conflicts of '{}'", self.name);
    }
}
