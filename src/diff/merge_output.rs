use std::convert::Infallible;

use tracing::debug;

use super::{Diff, DiffOutput, HunkRange, TextDatasource, diff3};
use crate::{
    BuiltinTokenizer,
    config::{Config, OutputConfig},
};

/// Names shown next to the conflict markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeLabels<'a> {
    pub original: &'a str,
    pub modified: &'a str,
    pub latest: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub text: String,

    /// Number of conflict blocks written into `text`.
    pub conflicts: usize,
}

impl MergeResult {
    pub fn has_conflicts(&self) -> bool { self.conflicts > 0 }
}

/// Renders a 3-way line diff as merged text: unchanged and one-sided
/// regions are taken over, conflicts are written between markers.
#[derive(Debug)]
pub struct MergeOutput<'a> {
    lines: [Vec<&'a str>; 3],
    markers: [String; 4],
    display_original_in_conflict: bool,
    display_resolved_conflicts: bool,

    text: String,
    conflicts: usize,
}

impl<'a> MergeOutput<'a> {
    pub fn new(
        original: &'a str,
        modified: &'a str,
        latest: &'a str,
        labels: &MergeLabels<'_>,
        config: &OutputConfig,
    ) -> Self {
        MergeOutput {
            lines: [original, modified, latest].map(|text| text.split_inclusive('\n').collect()),
            markers: [
                marker(&config.conflict_modified, labels.modified),
                marker(&config.conflict_original, labels.original),
                config.conflict_separator.clone(),
                marker(&config.conflict_latest, labels.latest),
            ],
            display_original_in_conflict: config.display_original_in_conflict,
            // Resolved parts of a conflict have no original text of their
            // own, so they are only rendered when the original is hidden.
            display_resolved_conflicts: config.display_resolved_conflicts
                && !config.display_original_in_conflict,
            text: String::new(),
            conflicts: 0,
        }
    }

    pub fn render(mut self, diff: &Diff) -> MergeResult {
        let Ok(()) = diff.output(&mut self);

        MergeResult {
            text: self.text,
            conflicts: self.conflicts,
        }
    }

    fn copy_lines(&mut self, index: usize, range: HunkRange) {
        for line in &self.lines[index][range.start..range.end()] {
            self.text.push_str(line);
        }
    }

    fn write_marker(&mut self, index: usize) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(&self.markers[index]);
        self.text.push('\n');
    }
}

fn marker(marker: &str, label: &str) -> String {
    if label.is_empty() {
        marker.to_owned()
    } else {
        format!("{marker} {label}")
    }
}

impl DiffOutput for MergeOutput<'_> {
    type Error = Infallible;

    fn output_common(
        &mut self,
        original: HunkRange,
        _modified: HunkRange,
        _latest: HunkRange,
    ) -> Result<(), Infallible> {
        self.copy_lines(0, original);
        Ok(())
    }

    fn output_diff_modified(
        &mut self,
        _original: HunkRange,
        modified: HunkRange,
        _latest: HunkRange,
    ) -> Result<(), Infallible> {
        self.copy_lines(1, modified);
        Ok(())
    }

    fn output_diff_latest(
        &mut self,
        _original: HunkRange,
        _modified: HunkRange,
        latest: HunkRange,
    ) -> Result<(), Infallible> {
        self.copy_lines(2, latest);
        Ok(())
    }

    fn output_diff_common(
        &mut self,
        _original: HunkRange,
        modified: HunkRange,
        _latest: HunkRange,
    ) -> Result<(), Infallible> {
        self.copy_lines(1, modified);
        Ok(())
    }

    fn output_conflict(
        &mut self,
        original: HunkRange,
        modified: HunkRange,
        latest: HunkRange,
        resolved: Option<&Diff>,
    ) -> Result<(), Infallible> {
        if let Some(resolved) = resolved.filter(|_| self.display_resolved_conflicts) {
            return resolved.output(self);
        }

        self.conflicts += 1;

        self.write_marker(0);
        self.copy_lines(1, modified);

        if self.display_original_in_conflict {
            self.write_marker(1);
            self.copy_lines(0, original);
        }

        self.write_marker(2);
        self.copy_lines(2, latest);
        self.write_marker(3);

        Ok(())
    }
}

/// Line-merges `modified` and `latest`, both derived from `original`.
pub fn merge_text(
    original: &str,
    modified: &str,
    latest: &str,
    labels: &MergeLabels<'_>,
    config: &Config,
) -> MergeResult {
    let mut datasource = TextDatasource::new3(original, modified, latest, &*BuiltinTokenizer::Line);
    let Ok(diff) = diff3(&mut datasource, config.diff.conflict_detection);

    let result = MergeOutput::new(original, modified, latest, labels, &config.output).render(&diff);
    debug!(conflicts = result.conflicts, "Merged texts");

    result
}
