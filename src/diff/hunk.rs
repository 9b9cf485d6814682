use serde::{Deserialize, Serialize};

/// A 0-based range of tokens within one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HunkRange {
    pub start: usize,
    pub length: usize,
}

impl HunkRange {
    pub fn new(start: usize, length: usize) -> Self { HunkRange { start, length } }

    pub fn end(&self) -> usize { self.start + self.length }

    pub fn is_empty(&self) -> bool { self.length == 0 }
}

/// Classification of one region of a diff.
///
/// `Common` and `Modified` are the only kinds a 2-way diff produces. In a
/// 3-way diff, `Modified` and `Latest` name the one side that changed the
/// region, `DiffCommon` marks a region both sides changed identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HunkKind {
    Common,
    Modified,
    Latest,
    DiffCommon,
    Conflict,
}

/// One classified region. Ranges of sources that don't take part in the
/// diff (`latest` of a 2-way diff) are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub kind: HunkKind,
    pub original: HunkRange,
    pub modified: HunkRange,
    pub latest: HunkRange,

    /// For conflicts found in refined mode: the same region re-diffed
    /// between the two sides, splitting it into agreeing and conflicting
    /// parts.
    pub resolved: Option<Diff>,
}

impl Hunk {
    pub(crate) fn new(
        kind: HunkKind,
        original: HunkRange,
        modified: HunkRange,
        latest: HunkRange,
    ) -> Self {
        Hunk {
            kind,
            original,
            modified,
            latest,
            resolved: None,
        }
    }
}

/// The complete result of a diff: hunks in source order, covering every
/// token of every source exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    hunks: Vec<Hunk>,
}

impl Diff {
    pub(crate) fn new(hunks: Vec<Hunk>) -> Self { Diff { hunks } }

    pub fn hunks(&self) -> &[Hunk] { &self.hunks }

    pub fn contains_conflicts(&self) -> bool {
        self.hunks
            .iter()
            .any(|hunk| hunk.kind == HunkKind::Conflict)
    }

    /// Whether any region differs between the sources.
    pub fn contains_diffs(&self) -> bool {
        self.hunks
            .iter()
            .any(|hunk| hunk.kind != HunkKind::Common)
    }

    /// Feeds every hunk to the matching method of `output`, stopping at the
    /// first error.
    pub fn output<O: DiffOutput + ?Sized>(&self, output: &mut O) -> Result<(), O::Error> {
        for hunk in &self.hunks {
            let Hunk {
                original,
                modified,
                latest,
                ..
            } = *hunk;

            match hunk.kind {
                HunkKind::Common => output.output_common(original, modified, latest)?,
                HunkKind::Modified => output.output_diff_modified(original, modified, latest)?,
                HunkKind::Latest => output.output_diff_latest(original, modified, latest)?,
                HunkKind::DiffCommon => output.output_diff_common(original, modified, latest)?,
                HunkKind::Conflict => {
                    output.output_conflict(original, modified, latest, hunk.resolved.as_ref())?;
                }
            }
        }

        Ok(())
    }
}

/// Per-kind callbacks receiving the ranges of each hunk. Every method does
/// nothing by default, so a consumer only implements what it renders.
#[allow(unused_variables)]
pub trait DiffOutput {
    type Error;

    fn output_common(
        &mut self,
        original: HunkRange,
        modified: HunkRange,
        latest: HunkRange,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn output_diff_modified(
        &mut self,
        original: HunkRange,
        modified: HunkRange,
        latest: HunkRange,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn output_diff_latest(
        &mut self,
        original: HunkRange,
        modified: HunkRange,
        latest: HunkRange,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn output_diff_common(
        &mut self,
        original: HunkRange,
        modified: HunkRange,
        latest: HunkRange,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn output_conflict(
        &mut self,
        original: HunkRange,
        modified: HunkRange,
        latest: HunkRange,
        resolved: Option<&Diff>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl DiffOutput for Recorder {
        type Error = Infallible;

        fn output_common(
            &mut self,
            original: HunkRange,
            _: HunkRange,
            _: HunkRange,
        ) -> Result<(), Infallible> {
            self.calls.push(format!("common {}", original.start));
            Ok(())
        }

        fn output_conflict(
            &mut self,
            original: HunkRange,
            _: HunkRange,
            _: HunkRange,
            resolved: Option<&Diff>,
        ) -> Result<(), Infallible> {
            self.calls
                .push(format!("conflict {} {}", original.start, resolved.is_some()));
            Ok(())
        }
    }

    #[test]
    fn test_output_dispatches_by_kind() {
        let diff = Diff::new(vec![
            Hunk::new(
                HunkKind::Common,
                HunkRange::new(0, 1),
                HunkRange::new(0, 1),
                HunkRange::new(0, 1),
            ),
            Hunk::new(
                HunkKind::Latest,
                HunkRange::new(1, 1),
                HunkRange::new(1, 1),
                HunkRange::new(1, 2),
            ),
            Hunk::new(
                HunkKind::Conflict,
                HunkRange::new(2, 1),
                HunkRange::new(2, 1),
                HunkRange::new(3, 1),
            ),
        ]);

        let mut recorder = Recorder::default();
        let Ok(()) = diff.output(&mut recorder);

        assert_eq!(recorder.calls, ["common 0", "conflict 2 false"]);
        assert!(diff.contains_conflicts());
        assert!(diff.contains_diffs());
    }

    #[test]
    fn test_empty_diff_has_no_diffs() {
        let diff = Diff::default();
        assert!(!diff.contains_conflicts());
        assert!(!diff.contains_diffs());
    }
}
