use tracing::{debug, trace};

use super::{
    Datasource, DatasourceKind, Diff, Hunk, HunkKind, HunkRange,
    lcs::{LcsRun, lcs},
    position_list::{PositionArena, PositionList},
    read_source,
    token_index::TokenIndex,
};
use crate::config::ConflictDetection;

/// Computes the 3-way diff of `Modified` and `Latest` against their common
/// ancestor `Original`.
///
/// Regions changed by only one side become `Modified` or `Latest` hunks.
/// Regions changed by both become `DiffCommon` when both sides hold the same
/// tokens and `Conflict` otherwise. With [`ConflictDetection::Refined`],
/// conflicts additionally carry a resolved diff of the two sides against
/// each other, telling apart the parts they agree on.
pub fn diff3<D: Datasource>(
    datasource: &mut D,
    conflict_detection: ConflictDetection,
) -> Result<Diff, D::Error> {
    let mut index = TokenIndex::new();
    let mut arena = PositionArena::new();

    let original = read_source(datasource, DatasourceKind::Original, &mut index, &mut arena)?;
    let modified = read_source(datasource, DatasourceKind::Modified, &mut index, &mut arena)?;
    let latest = read_source(datasource, DatasourceKind::Latest, &mut index, &mut arena)?;
    trace!(
        original = original.len(),
        modified = modified.len(),
        latest = latest.len(),
        unique_tokens = index.len(),
        "Sources read"
    );

    let original_modified = lcs(&mut arena, [original, modified]);
    let original_latest = lcs(&mut arena, [original, latest]);

    let diff = Merger {
        arena: &mut arena,
        modified,
        latest,
        conflict_detection,
    }
    .merge(&original_modified, &original_latest);

    datasource.discard_all_tokens();
    debug!(
        hunks = diff.hunks().len(),
        contains_conflicts = diff.contains_conflicts(),
        ?conflict_detection,
        "3-way diff assembled"
    );

    Ok(diff)
}

struct Merger<'a> {
    arena: &'a mut PositionArena,
    modified: PositionList,
    latest: PositionList,
    conflict_detection: ConflictDetection,
}

impl Merger<'_> {
    /// Walks both LCS run lists in lockstep. Offsets are 1-based until a
    /// hunk is emitted.
    fn merge(mut self, original_modified: &[LcsRun], original_latest: &[LcsRun]) -> Diff {
        let mut hunks = Vec::new();
        let (mut om, mut ol) = (0, 0);
        let mut start = [1, 1, 1];

        loop {
            let original_sync = find_sync_point(original_modified, &mut om, original_latest, &mut ol);
            let (run_m, run_l) = (original_modified[om], original_latest[ol]);

            let modified_sync = run_m.offsets[1] + (original_sync - run_m.offsets[0]);
            let latest_sync = run_l.offsets[1] + (original_sync - run_l.offsets[0]);

            let is_modified = run_m.offsets[0] > start[0] || run_m.offsets[1] > start[1];
            let is_latest = run_l.offsets[0] > start[0] || run_l.offsets[1] > start[2];

            if is_modified || is_latest {
                let original = range(start[0], original_sync);
                let modified = range(start[1], modified_sync);
                let latest = range(start[2], latest_sync);

                hunks.push(match (is_modified, is_latest) {
                    (true, true) => self.both_changed(original, modified, latest),
                    (true, false) => Hunk::new(HunkKind::Modified, original, modified, latest),
                    _ => Hunk::new(HunkKind::Latest, original, modified, latest),
                });
            }

            if run_m.length == 0 && run_l.length == 0 {
                break;
            }

            let common = (run_m.length - (original_sync - run_m.offsets[0]))
                .min(run_l.length - (original_sync - run_l.offsets[0]));
            if common > 0 {
                hunks.push(Hunk::new(
                    HunkKind::Common,
                    range(original_sync, original_sync + common),
                    range(modified_sync, modified_sync + common),
                    range(latest_sync, latest_sync + common),
                ));
            }

            start = [
                original_sync + common,
                modified_sync + common,
                latest_sync + common,
            ];

            while original_modified[om].length > 0
                && start[0] >= original_modified[om].end(0)
            {
                om += 1;
            }
            while original_latest[ol].length > 0 && start[0] >= original_latest[ol].end(0) {
                ol += 1;
            }
        }

        Diff::new(hunks)
    }

    fn both_changed(&mut self, original: HunkRange, modified: HunkRange, latest: HunkRange) -> Hunk {
        let agree = modified.length == latest.length
            && (0..modified.length).all(|i| {
                self.arena.node(self.modified.at(modified.start + 1 + i))
                    == self.arena.node(self.latest.at(latest.start + 1 + i))
            });

        if agree {
            return Hunk::new(HunkKind::DiffCommon, original, modified, latest);
        }

        let mut hunk = Hunk::new(HunkKind::Conflict, original, modified, latest);
        if self.conflict_detection == ConflictDetection::Refined {
            hunk.resolved = self.resolve_conflict(original, modified, latest);
        }
        hunk
    }

    /// Diffs the two sides of a conflict against each other: matching runs
    /// become `DiffCommon`, the gaps between them the narrower conflicts.
    /// Every part keeps the whole original range of the conflict. Returns
    /// `None` when the sides share nothing.
    fn resolve_conflict(
        &mut self,
        original: HunkRange,
        modified: HunkRange,
        latest: HunkRange,
    ) -> Option<Diff> {
        if modified.is_empty() || latest.is_empty() {
            return None;
        }

        let runs = lcs(
            self.arena,
            [
                self.modified.slice(modified.start + 1, modified.length),
                self.latest.slice(latest.start + 1, latest.length),
            ],
        );
        if runs.len() < 2 {
            return None;
        }

        let mut hunks = Vec::with_capacity(runs.len() * 2);
        let mut next = [modified.start + 1, latest.start + 1];
        for run in runs {
            if run.offsets[0] > next[0] || run.offsets[1] > next[1] {
                hunks.push(Hunk::new(
                    HunkKind::Conflict,
                    original,
                    range(next[0], run.offsets[0]),
                    range(next[1], run.offsets[1]),
                ));
            }

            if run.length > 0 {
                hunks.push(Hunk::new(
                    HunkKind::DiffCommon,
                    original,
                    range(run.offsets[0], run.end(0)),
                    range(run.offsets[1], run.end(1)),
                ));
            }

            next = [run.end(0), run.end(1)];
        }

        Some(Diff::new(hunks))
    }
}

/// Advances the two run cursors to the next offset of the original both
/// LCS agree is the start of (or lies inside) a matching run, and returns
/// it.
fn find_sync_point(
    original_modified: &[LcsRun],
    om: &mut usize,
    original_latest: &[LcsRun],
    ol: &mut usize,
) -> usize {
    loop {
        let (leading, trailing, cursor) =
            if original_modified[*om].offsets[0] > original_latest[*ol].offsets[0] {
                (original_modified[*om], original_latest, &mut *ol)
            } else {
                (original_latest[*ol], original_modified, &mut *om)
            };

        let sync = leading.offsets[0];
        while trailing[*cursor].end(0) < sync {
            *cursor += 1;
        }

        // A run ending right at the end of the original may still be
        // followed by insertions on its side; step onto the end-of-file run
        // so they are not lost.
        let run = trailing[*cursor];
        if leading.length == 0
            && run.length > 0
            && run.end(0) == sync
            && run.end(1) != trailing[*cursor + 1].offsets[1]
        {
            *cursor += 1;
        }

        if trailing[*cursor].offsets[0] <= sync {
            return sync;
        }
    }
}

/// The 0-based hunk range covering the 1-based offsets `from .. to`.
fn range(from: usize, to: usize) -> HunkRange { HunkRange::new(from - 1, to - from) }
