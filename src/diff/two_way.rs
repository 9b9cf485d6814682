use tracing::{debug, trace};

use super::{
    Datasource, DatasourceKind, Diff, Hunk, HunkKind, HunkRange,
    lcs::{LcsRun, lcs},
    position_list::PositionArena,
    read_source,
    token_index::TokenIndex,
};

/// Computes the 2-way diff between the `Original` and `Modified` sources.
///
/// The result alternates `Modified` hunks, one per gap between matching
/// runs, and `Common` hunks, one per run.
pub fn diff<D: Datasource>(datasource: &mut D) -> Result<Diff, D::Error> {
    let mut index = TokenIndex::new();
    let mut arena = PositionArena::new();

    let original = read_source(datasource, DatasourceKind::Original, &mut index, &mut arena)?;
    let modified = read_source(datasource, DatasourceKind::Modified, &mut index, &mut arena)?;
    trace!(
        original = original.len(),
        modified = modified.len(),
        unique_tokens = index.len(),
        "Sources read"
    );

    let runs = lcs(&mut arena, [original, modified]);
    let diff = Diff::new(hunks_from_runs(&runs));

    datasource.discard_all_tokens();
    debug!(
        hunks = diff.hunks().len(),
        contains_diffs = diff.contains_diffs(),
        "2-way diff assembled"
    );

    Ok(diff)
}

/// Turns LCS runs, 1-based and terminated by the end-of-file run, into
/// hunks with 0-based ranges.
pub(super) fn hunks_from_runs(runs: &[LcsRun]) -> Vec<Hunk> {
    let mut hunks = Vec::with_capacity(runs.len() * 2);
    let mut next = [1, 1];

    for run in runs {
        if run.offsets[0] > next[0] || run.offsets[1] > next[1] {
            hunks.push(Hunk::new(
                HunkKind::Modified,
                HunkRange::new(next[0] - 1, run.offsets[0] - next[0]),
                HunkRange::new(next[1] - 1, run.offsets[1] - next[1]),
                HunkRange::default(),
            ));
        }

        if run.length > 0 {
            hunks.push(Hunk::new(
                HunkKind::Common,
                HunkRange::new(run.offsets[0] - 1, run.length),
                HunkRange::new(run.offsets[1] - 1, run.length),
                HunkRange::default(),
            ));
        }

        next = [run.end(0), run.end(1)];
    }

    hunks
}
