//! Token based 2-way and 3-way diffs.
//!
//! Every source is pulled from a [`Datasource`], interned into a
//! [`token_index::TokenIndex`] and laid out as a position ring; the LCS of
//! two rings drives the assembly of [`Hunk`]s.

pub mod datasource;
pub mod hunk;
mod lcs;
pub mod merge_output;
mod position_list;
pub mod text_datasource;
mod three_way;
mod token_index;
mod two_way;
pub mod unified;

pub use datasource::{Datasource, DatasourceKind, SliceDatasource};
pub use hunk::{Diff, DiffOutput, Hunk, HunkKind, HunkRange};
pub use merge_output::{MergeLabels, MergeOutput, MergeResult, merge_text};
pub use text_datasource::TextDatasource;
pub use three_way::diff3;
pub use two_way::diff;
pub use unified::{UnifiedDiff, unified_diff};

use position_list::{PositionArena, PositionList};
use token_index::TokenIndex;

/// Reads one source to its end, interning every token and returning its
/// position list. Duplicates of already interned tokens are handed back to
/// the datasource right away.
fn read_source<D: Datasource>(
    datasource: &mut D,
    kind: DatasourceKind,
    index: &mut TokenIndex<D::Token>,
    arena: &mut PositionArena,
) -> Result<PositionList, D::Error> {
    datasource.open(kind)?;

    let mut nodes = Vec::new();
    while let Some(token) = datasource.next_token(kind)? {
        let (node, duplicate) = index.insert(token, |a, b| datasource.compare(a, b));
        if let Some(duplicate) = duplicate {
            datasource.discard_token(duplicate);
        }
        nodes.push(node);
    }

    datasource.close(kind)?;

    Ok(arena.push_list(nodes))
}
