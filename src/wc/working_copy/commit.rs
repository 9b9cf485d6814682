use tracing::debug;

use super::{WorkingCopy, check_cancel};
use crate::{
    cancel::CancelCheck,
    wc::{NodeRow, RelPath, RepoLocation, Revision, RowStore, Txn, WcError},
};

impl<S: RowStore> WorkingCopy<S> {
    /// Folds the local changes at and below `path` into the base layer,
    /// once the repository accepted them as `new_revision`. Returns the
    /// committed paths.
    ///
    /// `path` must be the root of a local operation, or a base node, whose
    /// parent is in the base layer, and nothing below it may be in conflict.
    /// Visible nodes become base nodes of the new revision, deleted ones are
    /// removed. Unchanged base nodes keep their revision.
    pub fn commit(
        &mut self,
        path: &RelPath,
        new_revision: Revision,
        cancel: &impl CancelCheck,
    ) -> Result<Vec<RelPath>, WcError> {
        self.transaction(|txn, _| {
            let Some(top) = txn.top_row(path)? else {
                return Err(WcError::NodeNotFound(path.clone()));
            };

            if let Some(parent) = path.parent() {
                let parent_rows = txn.rows_at(&parent)?;
                if top.op_depth > 0 && parent_rows.iter().any(|row| row.op_depth == top.op_depth) {
                    return Err(WcError::NotOperationRoot(path.clone()));
                }

                let parent_in_base = parent_rows
                    .last()
                    .is_some_and(|row| row.op_depth == 0 && row.is_normal());
                if !parent_in_base {
                    return Err(WcError::ParentNotCommitted(path.clone()));
                }
            }

            if let Some((path, conflict)) = txn.conflicts_under(path)?.into_iter().next() {
                return Err(WcError::Conflicted { path, conflict });
            }

            let rows = txn.rows_under(path)?;
            let mut committed = Vec::new();

            for node_rows in rows.chunk_by(|left, right| left.path == right.path) {
                check_cancel(cancel)?;

                let Some(top) = node_rows.last() else {
                    continue;
                };
                if top.op_depth == 0 {
                    continue;
                }

                for row in node_rows {
                    txn.delete(&row.path, row.op_depth)?;
                }
                if top.is_normal() {
                    let origin = committed_location(txn, &top.path, new_revision)?;
                    txn.put(NodeRow {
                        checksum: top.checksum,
                        ..NodeRow::base(top.path.clone(), top.kind, origin)
                    });
                }

                committed.push(top.path.clone());
            }

            debug!(%path, %new_revision, committed = committed.len(), "Committed");
            Ok(committed)
        })
    }
}

/// Where a committed node lives in the repository: below its parent's base
/// location.
fn committed_location<S: RowStore + ?Sized>(
    txn: &Txn<'_, S>,
    path: &RelPath,
    revision: Revision,
) -> Result<RepoLocation, WcError> {
    let Some(parent) = path.parent() else {
        return Err(WcError::RootNotModifiable("committed"));
    };

    let parent_base = txn
        .rows_at(&parent)?
        .into_iter()
        .find(|row| row.op_depth == 0)
        .and_then(|row| row.origin);

    match parent_base {
        Some(parent_base) => Ok(RepoLocation::new(parent_base.path.join(path.name()), revision)),
        None => Err(WcError::ParentNotCommitted(path.clone())),
    }
}
