use tracing::debug;

use super::{WorkingCopy, check_cancel, fresh_depth, visible_row};
use crate::{
    cancel::CancelCheck,
    wc::{NodeRow, Presence, RelPath, RowStore, Txn, WcError},
};

impl<S: RowStore> WorkingCopy<S> {
    /// Deletes the node visible at `path` together with its subtree.
    ///
    /// Base nodes are shadowed by a new `base-deleted` layer. Nodes that
    /// only exist locally lose their layer, which re-exposes whatever lies
    /// beneath it, except that a node inherited from a copy stays behind as
    /// `not-present` so the copy remembers it was excluded.
    pub fn delete(&mut self, path: &RelPath, cancel: &impl CancelCheck) -> Result<(), WcError> {
        let Some(parent) = path.parent() else {
            return Err(WcError::RootNotModifiable("deleted"));
        };

        self.transaction(|txn, _| {
            let Some(visible) = visible_row(txn, path)? else {
                return Err(WcError::NodeNotFound(path.clone()));
            };
            let depth = visible.op_depth;

            if depth == 0 {
                remove_layers(txn, path, 1, false, cancel)?;

                let op_depth = fresh_depth(txn, path)?;
                debug!(%path, op_depth, "Deleting base node");

                for row in txn.rows_under(path)? {
                    check_cancel(cancel)?;
                    if row.op_depth == 0 {
                        txn.put(NodeRow::base_deleted(row.path, op_depth, row.kind));
                    }
                }
                return Ok(());
            }

            let inherited = txn.rows_at(&parent)?.iter().any(|row| row.op_depth == depth);
            if inherited && visible.origin.is_some() {
                debug!(%path, op_depth = depth, "Excluding node from its copy");

                remove_layers(txn, path, depth, true, cancel)?;
                txn.put(NodeRow {
                    presence: Presence::NotPresent,
                    checksum: None,
                    ..visible
                });
            } else {
                debug!(%path, op_depth = depth, "Removing local node");
                remove_layers(txn, path, depth, false, cancel)?;
            }

            Ok(())
        })
    }
}

/// Removes the rows of the subtree at `path` from `min_depth` up, keeping
/// those of `path` itself when `keep_root` is set.
fn remove_layers<S: RowStore + ?Sized>(
    txn: &mut Txn<'_, S>,
    path: &RelPath,
    min_depth: usize,
    keep_root: bool,
    cancel: &impl CancelCheck,
) -> Result<(), WcError> {
    for row in txn.rows_under(path)? {
        check_cancel(cancel)?;

        if row.op_depth >= min_depth && !(keep_root && row.path == *path) {
            txn.delete(&row.path, row.op_depth)?;
        }
    }

    Ok(())
}
