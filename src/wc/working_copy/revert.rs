use tracing::debug;

use super::{WorkingCopy, check_cancel, highest_depth};
use crate::{
    cancel::CancelCheck,
    wc::{RelPath, RowStore, WcError},
};

impl<S: RowStore> WorkingCopy<S> {
    /// Undoes the local operations on `path`: every layer above the highest
    /// layer of its parent is removed, as is its tree conflict. Nodes that
    /// only existed locally disappear.
    ///
    /// Without `recursive`, a node whose descendants also carry such layers
    /// is left alone, since reverting it would orphan them.
    pub fn revert(&mut self, path: &RelPath, recursive: bool, cancel: &impl CancelCheck) -> Result<(), WcError> {
        self.transaction(|txn, _| {
            let floor = match path.parent() {
                Some(parent) => highest_depth(&txn.rows_at(&parent)?),
                None => 0,
            };

            let rows = txn.rows_under(path)?;
            if rows.is_empty() && txn.conflict(path)?.is_none() {
                return Err(WcError::NodeNotFound(path.clone()));
            }
            debug!(%path, floor, recursive, "Reverting");

            let (own, descendants) = rows
                .into_iter()
                .filter(|row| row.op_depth > floor)
                .partition::<Vec<_>, _>(|row| row.path == *path);

            if recursive {
                for row in own.iter().chain(&descendants) {
                    check_cancel(cancel)?;
                    txn.delete(&row.path, row.op_depth)?;
                }
                for (conflict_path, _) in txn.conflicts_under(path)? {
                    txn.set_conflict(&conflict_path, None);
                }
            } else {
                if !own.is_empty() && !descendants.is_empty() {
                    return Err(WcError::RevertRequiresRecursion(path.clone()));
                }
                for row in &own {
                    txn.delete(&row.path, row.op_depth)?;
                }
                txn.set_conflict(path, None);
            }

            Ok(())
        })
    }
}
