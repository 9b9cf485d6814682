use tracing::debug;

use super::{WorkingCopy, add::put_snapshot, check_cancel, check_new_node, fresh_depth, visible_row};
use crate::{
    cancel::CancelCheck,
    editor::TreeSnapshot,
    wc::{NodeRow, Presence, RelPath, RepoLocation, RowStore, WcError},
};

impl<S: RowStore> WorkingCopy<S> {
    /// Copies the visible tree at `source` to `destination`, returning the
    /// depth of the new layer.
    ///
    /// Every layer of the source at or above its visible depth is carried
    /// over, shifted onto the new layer. Nodes keep their origin, so base
    /// nodes are recorded as copied from their repository location. Deleted
    /// nodes become `not-present` in the copy.
    pub fn copy(
        &mut self,
        source: &RelPath,
        destination: &RelPath,
        cancel: &impl CancelCheck,
    ) -> Result<usize, WcError> {
        self.transaction(|txn, _| {
            let Some(source_row) = visible_row(txn, source)? else {
                return Err(WcError::NodeNotFound(source.clone()));
            };
            if source.contains(destination) {
                return Err(WcError::CopyIntoItself {
                    from: source.clone(),
                    to: destination.clone(),
                });
            }
            check_new_node(txn, destination)?;

            let op_depth = fresh_depth(txn, destination)?;
            let source_depth = source_row.op_depth;
            debug!(%source, %destination, op_depth, source_depth, "Copying node");

            let rows = txn.rows_under(source)?;
            let mut deleted: Option<RelPath> = None;

            for node_rows in rows.chunk_by(|left, right| left.path == right.path) {
                check_cancel(cancel)?;

                let Some(top) = node_rows.last() else {
                    continue;
                };
                let below_deleted = deleted
                    .as_ref()
                    .is_some_and(|deleted| deleted.contains(&top.path));
                if top.op_depth < source_depth || below_deleted {
                    continue;
                }
                let Some(target) = top.path.rebase(source, destination) else {
                    continue;
                };

                if top.is_normal() {
                    txn.put(NodeRow {
                        path: target,
                        op_depth: op_depth + (top.op_depth - source_depth),
                        ..top.clone()
                    });
                    continue;
                }

                deleted = Some(top.path.clone());

                // The layer that held the node before it was deleted.
                let shadowed = match top.presence {
                    Presence::NotPresent => Some(top),
                    Presence::BaseDeleted => node_rows
                        .iter()
                        .rev()
                        .find(|row| row.is_normal() && row.op_depth >= source_depth),
                    Presence::Normal => None,
                };
                let Some(shadowed) = shadowed else {
                    continue;
                };

                let depth = op_depth + (shadowed.op_depth - source_depth);
                let Some(parent) = target.parent() else {
                    continue;
                };
                let inherited = txn
                    .rows_at(&parent)?
                    .iter()
                    .any(|row| row.op_depth == depth && row.is_normal());

                if inherited {
                    txn.put(NodeRow {
                        path: target,
                        op_depth: depth,
                        presence: Presence::NotPresent,
                        kind: top.kind,
                        origin: shadowed.origin.clone(),
                        checksum: None,
                    });
                }
            }

            Ok(op_depth)
        })
    }

    /// Copies the node at `source` of a repository revision, given as a
    /// snapshot of its tree, to `destination`.
    pub fn copy_from_repository(
        &mut self,
        source: &RepoLocation,
        repository: &TreeSnapshot,
        destination: &RelPath,
        cancel: &impl CancelCheck,
    ) -> Result<usize, WcError> {
        self.transaction(|txn, pristines| {
            check_new_node(txn, destination)?;
            let op_depth = fresh_depth(txn, destination)?;
            debug!(%source, %destination, op_depth, "Copying from repository");

            put_snapshot(txn, pristines, repository, Some(source), destination, op_depth, cancel)?;
            Ok(op_depth)
        })
    }
}
