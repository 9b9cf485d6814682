mod add;
mod commit;
mod copy;
mod delete;
mod revert;
mod status;
mod validate;

use std::collections::BTreeSet;

use tracing::debug;

pub use status::{NodeStatus, StatusKind};

use super::{
    memory_store::MemoryRowStore,
    node_row::{NodeKind, NodeRow, RepoLocation, Revision, TreeConflict},
    pristine::PristineStore,
    relpath::RelPath,
    row_store::{RowBatch, RowStore, Txn},
    update_editor::UpdateEditor,
    wc_error::WcError,
};
use crate::{
    cancel::CancelCheck,
    config::DeltaConfig,
    editor::{TreeSnapshot, drive_tree_delta},
};

/// A working copy: the layered node rows describing the checked out base
/// tree and the local operations on top of it, plus the pristine texts of
/// the base files.
///
/// Every command reads the rows through a [`Txn`] and applies all of its
/// changes as one batch, so a failing or cancelled command leaves the
/// working copy untouched.
#[derive(Debug)]
pub struct WorkingCopy<S = MemoryRowStore> {
    pub(super) store: S,
    pub(super) pristines: PristineStore,
}

impl<S: RowStore> WorkingCopy<S> {
    /// Opens a working copy of `root` kept in `store`, recording the root
    /// directory's base row if the store is empty.
    pub fn new(mut store: S, root: RepoLocation) -> Result<Self, WcError> {
        if store.rows_at(&RelPath::root())?.is_empty() {
            debug!(%root, "Initialising working copy");

            let mut batch = RowBatch::default();
            batch.put(NodeRow::base(RelPath::root(), NodeKind::Directory, root));
            store.apply(batch)?;
        }

        Ok(WorkingCopy {
            store,
            pristines: PristineStore::new(),
        })
    }

    /// Checks out `revision` of a repository, given as a snapshot of its
    /// whole tree.
    pub fn checkout(store: S, repository: &TreeSnapshot, revision: Revision) -> Result<Self, WcError> {
        let mut wc = WorkingCopy::new(store, RepoLocation::new(RelPath::root(), Revision(0)))?;
        drive_tree_delta(
            &TreeSnapshot::new(),
            repository,
            revision,
            &DeltaConfig::default(),
            &mut wc.update_editor(revision),
        )?;
        Ok(wc)
    }

    pub fn store(&self) -> &S { &self.store }

    pub fn pristines(&self) -> &PristineStore { &self.pristines }

    /// All rows of `path`, ordered by depth.
    pub fn rows_at(&self, path: &RelPath) -> Result<Vec<NodeRow>, WcError> { Ok(self.store.rows_at(path)?) }

    /// All rows of `path` and its descendants, ordered by path, then depth.
    pub fn rows_under(&self, path: &RelPath) -> Result<Vec<NodeRow>, WcError> { Ok(self.store.rows_under(path)?) }

    pub fn conflicts(&self) -> Result<Vec<(RelPath, TreeConflict)>, WcError> {
        Ok(self.store.conflicts_under(&RelPath::root())?)
    }

    /// The text of the file visible at `path`, if its layer carries one.
    pub fn text(&self, path: &RelPath) -> Result<Option<&[u8]>, WcError> {
        let Some(row) = self.store.rows_at(path)?.pop().filter(NodeRow::is_normal) else {
            return Err(WcError::NodeNotFound(path.clone()));
        };
        if row.is_directory() {
            return Err(WcError::NotAFile(path.clone()));
        }

        Ok(row.checksum.and_then(|checksum| self.pristines.read(&checksum)))
    }

    /// Clears the tree conflict recorded on `path`, keeping every row.
    pub fn resolve(&mut self, path: &RelPath) -> Result<Option<TreeConflict>, WcError> {
        self.transaction(|txn, _| {
            let conflict = txn.conflict(path)?;
            if conflict.is_some() {
                debug!(%path, "Resolving tree conflict");
                txn.set_conflict(path, None);
            }
            Ok(conflict)
        })
    }

    /// Starts an update of the whole working copy to `target_revision`.
    pub fn update_editor(&mut self, target_revision: Revision) -> UpdateEditor<'_, S> {
        UpdateEditor::new(self, target_revision)
    }

    /// Drops pristine texts no row refers to, returning how many were
    /// dropped.
    pub fn cleanup_pristines(&mut self) -> Result<usize, WcError> {
        let referenced = self
            .store
            .rows_under(&RelPath::root())?
            .into_iter()
            .filter_map(|row| row.checksum)
            .collect::<BTreeSet<_>>();

        Ok(self.pristines.remove_unreferenced(&referenced))
    }

    /// Runs `command` against a transaction and applies its changes once it
    /// succeeds.
    pub(super) fn transaction<T>(
        &mut self,
        command: impl FnOnce(&mut Txn<'_, S>, &mut PristineStore) -> Result<T, WcError>,
    ) -> Result<T, WcError> {
        let mut batch = RowBatch::default();
        let value = command(&mut Txn::new(&self.store, &mut batch), &mut self.pristines)?;

        self.apply_batch(batch)?;
        Ok(value)
    }

    pub(super) fn apply_batch(&mut self, batch: RowBatch) -> Result<(), WcError> {
        if batch.is_empty() {
            return Ok(());
        }

        self.store.apply(batch)?;

        #[cfg(debug_assertions)]
        if let Err(error) = self.validate() {
            panic!("Working copy rows are inconsistent after a command: {error}");
        }

        Ok(())
    }
}

/// The row deciding whether `path` exists: its highest one, if that is
/// `normal`.
pub(super) fn visible_row<S: RowStore + ?Sized>(
    txn: &Txn<'_, S>,
    path: &RelPath,
) -> Result<Option<NodeRow>, WcError> {
    Ok(txn.top_row(path)?.filter(NodeRow::is_normal))
}

pub(super) fn highest_depth(rows: &[NodeRow]) -> usize { rows.iter().map(|row| row.op_depth).max().unwrap_or(0) }

/// The depth of a new operation rooted at `path`: above every layer of its
/// subtree and of its parent.
pub(super) fn fresh_depth<S: RowStore + ?Sized>(txn: &Txn<'_, S>, path: &RelPath) -> Result<usize, WcError> {
    let subtree = highest_depth(&txn.rows_under(path)?);
    let parent = match path.parent() {
        Some(parent) => highest_depth(&txn.rows_at(&parent)?),
        None => 0,
    };

    Ok(1 + subtree.max(parent))
}

/// Checks that a node can be created at `path`: it is not the root, does
/// not exist yet and its parent is an existing directory.
pub(super) fn check_new_node<S: RowStore + ?Sized>(txn: &Txn<'_, S>, path: &RelPath) -> Result<(), WcError> {
    let Some(parent) = path.parent() else {
        return Err(WcError::RootNotModifiable("replaced"));
    };

    if visible_row(txn, path)?.is_some() {
        return Err(WcError::NodeExists(path.clone()));
    }

    match visible_row(txn, &parent)? {
        Some(row) if row.is_directory() => Ok(()),
        Some(_) => Err(WcError::NotADirectory(parent)),
        None => Err(WcError::ParentNotFound(path.clone())),
    }
}

pub(super) fn check_cancel(cancel: &(impl CancelCheck + ?Sized)) -> Result<(), WcError> {
    if cancel.is_cancelled() { Err(WcError::Cancelled) } else { Ok(()) }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn path(text: &str) -> RelPath { RelPath::new(text).unwrap() }

    /// The repository tree most working-copy tests start from, at r1.
    pub fn repository() -> TreeSnapshot {
        TreeSnapshot::from_files([
            ("A/B/lambda", "lambda\n"),
            ("A/B/E/alpha", "alpha\n"),
            ("A/B/E/beta", "beta\n"),
            ("A/D/gamma", "gamma\n"),
            ("A/mu", "mu\n"),
            ("iota", "iota\n"),
        ])
        .unwrap()
    }

    pub fn checkout() -> WorkingCopy {
        WorkingCopy::checkout(MemoryRowStore::new(), &repository(), Revision(1)).unwrap()
    }

    /// One line per row: path, depth, presence and origin.
    pub fn rows(wc: &WorkingCopy, under: &str) -> String {
        wc.rows_under(&path(under))
            .unwrap()
            .iter()
            .map(|row| {
                let origin = row
                    .origin
                    .as_ref()
                    .map(|origin| format!(" {origin}"))
                    .unwrap_or_default();
                format!("{} {} {:?}{origin}", row.path, row.op_depth, row.presence)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
