use std::mem;

use tracing::{debug, trace};

use super::{
    node_row::{ConflictAction, ConflictReason, NodeKind, NodeRow, Presence, RepoLocation, Revision, TreeConflict},
    relpath::RelPath,
    row_store::{RowBatch, RowStore, Txn},
    wc_error::WcError,
    working_copy::WorkingCopy,
};
use crate::{
    delta::{ChecksumRole, DeltaError, Md5Digest, TxDeltaApplier, WindowHandler},
    editor::{DeltaEditor, EditStack},
};

#[derive(Debug, Default)]
struct OpenFile {
    base_text: Vec<u8>,
    new_text: Option<Vec<u8>>,
    added: bool,
}

/// Receives an update of a working copy as a tree-delta edit.
///
/// Incoming changes land in the base layer at the target revision; local
/// layers are kept. Where an incoming change meets local changes of the same
/// node, a [`TreeConflict`] is recorded. Nothing reaches the row store until
/// the edit closes, when all changes are applied as one batch and the new
/// texts join the pristine store.
#[derive(Debug)]
pub struct UpdateEditor<'a, S: RowStore> {
    wc: &'a mut WorkingCopy<S>,
    batch: RowBatch,
    texts: Vec<Vec<u8>>,
    stack: EditStack<(), OpenFile>,
    target_revision: Revision,
}

impl<'a, S: RowStore> UpdateEditor<'a, S> {
    pub(super) fn new(wc: &'a mut WorkingCopy<S>, target_revision: Revision) -> Self {
        UpdateEditor {
            wc,
            batch: RowBatch::default(),
            texts: Vec::new(),
            stack: EditStack::new(),
            target_revision,
        }
    }

    fn txn(&mut self) -> Txn<'_, S> { Txn::new(&self.wc.store, &mut self.batch) }

    fn base_row(&mut self, path: &RelPath) -> Result<NodeRow, WcError> {
        self.txn()
            .rows_at(path)?
            .into_iter()
            .find(|row| row.op_depth == 0)
            .ok_or_else(|| WcError::NodeNotFound(path.clone()))
    }

    /// Writes the base row of an incoming node. Local rows already at
    /// `path` stay on top and put the node in conflict; a locally deleted
    /// parent extends its deletion over the new node.
    fn add_node(&mut self, path: &RelPath, kind: NodeKind) -> Result<(), WcError> {
        let revision = self.target_revision;
        let Some(parent) = path.parent() else {
            return Err(WcError::RootNotModifiable("added"));
        };

        let mut txn = self.txn();
        let rows = txn.rows_at(path)?;
        if rows.iter().any(|row| row.op_depth == 0) {
            return Err(WcError::NodeExists(path.clone()));
        }

        let parent_rows = txn.rows_at(&parent)?;
        let Some(parent_origin) = parent_rows
            .first()
            .filter(|row| row.op_depth == 0)
            .and_then(|row| row.origin.as_ref())
        else {
            return Err(WcError::ParentNotFound(path.clone()));
        };

        let origin = RepoLocation::new(parent_origin.path.join(path.name()), revision);
        debug!(%path, %origin, ?kind, "Adding base node");
        txn.put(NodeRow::base(path.clone(), kind, origin));

        for parent_row in &parent_rows {
            let shadowed = parent_row.presence == Presence::BaseDeleted
                && !rows.iter().any(|row| row.op_depth == parent_row.op_depth);
            if shadowed {
                txn.put(NodeRow::base_deleted(path.clone(), parent_row.op_depth, kind));
            }
        }

        if !rows.is_empty() {
            txn.set_conflict(path, Some(conflict(ConflictReason::Added, ConflictAction::Add)));
        }
        Ok(())
    }
}

fn conflict(reason: ConflictReason, action: ConflictAction) -> TreeConflict { TreeConflict { reason, action } }

/// Turns the base rows of a subtree that is deleted in the repository into a
/// local copy of it, at depth 1, so the local changes inside it survive on
/// top. Those changes move up one layer to make room.
fn keep_as_copy<S: RowStore + ?Sized>(txn: &mut Txn<'_, S>, rows: &[NodeRow]) -> Result<(), WcError> {
    for row in rows {
        txn.delete(&row.path, row.op_depth)?;
    }

    for row in rows {
        txn.put(NodeRow {
            op_depth: row.op_depth + 1,
            ..row.clone()
        });
    }

    Ok(())
}

impl<S: RowStore> DeltaEditor for UpdateEditor<'_, S> {
    type Error = WcError;

    fn set_target_revision(&mut self, revision: Revision) -> Result<(), WcError> {
        debug!(%revision, "Updating working copy");
        self.target_revision = revision;
        Ok(())
    }

    fn open_root(&mut self) -> Result<(), WcError> {
        self.stack.open_root(())?;
        Ok(())
    }

    fn delete_entry(&mut self, path: &RelPath) -> Result<(), WcError> {
        self.stack.check_child(path)?;

        let mut txn = self.txn();
        let rows = txn.rows_under(path)?;
        let Some(top) = rows.iter().rfind(|row| row.path == *path).cloned() else {
            return Err(WcError::NodeNotFound(path.clone()));
        };
        if !rows.iter().any(|row| row.path == *path && row.op_depth == 0) {
            return Err(WcError::NodeNotFound(path.clone()));
        }

        if rows.iter().all(|row| row.op_depth == 0) {
            debug!(%path, "Deleting base node");
            for row in &rows {
                txn.delete(&row.path, 0)?;
            }
            return Ok(());
        }

        let reason = if top.op_depth == 0 {
            keep_as_copy(&mut txn, &rows)?;
            ConflictReason::Edited
        } else {
            for row in &rows {
                if row.op_depth == 0 || row.presence == Presence::BaseDeleted {
                    txn.delete(&row.path, row.op_depth)?;
                }
            }
            if top.is_normal() { ConflictReason::Replaced } else { ConflictReason::Deleted }
        };

        debug!(%path, ?reason, "Incoming delete meets local changes");
        txn.set_conflict(path, Some(conflict(reason, ConflictAction::Delete)));
        Ok(())
    }

    fn add_directory(&mut self, path: &RelPath) -> Result<(), WcError> {
        self.stack.open_directory(path, ())?;
        self.add_node(path, NodeKind::Directory)
    }

    fn open_directory(&mut self, path: &RelPath) -> Result<(), WcError> {
        self.stack.open_directory(path, ())?;
        self.base_row(path)?;
        Ok(())
    }

    fn close_directory(&mut self) -> Result<(), WcError> {
        self.stack.close_directory()?;
        Ok(())
    }

    fn add_file(&mut self, path: &RelPath) -> Result<(), WcError> {
        self.stack.open_file(
            path,
            OpenFile {
                added: true,
                ..OpenFile::default()
            },
        )?;
        self.add_node(path, NodeKind::File)
    }

    fn open_file(&mut self, path: &RelPath) -> Result<(), WcError> {
        let base = self.base_row(path)?;
        if base.is_directory() {
            return Err(WcError::NotAFile(path.clone()));
        }

        let base_text = match base.checksum {
            Some(checksum) => match self.wc.pristines.read(&checksum) {
                Some(text) => text.to_vec(),
                None => {
                    return Err(WcError::Corrupt {
                        path: path.clone(),
                        op_depth: 0,
                        reason: "pristine text is missing",
                    });
                }
            },
            None => Vec::new(),
        };

        self.stack.open_file(
            path,
            OpenFile {
                base_text,
                ..OpenFile::default()
            },
        )?;
        Ok(())
    }

    fn apply_text_delta(
        &mut self,
        base_checksum: Option<Md5Digest>,
    ) -> Result<Box<dyn WindowHandler + '_>, WcError> {
        let (path, file) = self.stack.file_mut()?;

        if let Some(expected) = base_checksum {
            let actual = Md5Digest::of(&file.base_text);
            if expected != actual {
                return Err(DeltaError::ChecksumMismatch {
                    role: ChecksumRole::Base,
                    expected,
                    actual,
                }
                .into());
            }
        }

        trace!(%path, base_len = file.base_text.len(), "Receiving text delta");
        Ok(Box::new(TxDeltaApplier::new(
            &file.base_text[..],
            file.new_text.insert(Vec::new()),
        )))
    }

    fn close_file(&mut self, text_checksum: Option<Md5Digest>) -> Result<(), WcError> {
        let (path, file) = self.stack.close_file()?;
        let text = file.new_text.unwrap_or(file.base_text);

        let actual = Md5Digest::of(&text);
        if let Some(expected) = text_checksum.filter(|expected| *expected != actual) {
            return Err(DeltaError::ChecksumMismatch {
                role: ChecksumRole::Result,
                expected,
                actual,
            }
            .into());
        }

        let revision = self.target_revision;
        let mut txn = self.txn();

        let rows = txn.rows_at(&path)?;
        let Some(base) = rows.first().filter(|row| row.op_depth == 0) else {
            return Err(WcError::NodeNotFound(path));
        };
        txn.put(NodeRow {
            checksum: Some(actual),
            origin: base
                .origin
                .as_ref()
                .map(|origin| RepoLocation::new(origin.path.clone(), revision)),
            ..base.clone()
        });

        if let (false, Some(top)) = (file.added, rows.last().filter(|top| top.op_depth > 0)) {
            let reason = if top.is_normal() { ConflictReason::Replaced } else { ConflictReason::Deleted };
            debug!(%path, ?reason, "Incoming edit meets local changes");
            txn.set_conflict(&path, Some(conflict(reason, ConflictAction::Edit)));
        }

        self.texts.push(text);
        Ok(())
    }

    /// Moves every base node the edit did not touch to the target revision
    /// too, then applies the whole edit.
    fn close_edit(&mut self) -> Result<(), WcError> {
        self.stack.close_edit()?;

        let revision = self.target_revision;
        let mut txn = self.txn();
        for row in txn.rows_under(&RelPath::root())? {
            let outdated = row.op_depth == 0 && row.origin.as_ref().is_some_and(|origin| origin.revision != revision);
            if outdated {
                txn.put(NodeRow {
                    origin: row.origin.map(|origin| RepoLocation::new(origin.path, revision)),
                    ..row
                });
            }
        }

        debug!(%revision, "Applying update");
        let batch = mem::take(&mut self.batch);
        self.wc.apply_batch(batch)?;
        for text in self.texts.drain(..) {
            self.wc.pristines.install(text);
        }
        Ok(())
    }

    fn abort_edit(&mut self) -> Result<(), WcError> {
        self.stack.abort_edit()?;

        debug!(revision = %self.target_revision, "Update aborted");
        self.batch = RowBatch::default();
        self.texts.clear();
        Ok(())
    }
}
