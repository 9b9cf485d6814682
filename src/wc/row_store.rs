use std::collections::BTreeMap;

use thiserror::Error;

use super::{
    node_row::{NodeRow, TreeConflict},
    relpath::RelPath,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No node row for '{path}' at depth {op_depth}")]
    RowNotFound { path: RelPath, op_depth: usize },

    #[error("Row store backend failed")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Persistent storage of node rows and tree conflicts.
///
/// Rows are keyed by `(path, op_depth)`. Every working-copy command reads
/// through the store and then hands all of its changes over as one
/// [`RowBatch`], which must be applied atomically: either every change
/// lands or the store is left untouched.
pub trait RowStore {
    /// All rows of `path`, ordered by depth.
    fn rows_at(&self, path: &RelPath) -> Result<Vec<NodeRow>, StoreError>;

    /// All rows of `path` and its descendants, ordered by path, then depth.
    fn rows_under(&self, path: &RelPath) -> Result<Vec<NodeRow>, StoreError>;

    fn conflict(&self, path: &RelPath) -> Result<Option<TreeConflict>, StoreError>;

    /// Conflicts recorded on `path` or its descendants, ordered by path.
    fn conflicts_under(&self, path: &RelPath) -> Result<Vec<(RelPath, TreeConflict)>, StoreError>;

    fn apply(&mut self, batch: RowBatch) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    /// Inserts the row, replacing any row with the same path and depth.
    Put(NodeRow),
    Delete { path: RelPath, op_depth: usize },
    SetConflict {
        path: RelPath,
        conflict: Option<TreeConflict>,
    },
}

/// The pending changes of one working-copy command. Later changes to the
/// same row or conflict replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    rows: BTreeMap<(RelPath, usize), Option<NodeRow>>,
    conflicts: BTreeMap<RelPath, Option<TreeConflict>>,
}

impl RowBatch {
    pub fn is_empty(&self) -> bool { self.rows.is_empty() && self.conflicts.is_empty() }

    pub fn put(&mut self, row: NodeRow) {
        self.rows.insert((row.path.clone(), row.op_depth), Some(row));
    }

    pub fn delete(&mut self, path: RelPath, op_depth: usize) { self.rows.insert((path, op_depth), None); }

    pub fn set_conflict(&mut self, path: RelPath, conflict: Option<TreeConflict>) {
        self.conflicts.insert(path, conflict);
    }

    /// The changes in application order: rows by path and depth, then
    /// conflicts.
    pub fn into_changes(self) -> impl Iterator<Item = RowChange> {
        let rows = self.rows.into_iter().map(|((path, op_depth), row)| match row {
            Some(row) => RowChange::Put(row),
            None => RowChange::Delete { path, op_depth },
        });
        let conflicts = self
            .conflicts
            .into_iter()
            .map(|(path, conflict)| RowChange::SetConflict { path, conflict });

        rows.chain(conflicts)
    }

    fn pending_rows<'a>(
        &'a self,
        path: &'a RelPath,
        subtree: bool,
    ) -> impl Iterator<Item = (&'a (RelPath, usize), &'a Option<NodeRow>)> + 'a {
        self.rows
            .range((path.clone(), 0)..)
            .take_while(move |((row_path, _), _)| {
                if subtree { path.contains(row_path) } else { row_path == path }
            })
    }
}

/// Reads a [`RowStore`] as if a [`RowBatch`] had already been applied to it,
/// while collecting further changes into that batch.
#[derive(Debug)]
pub struct Txn<'a, S: ?Sized> {
    store: &'a S,
    batch: &'a mut RowBatch,
}

impl<'a, S: RowStore + ?Sized> Txn<'a, S> {
    pub fn new(store: &'a S, batch: &'a mut RowBatch) -> Self { Txn { store, batch } }

    pub fn rows_at(&self, path: &RelPath) -> Result<Vec<NodeRow>, StoreError> {
        let mut rows = self
            .store
            .rows_at(path)?
            .into_iter()
            .map(|row| (row.op_depth, row))
            .collect::<BTreeMap<_, _>>();

        for ((_, op_depth), row) in self.batch.pending_rows(path, false) {
            match row {
                Some(row) => rows.insert(*op_depth, row.clone()),
                None => rows.remove(op_depth),
            };
        }

        Ok(rows.into_values().collect())
    }

    pub fn rows_under(&self, path: &RelPath) -> Result<Vec<NodeRow>, StoreError> {
        let mut rows = self
            .store
            .rows_under(path)?
            .into_iter()
            .map(|row| ((row.path.clone(), row.op_depth), row))
            .collect::<BTreeMap<_, _>>();

        for (key, row) in self.batch.pending_rows(path, true) {
            match row {
                Some(row) => rows.insert(key.clone(), row.clone()),
                None => rows.remove(key),
            };
        }

        Ok(rows.into_values().collect())
    }

    /// The highest row of `path`, the one that decides its visible state.
    pub fn top_row(&self, path: &RelPath) -> Result<Option<NodeRow>, StoreError> {
        Ok(self.rows_at(path)?.pop())
    }

    pub fn conflict(&self, path: &RelPath) -> Result<Option<TreeConflict>, StoreError> {
        match self.batch.conflicts.get(path) {
            Some(conflict) => Ok(*conflict),
            None => self.store.conflict(path),
        }
    }

    pub fn conflicts_under(&self, path: &RelPath) -> Result<Vec<(RelPath, TreeConflict)>, StoreError> {
        let mut conflicts = self
            .store
            .conflicts_under(path)?
            .into_iter()
            .collect::<BTreeMap<_, _>>();

        for (conflict_path, conflict) in self.batch.conflicts.range(path.clone()..) {
            if !path.contains(conflict_path) {
                break;
            }
            match conflict {
                Some(conflict) => conflicts.insert(conflict_path.clone(), *conflict),
                None => conflicts.remove(conflict_path),
            };
        }

        Ok(conflicts.into_iter().collect())
    }

    pub fn put(&mut self, row: NodeRow) { self.batch.put(row); }

    pub fn delete(&mut self, path: &RelPath, op_depth: usize) -> Result<(), StoreError> {
        let stored = self
            .store
            .rows_at(path)?
            .iter()
            .any(|row| row.op_depth == op_depth);

        // A row that only exists in the batch is simply dropped from it.
        if stored {
            self.batch.delete(path.clone(), op_depth);
        } else {
            self.batch.rows.remove(&(path.clone(), op_depth));
        }
        Ok(())
    }

    pub fn set_conflict(&mut self, path: &RelPath, conflict: Option<TreeConflict>) {
        self.batch.set_conflict(path.clone(), conflict);
    }
}
