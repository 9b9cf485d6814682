use std::collections::BTreeMap;

use tracing::trace;

use super::{
    node_row::{NodeRow, TreeConflict},
    relpath::RelPath,
    row_store::{RowBatch, RowChange, RowStore, StoreError},
};

/// A [`RowStore`] kept in ordered maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowStore {
    rows: BTreeMap<RelPath, BTreeMap<usize, NodeRow>>,
    conflicts: BTreeMap<RelPath, TreeConflict>,
}

impl MemoryRowStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.rows.values().map(BTreeMap::len).sum() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

impl RowStore for MemoryRowStore {
    fn rows_at(&self, path: &RelPath) -> Result<Vec<NodeRow>, StoreError> {
        Ok(self
            .rows
            .get(path)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn rows_under(&self, path: &RelPath) -> Result<Vec<NodeRow>, StoreError> {
        Ok(self
            .rows
            .range(path.clone()..)
            .take_while(|(row_path, _)| path.contains(row_path))
            .flat_map(|(_, rows)| rows.values().cloned())
            .collect())
    }

    fn conflict(&self, path: &RelPath) -> Result<Option<TreeConflict>, StoreError> {
        Ok(self.conflicts.get(path).copied())
    }

    fn conflicts_under(&self, path: &RelPath) -> Result<Vec<(RelPath, TreeConflict)>, StoreError> {
        Ok(self
            .conflicts
            .range(path.clone()..)
            .take_while(|(conflict_path, _)| path.contains(conflict_path))
            .map(|(conflict_path, conflict)| (conflict_path.clone(), *conflict))
            .collect())
    }

    fn apply(&mut self, batch: RowBatch) -> Result<(), StoreError> {
        let changes = batch.into_changes().collect::<Vec<_>>();

        for change in &changes {
            if let RowChange::Delete { path, op_depth } = change {
                let exists = self
                    .rows
                    .get(path)
                    .is_some_and(|rows| rows.contains_key(op_depth));
                if !exists {
                    return Err(StoreError::RowNotFound {
                        path: path.clone(),
                        op_depth: *op_depth,
                    });
                }
            }
        }

        trace!(changes = changes.len(), "Applying row batch");

        for change in changes {
            match change {
                RowChange::Put(row) => {
                    self.rows
                        .entry(row.path.clone())
                        .or_default()
                        .insert(row.op_depth, row);
                }
                RowChange::Delete { path, op_depth } => {
                    if let Some(rows) = self.rows.get_mut(&path) {
                        rows.remove(&op_depth);
                        if rows.is_empty() {
                            self.rows.remove(&path);
                        }
                    }
                }
                RowChange::SetConflict {
                    path,
                    conflict: Some(conflict),
                } => {
                    self.conflicts.insert(path, conflict);
                }
                RowChange::SetConflict {
                    path,
                    conflict: None,
                } => {
                    self.conflicts.remove(&path);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::wc::{NodeKind, RepoLocation, Revision};

    fn path(text: &str) -> RelPath { RelPath::new(text).unwrap() }

    fn base(text: &str) -> NodeRow {
        NodeRow::base(
            path(text),
            NodeKind::Directory,
            RepoLocation::new(path(text), Revision(1)),
        )
    }

    #[test]
    fn test_subtree_scan_skips_siblings_with_common_prefix() {
        let mut store = MemoryRowStore::new();
        let mut batch = RowBatch::default();
        for text in ["", "a", "a/b", "a.txt", "ab"] {
            batch.put(base(text));
        }
        store.apply(batch).unwrap();

        let under = store
            .rows_under(&path("a"))
            .unwrap()
            .into_iter()
            .map(|row| row.path)
            .collect::<Vec<_>>();
        assert_eq!(under, [path("a"), path("a/b")]);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_failed_batch_changes_nothing() {
        let mut store = MemoryRowStore::new();
        let mut batch = RowBatch::default();
        batch.put(base("a"));
        batch.delete(path("missing"), 0);

        assert!(matches!(
            store.apply(batch),
            Err(StoreError::RowNotFound { op_depth: 0, .. })
        ));
        assert!(store.is_empty());
    }
}
