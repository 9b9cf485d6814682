use std::collections::BTreeMap;

use super::WorkingCopy;
use crate::wc::{NodeRow, Presence, RelPath, RowStore, WcError};

impl<S: RowStore> WorkingCopy<S> {
    /// Checks that every row is explained by the layers around it.
    ///
    /// Base rows are present and sit inside a base directory. A local row
    /// either belongs to the layer of its parent at the same depth, and then
    /// agrees with it, or roots a new operation inside a present directory.
    /// A `base-deleted` row always shadows a present row.
    pub fn validate(&self) -> Result<(), WcError> {
        let rows = self.store.rows_under(&RelPath::root())?;

        let mut nodes = BTreeMap::<&RelPath, Vec<&NodeRow>>::new();
        for row in &rows {
            nodes.entry(&row.path).or_default().push(row);
        }

        for (path, node_rows) in &nodes {
            let parent_rows = match path.parent() {
                Some(parent) => nodes.get(&parent).map(Vec::as_slice).unwrap_or_default(),
                None => &[],
            };

            for (index, row) in node_rows.iter().enumerate() {
                let below = index.checked_sub(1).map(|below| node_rows[below]);
                check_row(row, below, parent_rows).map_err(|reason| WcError::Corrupt {
                    path: row.path.clone(),
                    op_depth: row.op_depth,
                    reason,
                })?;
            }
        }

        Ok(())
    }
}

fn check_row(row: &NodeRow, below: Option<&NodeRow>, parent_rows: &[&NodeRow]) -> Result<(), &'static str> {
    let is_directory = |row: &&NodeRow| row.is_normal() && row.is_directory();

    if row.op_depth == 0 {
        if !row.is_normal() {
            return Err("base rows are always present");
        }
        if row.origin.is_none() {
            return Err("base rows record their repository location");
        }
        let in_base_directory = parent_rows
            .first()
            .is_some_and(|parent| parent.op_depth == 0 && is_directory(parent));
        if !row.path.is_root() && !in_base_directory {
            return Err("base node outside a base directory");
        }
        return Ok(());
    }

    if row.path.is_root() {
        return Err("the root cannot be changed locally");
    }
    if row.presence == Presence::BaseDeleted && !below.is_some_and(NodeRow::is_normal) {
        return Err("base-deleted row shadows nothing");
    }

    match parent_rows.iter().find(|parent| parent.op_depth == row.op_depth) {
        Some(parent) => {
            let agrees = match row.presence {
                Presence::Normal => is_directory(parent),
                Presence::BaseDeleted => parent.presence == Presence::BaseDeleted,
                Presence::NotPresent => parent.is_normal(),
            };
            if !agrees {
                return Err("row disagrees with its parent's layer");
            }
        }
        None => {
            if row.presence == Presence::NotPresent {
                return Err("not-present row outside a copy");
            }

            let parent_below = parent_rows.iter().rev().find(|parent| parent.op_depth < row.op_depth);
            if !parent_below.is_some_and(is_directory) {
                return Err("operation root outside a present directory");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::{collection::vec, prelude::*};

    use super::*;
    use crate::{
        cancel::Never,
        wc::{
            NodeKind, RowBatch,
            working_copy::test_support::{checkout, path},
        },
    };

    const PATHS: [&str; 12] = [
        "A", "A/B", "A/B/E", "A/B/E/alpha", "A/B/lambda", "A/D", "A/D/gamma", "A/mu", "iota", "A/new", "A/D/new",
        "copy",
    ];

    #[derive(Debug, Clone, Copy)]
    enum Command {
        AddDirectory,
        AddFile,
        Copy,
        Delete,
        Revert { recursive: bool },
        Commit,
    }

    fn command() -> impl Strategy<Value = Command> {
        prop_oneof![
            Just(Command::AddDirectory),
            Just(Command::AddFile),
            Just(Command::Copy),
            Just(Command::Delete),
            any::<bool>().prop_map(|recursive| Command::Revert { recursive }),
            Just(Command::Commit),
        ]
    }

    fn step() -> impl Strategy<Value = (Command, &'static str, &'static str)> {
        (command(), prop::sample::select(PATHS.to_vec()), prop::sample::select(PATHS.to_vec()))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Random commands either fail cleanly or leave consistent rows;
        /// every successful one is checked again by the debug validation in
        /// `apply_batch`.
        #[test]
        fn test_random_operations_keep_rows_consistent(steps in vec(step(), 0..200)) {
            let mut wc = checkout();

            for (command, target, other) in steps {
                let target = path(target);
                let _ = match command {
                    Command::AddDirectory => wc.add(&target, NodeKind::Directory).map(drop),
                    Command::AddFile => wc.add(&target, NodeKind::File).map(drop),
                    Command::Copy => wc.copy(&path(other), &target, &Never).map(drop),
                    Command::Delete => wc.delete(&target, &Never),
                    Command::Revert { recursive } => wc.revert(&target, recursive, &Never),
                    Command::Commit => wc.commit(&target, crate::wc::Revision(2), &Never).map(drop),
                };

                prop_assert!(wc.validate().is_ok(), "{:?}", wc.validate());
            }
        }
    }

    #[test]
    fn test_orphaned_rows_are_reported() {
        let mut wc = checkout();
        let mut batch = RowBatch::default();
        batch.put(NodeRow {
            path: path("A/B/lambda"),
            op_depth: 3,
            presence: Presence::NotPresent,
            kind: NodeKind::File,
            origin: None,
            checksum: None,
        });
        wc.store.apply(batch).unwrap();

        assert!(matches!(
            wc.validate(),
            Err(WcError::Corrupt {
                op_depth: 3,
                reason: "not-present row outside a copy",
                ..
            })
        ));
    }

    #[test]
    fn test_base_deleted_must_shadow_a_node() {
        let mut wc = checkout();
        let mut batch = RowBatch::default();
        batch.put(NodeRow::base_deleted(path("A/ghost"), 1, NodeKind::File));
        wc.store.apply(batch).unwrap();

        assert!(matches!(
            wc.validate(),
            Err(WcError::Corrupt {
                reason: "base-deleted row shadows nothing",
                ..
            })
        ));
    }
}
