use tracing::debug;

use super::{WorkingCopy, check_cancel, check_new_node, fresh_depth};
use crate::{
    cancel::CancelCheck,
    editor::{SnapshotNode, TreeSnapshot},
    wc::{NodeKind, NodeRow, Presence, PristineStore, RelPath, RepoLocation, RowStore, Txn, WcError},
};

impl<S: RowStore> WorkingCopy<S> {
    /// Schedules a new node for addition, returning the depth of its layer.
    pub fn add(&mut self, path: &RelPath, kind: NodeKind) -> Result<usize, WcError> {
        self.transaction(|txn, _| {
            check_new_node(txn, path)?;
            let op_depth = fresh_depth(txn, path)?;
            debug!(%path, op_depth, ?kind, "Adding node");

            txn.put(NodeRow {
                path: path.clone(),
                op_depth,
                presence: Presence::Normal,
                kind,
                origin: None,
                checksum: None,
            });
            Ok(op_depth)
        })
    }

    /// Schedules every node of `tree` for addition, with the root of `tree`
    /// becoming the directory at `path`. All nodes share one layer.
    pub fn add_tree(
        &mut self,
        path: &RelPath,
        tree: &TreeSnapshot,
        cancel: &impl CancelCheck,
    ) -> Result<usize, WcError> {
        self.transaction(|txn, pristines| {
            check_new_node(txn, path)?;
            let op_depth = fresh_depth(txn, path)?;
            debug!(%path, op_depth, "Adding tree");

            put_snapshot(txn, pristines, tree, None, path, op_depth, cancel)?;
            Ok(op_depth)
        })
    }
}

/// Writes `normal` rows at `op_depth` for the subtree of `tree` at
/// `origin`, or for all of `tree` without one, placing it at `to`. File
/// texts are installed as pristines.
pub(super) fn put_snapshot<S: RowStore + ?Sized>(
    txn: &mut Txn<'_, S>,
    pristines: &mut PristineStore,
    tree: &TreeSnapshot,
    origin: Option<&RepoLocation>,
    to: &RelPath,
    op_depth: usize,
    cancel: &impl CancelCheck,
) -> Result<(), WcError> {
    let from = origin.map_or_else(RelPath::root, |origin| origin.path.clone());
    if tree.get(&from).is_none() {
        return Err(WcError::NodeNotFound(from));
    }

    for (node_path, node) in tree.nodes_under(&from) {
        check_cancel(cancel)?;

        let Some(relative) = from.relative(node_path) else {
            continue;
        };
        let (kind, checksum) = match node {
            SnapshotNode::Directory => (NodeKind::Directory, None),
            SnapshotNode::File(text) => (NodeKind::File, Some(pristines.install(text.clone()))),
        };

        txn.put(NodeRow {
            path: to.join_path(&relative),
            op_depth,
            presence: Presence::Normal,
            kind,
            origin: origin.map(|origin| RepoLocation::new(origin.path.join_path(&relative), origin.revision)),
            checksum,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        cancel::Never,
        wc::working_copy::test_support::{checkout, path, rows},
    };

    #[test]
    fn test_add_creates_one_layer() {
        let mut wc = checkout();

        assert_eq!(wc.add(&path("A/new"), NodeKind::Directory).unwrap(), 1);
        assert_eq!(wc.add(&path("A/new/file"), NodeKind::File).unwrap(), 2);

        assert_snapshot!(rows(&wc, "A/new"), @r"
        A/new 1 Normal
        A/new/file 2 Normal
        ");
    }

    #[test]
    fn test_add_tree_shares_the_layer() {
        let mut wc = checkout();
        let tree = TreeSnapshot::from_files([("x/y", "y\n"), ("z", "z\n")]).unwrap();

        assert_eq!(wc.add_tree(&path("A/D/new"), &tree, &Never).unwrap(), 1);
        assert_snapshot!(rows(&wc, "A/D/new"), @r"
        A/D/new 1 Normal
        A/D/new/x 1 Normal
        A/D/new/x/y 1 Normal
        A/D/new/z 1 Normal
        ");
        assert_eq!(wc.text(&path("A/D/new/x/y")).unwrap(), Some(&b"y\n"[..]));
    }

    #[test]
    fn test_add_replaces_a_deleted_node() {
        let mut wc = checkout();
        wc.delete(&path("iota"), &Never).unwrap();

        assert_eq!(wc.add(&path("iota"), NodeKind::Directory).unwrap(), 2);
        assert_snapshot!(rows(&wc, "iota"), @r"
        iota 0 Normal ^/iota@1
        iota 1 BaseDeleted
        iota 2 Normal
        ");
    }

    #[test]
    fn test_add_rejects_invalid_targets() {
        let mut wc = checkout();

        assert!(matches!(
            wc.add(&path("iota"), NodeKind::File),
            Err(WcError::NodeExists(_))
        ));
        assert!(matches!(
            wc.add(&path("iota/x"), NodeKind::File),
            Err(WcError::NotADirectory(_))
        ));
        assert!(matches!(
            wc.add(&path("missing/x"), NodeKind::File),
            Err(WcError::ParentNotFound(_))
        ));
    }

    #[test]
    fn test_cancelled_add_changes_nothing() {
        let mut wc = checkout();
        let before = rows(&wc, "");
        let tree = TreeSnapshot::from_files([("a", "a"), ("b", "b")]).unwrap();

        let error = wc.add_tree(&path("new"), &tree, &|| true).unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(rows(&wc, ""), before);
    }
}
