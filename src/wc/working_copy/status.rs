use serde::Serialize;

use super::WorkingCopy;
use crate::wc::{NodeKind, Presence, RelPath, RepoLocation, RowStore, TreeConflict, WcError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Unchanged since checkout or update.
    Normal,
    Added,
    Copied,
    Deleted,
    /// Deleted, then added or copied again.
    Replaced,
}

/// The visible state of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub kind: StatusKind,
    pub node_kind: NodeKind,
    /// Depth of the visible layer.
    pub op_depth: usize,
    pub origin: Option<RepoLocation>,
    pub conflict: Option<TreeConflict>,
}

impl<S: RowStore> WorkingCopy<S> {
    pub fn status(&self, path: &RelPath) -> Result<NodeStatus, WcError> {
        let rows = self.store.rows_at(path)?;
        let Some(top) = rows.last() else {
            return Err(WcError::NodeNotFound(path.clone()));
        };

        let kind = match top.presence {
            _ if top.op_depth == 0 => StatusKind::Normal,
            Presence::BaseDeleted | Presence::NotPresent => StatusKind::Deleted,
            Presence::Normal if rows.len() > 1 => StatusKind::Replaced,
            Presence::Normal if top.origin.is_some() => StatusKind::Copied,
            Presence::Normal => StatusKind::Added,
        };

        Ok(NodeStatus {
            kind,
            node_kind: top.kind,
            op_depth: top.op_depth,
            origin: top.origin.clone(),
            conflict: self.store.conflict(path)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::{
        cancel::Never,
        wc::{WorkingCopy, working_copy::test_support::{checkout, path}},
    };

    fn prepared() -> WorkingCopy {
        let mut wc = checkout();
        wc.add(&path("A/added"), NodeKind::File).unwrap();
        wc.copy(&path("A/D"), &path("A/copied"), &Never).unwrap();
        wc.delete(&path("A/mu"), &Never).unwrap();
        wc.delete(&path("A/B"), &Never).unwrap();
        wc.add(&path("A/B"), NodeKind::Directory).unwrap();
        wc.delete(&path("A/copied/gamma"), &Never).unwrap();
        wc
    }

    #[test_case("iota", StatusKind::Normal, 0)]
    #[test_case("A/added", StatusKind::Added, 1)]
    #[test_case("A/copied", StatusKind::Copied, 1)]
    #[test_case("A/copied/gamma", StatusKind::Deleted, 1)]
    #[test_case("A/mu", StatusKind::Deleted, 1)]
    #[test_case("A/B", StatusKind::Replaced, 2)]
    #[test_case("A/B/lambda", StatusKind::Deleted, 1)]
    fn test_status(node: &str, kind: StatusKind, op_depth: usize) {
        let status = prepared().status(&path(node)).unwrap();

        assert_eq!((status.kind, status.op_depth), (kind, op_depth));
        assert_eq!(status.conflict, None);
    }

    #[test]
    fn test_status_reports_origin() {
        let status = prepared().status(&path("A/copied")).unwrap();

        assert_eq!(
            status.origin,
            Some(RepoLocation::new(path("A/D"), crate::wc::Revision(1)))
        );
        assert_eq!(status.node_kind, NodeKind::Directory);
        assert!(matches!(
            prepared().status(&path("nothing")),
            Err(WcError::NodeNotFound(_))
        ));
    }
}
