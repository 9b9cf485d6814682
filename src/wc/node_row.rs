use std::fmt;

use serde::{Deserialize, Serialize};

use super::relpath::RelPath;
use crate::delta::Md5Digest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "r{}", self.0) }
}

/// A node of the repository: where a base node was checked out from, or
/// where a copied node was copied from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoLocation {
    pub path: RelPath,
    pub revision: Revision,
}

impl RepoLocation {
    pub fn new(path: RelPath, revision: Revision) -> Self { RepoLocation { path, revision } }

    /// The location of the child `name` in the same revision.
    pub fn join(&self, name: &str) -> Self {
        RepoLocation {
            path: self.path.join(name),
            revision: self.revision,
        }
    }
}

impl fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^/{}@{}", self.path.as_str(), self.revision.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// The node exists at this layer.
    Normal,
    /// The node of a shallower layer is deleted by this layer.
    BaseDeleted,
    /// The node is known not to exist at this layer, e.g. a child removed
    /// from a copied directory.
    NotPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
}

/// One layer of one path.
///
/// Depth 0 is the base layer, mirroring the repository; its `origin` is the
/// node's repository location. Rows at greater depths record local
/// operations; for them `origin` is the copy source of copied nodes and
/// `None` for added and deleted ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRow {
    pub path: RelPath,
    pub op_depth: usize,
    pub presence: Presence,
    pub kind: NodeKind,
    #[serde(default)]
    pub origin: Option<RepoLocation>,
    #[serde(default)]
    pub checksum: Option<Md5Digest>,
}

impl NodeRow {
    pub fn is_normal(&self) -> bool { self.presence == Presence::Normal }

    pub fn is_directory(&self) -> bool { self.kind == NodeKind::Directory }

    pub(crate) fn base(path: RelPath, kind: NodeKind, origin: RepoLocation) -> Self {
        NodeRow {
            path,
            op_depth: 0,
            presence: Presence::Normal,
            kind,
            origin: Some(origin),
            checksum: None,
        }
    }

    pub(crate) fn base_deleted(path: RelPath, op_depth: usize, kind: NodeKind) -> Self {
        NodeRow {
            path,
            op_depth,
            presence: Presence::BaseDeleted,
            kind,
            origin: None,
            checksum: None,
        }
    }
}

/// What the working copy had done to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Nodes below it were added, copied or deleted.
    Edited,
    Deleted,
    Replaced,
    Added,
}

/// What an update tried to do to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    Edit,
    Add,
    Delete,
}

/// An incoming change that could not be merged with the local layers of a
/// node. Both are kept until the conflict is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeConflict {
    pub reason: ConflictReason,
    pub action: ConflictAction,
}

impl fmt::Display for TreeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local {:?}, incoming {:?}", self.reason, self.action)
    }
}
