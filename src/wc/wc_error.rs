use thiserror::Error;

use super::{node_row::TreeConflict, relpath::RelPath, row_store::StoreError};
use crate::{delta::DeltaError, editor::EditorError};

#[derive(Error, Debug)]
pub enum WcError {
    #[error("'{0}' is not a valid relative path")]
    InvalidPath(String),

    #[error("'{0}' is not under version control")]
    NodeNotFound(RelPath),

    #[error("'{0}' already exists")]
    NodeExists(RelPath),

    #[error("The parent of '{0}' is not a versioned directory")]
    ParentNotFound(RelPath),

    #[error("'{0}' is not a directory")]
    NotADirectory(RelPath),

    #[error("'{0}' is not a file")]
    NotAFile(RelPath),

    #[error("Cannot copy '{from}' into itself at '{to}'")]
    CopyIntoItself { from: RelPath, to: RelPath },

    #[error("The working copy root cannot be {0}")]
    RootNotModifiable(&'static str),

    #[error("Reverting '{0}' alone would orphan its descendants; revert recursively")]
    RevertRequiresRecursion(RelPath),

    #[error("'{0}' is not the root of a local operation")]
    NotOperationRoot(RelPath),

    #[error("Cannot commit '{0}' because its parent is not committed")]
    ParentNotCommitted(RelPath),

    #[error("'{path}' is in conflict: {conflict}")]
    Conflicted { path: RelPath, conflict: TreeConflict },

    #[error("Node rows of '{path}' at depth {op_depth} are inconsistent: {reason}")]
    Corrupt {
        path: RelPath,
        op_depth: usize,
        reason: &'static str,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Delta(#[from] DeltaError),

    #[error(transparent)]
    Editor(#[from] EditorError),
}

impl WcError {
    /// Cancellation is requested by the user and is not worth reporting as
    /// a failure.
    pub fn is_cancelled(&self) -> bool { matches!(self, WcError::Cancelled) }
}
