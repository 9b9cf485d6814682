use thiserror::Error;

use crate::wc::RelPath;

/// Calls of a tree-delta edit that break the protocol's ordering rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("The edit root is already open")]
    RootAlreadyOpen,

    #[error("The edit root has not been opened")]
    RootNotOpen,

    #[error("'{path}' is not a child of the open directory '{directory}'")]
    NotAChild { path: RelPath, directory: RelPath },

    #[error("File '{0}' must be closed first")]
    FileStillOpen(RelPath),

    #[error("No file is open")]
    NoOpenFile,

    #[error("No directory is open")]
    NoOpenDirectory,

    #[error("The edit is still open at '{0}'")]
    EditStillOpen(RelPath),

    #[error("The edit has already ended")]
    EditEnded,
}
