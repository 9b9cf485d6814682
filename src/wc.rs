//! The op-depth model of a working copy.
//!
//! Every versioned node owns a stack of [`NodeRow`]s. The row at depth 0
//! mirrors the repository (the base layer); each local operation adds rows
//! at the depth of the directory it was rooted at, so a node's visible state
//! is simply its highest row. Reverting an operation removes its layer and
//! uncovers whatever lies below.

mod memory_store;
mod node_row;
mod pristine;
mod relpath;
mod row_store;
mod update_editor;
mod wc_error;
mod working_copy;

pub use memory_store::MemoryRowStore;
pub use node_row::{
    ConflictAction, ConflictReason, NodeKind, NodeRow, Presence, RepoLocation, Revision, TreeConflict,
};
pub use pristine::PristineStore;
pub use relpath::RelPath;
pub use row_store::{RowBatch, RowChange, RowStore, StoreError, Txn};
pub use update_editor::UpdateEditor;
pub use wc_error::WcError;
pub use working_copy::{NodeStatus, StatusKind, WorkingCopy};
