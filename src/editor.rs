//! The tree-delta editor protocol.
//!
//! A driver describes the changes between two trees as an ordered series of
//! calls on a [`DeltaEditor`]: the root is opened first, every node is
//! reached by opening or adding it inside its open parent directory, file
//! texts arrive as delta windows, and every node is closed before its parent.
//! Editors keep their per-node state on an [`EditStack`], which also rejects
//! calls made out of order.

mod edit_stack;
mod editor_error;
mod tree_delta;

pub use edit_stack::{EditContext, EditStack};
pub use editor_error::EditorError;
pub use tree_delta::{SnapshotNode, TreeSnapshot, drive_tree_delta};

use crate::{
    delta::{DeltaError, Md5Digest, WindowHandler},
    wc::{RelPath, Revision},
};

pub trait DeltaEditor {
    type Error: From<EditorError> + From<DeltaError> + std::fmt::Display;

    fn set_target_revision(&mut self, _revision: Revision) -> Result<(), Self::Error> { Ok(()) }

    fn open_root(&mut self) -> Result<(), Self::Error>;

    /// Removes the child `path` of the open directory, with all of its
    /// descendants.
    fn delete_entry(&mut self, path: &RelPath) -> Result<(), Self::Error>;

    fn add_directory(&mut self, path: &RelPath) -> Result<(), Self::Error>;

    fn open_directory(&mut self, path: &RelPath) -> Result<(), Self::Error>;

    fn close_directory(&mut self) -> Result<(), Self::Error>;

    fn add_file(&mut self, path: &RelPath) -> Result<(), Self::Error>;

    fn open_file(&mut self, path: &RelPath) -> Result<(), Self::Error>;

    /// Returns the consumer of the delta windows rebuilding the open file's
    /// text from its current text, whose digest the driver expects to be
    /// `base_checksum`.
    fn apply_text_delta(
        &mut self,
        base_checksum: Option<Md5Digest>,
    ) -> Result<Box<dyn WindowHandler + '_>, Self::Error>;

    /// Closes the open file; `text_checksum` is the digest its new text must
    /// have.
    fn close_file(&mut self, text_checksum: Option<Md5Digest>) -> Result<(), Self::Error>;

    fn close_edit(&mut self) -> Result<(), Self::Error>;

    fn abort_edit(&mut self) -> Result<(), Self::Error>;
}
