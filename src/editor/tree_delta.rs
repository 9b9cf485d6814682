//! Describing the difference between two tree revisions as an edit.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::{
    config::DeltaConfig,
    delta::{Md5Digest, TxDeltaStream, send_stream},
    diff::{DatasourceKind, HunkKind, SliceDatasource, diff},
    editor::DeltaEditor,
    wc::{NodeKind, RelPath, Revision, WcError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotNode {
    Directory,
    File(Vec<u8>),
}

impl SnapshotNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            SnapshotNode::Directory => NodeKind::Directory,
            SnapshotNode::File(_) => NodeKind::File,
        }
    }
}

/// An in-memory tree of directories and files, such as one revision of a
/// repository. The root is always a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    nodes: BTreeMap<RelPath, SnapshotNode>,
}

impl Default for TreeSnapshot {
    fn default() -> Self {
        TreeSnapshot {
            nodes: BTreeMap::from([(RelPath::root(), SnapshotNode::Directory)]),
        }
    }
}

impl TreeSnapshot {
    pub fn new() -> Self { Self::default() }

    /// Builds a tree from `(path, text)` pairs; directories are implied by
    /// the paths.
    pub fn from_files<'a>(
        files: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, WcError> {
        let mut tree = TreeSnapshot::new();
        for (path, text) in files {
            tree.insert_file(RelPath::new(path)?, text);
        }
        Ok(tree)
    }

    /// Adds a directory and any missing ancestors, replacing files in the
    /// way.
    pub fn insert_directory(&mut self, path: RelPath) {
        if let Some(parent) = path.parent() {
            self.insert_directory(parent);
        }

        if self.kind(&path) != Some(NodeKind::Directory) {
            self.nodes.insert(path, SnapshotNode::Directory);
        }
    }

    /// Adds or replaces a file, creating missing ancestor directories.
    pub fn insert_file(&mut self, path: RelPath, text: impl Into<Vec<u8>>) {
        if let Some(parent) = path.parent() {
            self.insert_directory(parent);
        }

        self.remove(&path);
        self.nodes.insert(path, SnapshotNode::File(text.into()));
    }

    /// Removes a node with its descendants. The root cannot be removed.
    pub fn remove(&mut self, path: &RelPath) -> bool {
        if path.is_root() {
            return false;
        }

        let doomed = self
            .nodes_under(path)
            .map(|(path, _)| path.clone())
            .collect::<Vec<_>>();
        for path in &doomed {
            self.nodes.remove(path);
        }

        !doomed.is_empty()
    }

    pub fn get(&self, path: &RelPath) -> Option<&SnapshotNode> { self.nodes.get(path) }

    pub fn kind(&self, path: &RelPath) -> Option<NodeKind> { self.get(path).map(SnapshotNode::kind) }

    pub fn file(&self, path: &RelPath) -> Option<&[u8]> {
        match self.get(path) {
            Some(SnapshotNode::File(text)) => Some(text),
            _ => None,
        }
    }

    /// `path` and its descendants, parents first.
    pub fn nodes_under<'a>(
        &'a self,
        path: &'a RelPath,
    ) -> impl Iterator<Item = (&'a RelPath, &'a SnapshotNode)> + 'a {
        self.nodes
            .range(path.clone()..)
            .take_while(move |(node_path, _)| path.contains(node_path))
    }

    /// Names and kinds of the direct children of `path`, in path order.
    pub fn children(&self, path: &RelPath) -> Vec<(String, NodeKind)> {
        self.nodes_under(path)
            .filter(|(node_path, _)| node_path.parent().as_ref() == Some(path))
            .map(|(node_path, node)| (node_path.name().to_owned(), node.kind()))
            .collect()
    }

    fn subtree_eq(&self, other: &TreeSnapshot, path: &RelPath) -> bool {
        self.nodes_under(path).eq(other.nodes_under(path))
    }
}

/// Drives `editor` through the changes turning `from` into `to`, which is
/// `revision` of the tree.
///
/// Directories are visited depth first. Within a directory, the entry lists
/// of both trees, as `(name, kind)` tokens, are diffed: entries in common are
/// opened when anything below them changed, while removed and added entries
/// become `delete_entry` and `add_*` calls. A node whose kind changed is
/// deleted and added again. File texts are sent as delta windows of
/// `config.window_size` bytes against their old text.
///
/// A failing edit is aborted before the error is returned.
pub fn drive_tree_delta<E: DeltaEditor + ?Sized>(
    from: &TreeSnapshot,
    to: &TreeSnapshot,
    revision: Revision,
    config: &DeltaConfig,
    editor: &mut E,
) -> Result<(), E::Error> {
    debug!(%revision, window_size = config.window_size, "Driving tree delta");

    let result = drive_edit(from, to, revision, config, editor);
    if result.is_err() {
        if let Err(error) = editor.abort_edit() {
            warn!("Aborting the failed edit failed too: {error}");
        }
    }

    result
}

fn drive_edit<E: DeltaEditor + ?Sized>(
    from: &TreeSnapshot,
    to: &TreeSnapshot,
    revision: Revision,
    config: &DeltaConfig,
    editor: &mut E,
) -> Result<(), E::Error> {
    editor.set_target_revision(revision)?;
    editor.open_root()?;
    drive_directory(from, to, &RelPath::root(), config, editor)?;
    editor.close_directory()?;
    editor.close_edit()
}

fn drive_directory<E: DeltaEditor + ?Sized>(
    from: &TreeSnapshot,
    to: &TreeSnapshot,
    directory: &RelPath,
    config: &DeltaConfig,
    editor: &mut E,
) -> Result<(), E::Error> {
    let mut entries = SliceDatasource::new(from.children(directory), to.children(directory));
    let Ok(entry_diff) = diff(&mut entries);

    let old = entries.source(DatasourceKind::Original);
    let new = entries.source(DatasourceKind::Modified);
    trace!(%directory, old = old.len(), new = new.len(), "Comparing directory entries");

    for hunk in entry_diff.hunks() {
        match hunk.kind {
            HunkKind::Common => {
                for (name, kind) in &old[hunk.original.start..hunk.original.end()] {
                    let path = directory.join(name);
                    if from.subtree_eq(to, &path) {
                        continue;
                    }

                    match kind {
                        NodeKind::Directory => {
                            editor.open_directory(&path)?;
                            drive_directory(from, to, &path, config, editor)?;
                            editor.close_directory()?;
                        }
                        NodeKind::File => {
                            editor.open_file(&path)?;
                            send_text(from.file(&path), to.file(&path).unwrap_or_default(), config, editor)?;
                        }
                    }
                }
            }
            HunkKind::Modified => {
                for (name, _) in &old[hunk.original.start..hunk.original.end()] {
                    editor.delete_entry(&directory.join(name))?;
                }

                for (name, kind) in &new[hunk.modified.start..hunk.modified.end()] {
                    let path = directory.join(name);
                    match kind {
                        NodeKind::Directory => {
                            editor.add_directory(&path)?;
                            drive_directory(from, to, &path, config, editor)?;
                            editor.close_directory()?;
                        }
                        NodeKind::File => {
                            editor.add_file(&path)?;
                            send_text(None, to.file(&path).unwrap_or_default(), config, editor)?;
                        }
                    }
                }
            }
            // Only 3-way diffs produce these.
            HunkKind::Latest | HunkKind::DiffCommon | HunkKind::Conflict => {}
        }
    }

    Ok(())
}

/// Sends `text` as a delta against `base`, then closes the open file.
fn send_text<E: DeltaEditor + ?Sized>(
    base: Option<&[u8]>,
    text: &[u8],
    config: &DeltaConfig,
    editor: &mut E,
) -> Result<(), E::Error> {
    let base_checksum = base.map(Md5Digest::of);
    let mut stream = TxDeltaStream::with_config(base.unwrap_or_default(), text, config);

    let mut handler = editor.apply_text_delta(base_checksum)?;
    send_stream(&mut stream, &mut *handler)?;
    drop(handler);

    editor.close_file(stream.md5_digest())
}
