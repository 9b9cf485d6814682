use super::editor_error::EditorError;
use crate::wc::RelPath;

/// The state an editor keeps for one open node, `D` for directories and `F`
/// for files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditContext<D, F> {
    Directory { path: RelPath, state: D },
    File { path: RelPath, state: F },
}

impl<D, F> EditContext<D, F> {
    pub fn path(&self) -> &RelPath {
        match self {
            EditContext::Directory { path, .. } | EditContext::File { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Editing,
    Ended,
}

/// The nodes an edit currently has open, innermost last.
///
/// Every call of the tree-delta protocol goes through the stack, which
/// rejects calls out of order: the root opens once and first, a node is
/// always a child of the innermost open directory, a file closes before
/// anything else happens, a directory closes after its children and nothing
/// happens once the edit has ended.
#[derive(Debug, Clone)]
pub struct EditStack<D, F> {
    contexts: Vec<EditContext<D, F>>,
    phase: Phase,
}

impl<D, F> Default for EditStack<D, F> {
    fn default() -> Self {
        EditStack {
            contexts: Vec::new(),
            phase: Phase::NotStarted,
        }
    }
}

impl<D, F> EditStack<D, F> {
    pub fn new() -> Self { Self::default() }

    pub fn depth(&self) -> usize { self.contexts.len() }

    pub fn open_root(&mut self, state: D) -> Result<(), EditorError> {
        match self.phase {
            Phase::NotStarted => {}
            Phase::Editing => return Err(EditorError::RootAlreadyOpen),
            Phase::Ended => return Err(EditorError::EditEnded),
        }

        self.phase = Phase::Editing;
        self.contexts.push(EditContext::Directory {
            path: RelPath::root(),
            state,
        });
        Ok(())
    }

    /// Checks that `path` may be touched now: it must be a direct child of
    /// the innermost directory, which has no open file.
    pub fn check_child(&self, path: &RelPath) -> Result<&D, EditorError> {
        match self.phase {
            Phase::NotStarted => return Err(EditorError::RootNotOpen),
            Phase::Editing => {}
            Phase::Ended => return Err(EditorError::EditEnded),
        }

        match self.contexts.last() {
            Some(EditContext::File { path: file, .. }) => Err(EditorError::FileStillOpen(file.clone())),
            Some(EditContext::Directory {
                path: directory,
                state,
            }) => {
                if path.parent().as_ref() == Some(directory) {
                    Ok(state)
                } else {
                    Err(EditorError::NotAChild {
                        path: path.clone(),
                        directory: directory.clone(),
                    })
                }
            }
            None => Err(EditorError::NoOpenDirectory),
        }
    }

    pub fn open_directory(&mut self, path: &RelPath, state: D) -> Result<(), EditorError> {
        self.check_child(path)?;
        self.contexts.push(EditContext::Directory {
            path: path.clone(),
            state,
        });
        Ok(())
    }

    pub fn open_file(&mut self, path: &RelPath, state: F) -> Result<(), EditorError> {
        self.check_child(path)?;
        self.contexts.push(EditContext::File {
            path: path.clone(),
            state,
        });
        Ok(())
    }

    /// The innermost open file.
    pub fn file_mut(&mut self) -> Result<(&RelPath, &mut F), EditorError> {
        match self.contexts.last_mut() {
            Some(EditContext::File { path, state }) => Ok((&*path, state)),
            _ => Err(EditorError::NoOpenFile),
        }
    }

    pub fn close_file(&mut self) -> Result<(RelPath, F), EditorError> {
        match self.contexts.pop() {
            Some(EditContext::File { path, state }) => Ok((path, state)),
            other => {
                self.contexts.extend(other);
                Err(EditorError::NoOpenFile)
            }
        }
    }

    pub fn close_directory(&mut self) -> Result<(RelPath, D), EditorError> {
        match self.contexts.pop() {
            Some(EditContext::Directory { path, state }) => Ok((path, state)),
            Some(EditContext::File { path, state }) => {
                let error = EditorError::FileStillOpen(path.clone());
                self.contexts.push(EditContext::File { path, state });
                Err(error)
            }
            None => Err(EditorError::NoOpenDirectory),
        }
    }

    /// Ends the edit; every node must have been closed.
    pub fn close_edit(&mut self) -> Result<(), EditorError> {
        match self.phase {
            Phase::NotStarted => return Err(EditorError::RootNotOpen),
            Phase::Editing => {}
            Phase::Ended => return Err(EditorError::EditEnded),
        }

        if let Some(open) = self.contexts.last() {
            return Err(EditorError::EditStillOpen(open.path().clone()));
        }

        self.phase = Phase::Ended;
        Ok(())
    }

    /// Ends the edit wherever it stands.
    pub fn abort_edit(&mut self) -> Result<(), EditorError> {
        if self.phase == Phase::Ended {
            return Err(EditorError::EditEnded);
        }

        self.contexts.clear();
        self.phase = Phase::Ended;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn path(text: &str) -> RelPath { RelPath::new(text).unwrap() }

    #[test]
    fn test_well_ordered_edit() {
        let mut stack = EditStack::<(), ()>::new();
        stack.open_root(()).unwrap();
        stack.open_directory(&path("a"), ()).unwrap();
        stack.open_file(&path("a/f"), ()).unwrap();
        assert_eq!(stack.depth(), 3);

        assert_eq!(stack.close_file().unwrap().0, path("a/f"));
        assert_eq!(stack.close_directory().unwrap().0, path("a"));
        assert_eq!(stack.close_directory().unwrap().0, RelPath::root());
        stack.close_edit().unwrap();
    }

    #[test]
    fn test_protocol_violations() {
        let mut stack = EditStack::<(), ()>::new();
        assert_eq!(
            stack.open_directory(&path("a"), ()),
            Err(EditorError::RootNotOpen)
        );

        stack.open_root(()).unwrap();
        assert_eq!(stack.open_root(()), Err(EditorError::RootAlreadyOpen));
        assert_eq!(
            stack.open_file(&path("a/f"), ()),
            Err(EditorError::NotAChild {
                path: path("a/f"),
                directory: RelPath::root()
            })
        );

        stack.open_file(&path("f"), ()).unwrap();
        assert_eq!(
            stack.open_file(&path("g"), ()),
            Err(EditorError::FileStillOpen(path("f")))
        );
        assert_eq!(
            stack.close_directory(),
            Err(EditorError::FileStillOpen(path("f")))
        );
        assert_eq!(stack.close_edit(), Err(EditorError::EditStillOpen(path("f"))));

        stack.close_file().unwrap();
        assert_eq!(stack.close_file(), Err(EditorError::NoOpenFile));
        stack.close_directory().unwrap();
        stack.close_edit().unwrap();

        assert_eq!(stack.abort_edit(), Err(EditorError::EditEnded));
        assert_eq!(stack.open_root(()), Err(EditorError::EditEnded));
    }
}
