use super::delta_error::{DeltaError, MalformedSvndiff};

/// One instruction of a delta window. Offsets of `Source` copies are
/// relative to the window's source view, offsets of `Target` copies to the
/// target view produced so far, and offsets of `New` copies to the window's
/// literal data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOp {
    Source { offset: usize, length: usize },
    Target { offset: usize, length: usize },
    New { offset: usize, length: usize },
}

impl DeltaOp {
    pub fn length(&self) -> usize {
        match *self {
            DeltaOp::Source { length, .. }
            | DeltaOp::Target { length, .. }
            | DeltaOp::New { length, .. } => length,
        }
    }
}

/// Instructions reconstructing `tview_len` target bytes from the source
/// bytes `sview_offset .. sview_offset + sview_len` and literal data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaWindow {
    pub sview_offset: u64,
    pub sview_len: usize,
    pub tview_len: usize,
    pub ops: Vec<DeltaOp>,
    pub new_data: Vec<u8>,
}

impl DeltaWindow {
    pub fn source_view_end(&self) -> u64 { self.sview_offset + self.sview_len as u64 }

    /// Checks that every instruction stays within the window's views and
    /// literal data, and that together they produce exactly `tview_len`
    /// bytes.
    pub fn validate(&self) -> Result<(), MalformedSvndiff> {
        let mut position = 0;
        for op in &self.ops {
            let in_range = match *op {
                DeltaOp::Source { offset, length } => {
                    offset.checked_add(length).is_some_and(|end| end <= self.sview_len)
                }
                DeltaOp::Target { offset, .. } => offset < position,
                DeltaOp::New { offset, length } => {
                    offset.checked_add(length).is_some_and(|end| end <= self.new_data.len())
                }
            };
            if !in_range {
                return Err(MalformedSvndiff::InvalidInstructions);
            }
            position += op.length();
        }

        if position == self.tview_len { Ok(()) } else { Err(MalformedSvndiff::InvalidInstructions) }
    }
}

/// Accumulates the instructions of one window.
#[derive(Debug)]
pub struct WindowBuilder {
    window: DeltaWindow,
}

impl WindowBuilder {
    pub fn new(sview_offset: u64, sview_len: usize, tview_len: usize) -> Self {
        WindowBuilder {
            window: DeltaWindow {
                sview_offset,
                sview_len,
                tview_len,
                ..DeltaWindow::default()
            },
        }
    }

    pub fn push_source(&mut self, offset: usize, length: usize) {
        self.window.ops.push(DeltaOp::Source { offset, length });
    }

    /// Appends a source copy, extending the previous instruction when it is
    /// a source copy ending where this one starts.
    pub fn extend_source(&mut self, offset: usize, length: usize) {
        match self.window.ops.last_mut() {
            Some(DeltaOp::Source {
                offset: last_offset,
                length: last_length,
            }) if *last_offset + *last_length == offset => *last_length += length,
            _ => self.push_source(offset, length),
        }
    }

    pub fn push_target(&mut self, offset: usize, length: usize) {
        self.window.ops.push(DeltaOp::Target { offset, length });
    }

    /// Appends literal bytes, extending the previous instruction when it is
    /// a `New` copy too.
    pub fn push_new(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let offset = self.window.new_data.len();
        self.window.new_data.extend_from_slice(bytes);

        match self.window.ops.last_mut() {
            Some(DeltaOp::New { length, .. }) => *length += bytes.len(),
            _ => self.window.ops.push(DeltaOp::New {
                offset,
                length: bytes.len(),
            }),
        }
    }

    pub fn finish(self) -> DeltaWindow {
        debug_assert_eq!(
            self.window.ops.iter().map(DeltaOp::length).sum::<usize>(),
            self.window.tview_len,
            "Window instructions must produce exactly the target view"
        );
        self.window
    }
}

/// Consumer of a window stream. Windows arrive in order; `None` marks the
/// end of the stream and is delivered exactly once.
pub trait WindowHandler {
    fn handle_window(&mut self, window: Option<&DeltaWindow>) -> Result<(), DeltaError>;
}

impl<H: WindowHandler + ?Sized> WindowHandler for &mut H {
    fn handle_window(&mut self, window: Option<&DeltaWindow>) -> Result<(), DeltaError> {
        (**self).handle_window(window)
    }
}

/// Collects the windows of a stream.
impl WindowHandler for Vec<DeltaWindow> {
    fn handle_window(&mut self, window: Option<&DeltaWindow>) -> Result<(), DeltaError> {
        if let Some(window) = window {
            self.push(window.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_consecutive_new_data_merges() {
        let mut builder = WindowBuilder::new(0, 4, 9);
        builder.push_new(b"ab");
        builder.push_new(b"c");
        builder.push_source(0, 4);
        builder.push_new(b"de");

        let window = builder.finish();
        assert_eq!(
            window.ops,
            [
                DeltaOp::New {
                    offset: 0,
                    length: 3
                },
                DeltaOp::Source {
                    offset: 0,
                    length: 4
                },
                DeltaOp::New {
                    offset: 3,
                    length: 2
                },
            ]
        );
        assert_eq!(window.new_data, b"abcde");
        assert_eq!(window.validate(), Ok(()));
    }

    #[test]
    fn test_contiguous_source_copies_extend() {
        let mut builder = WindowBuilder::new(0, 10, 7);
        builder.extend_source(2, 3);
        builder.extend_source(5, 2);
        builder.extend_source(0, 2);

        assert_eq!(
            builder.finish().ops,
            [
                DeltaOp::Source {
                    offset: 2,
                    length: 5
                },
                DeltaOp::Source {
                    offset: 0,
                    length: 2
                },
            ]
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_instructions() {
        let window = |ops: Vec<DeltaOp>, tview_len| DeltaWindow {
            sview_offset: 0,
            sview_len: 4,
            tview_len,
            ops,
            new_data: b"xy".to_vec(),
        };

        let source_past_view = window(vec![DeltaOp::Source { offset: 2, length: 3 }], 3);
        let target_from_the_future = window(vec![DeltaOp::Target { offset: 0, length: 1 }], 1);
        let new_past_data = window(vec![DeltaOp::New { offset: 1, length: 2 }], 2);
        let short = window(vec![DeltaOp::New { offset: 0, length: 2 }], 3);

        for invalid in [source_past_view, target_from_the_future, new_past_data, short] {
            assert_eq!(invalid.validate(), Err(MalformedSvndiff::InvalidInstructions));
        }
    }
}
