use std::io::{self, Read, Write};

use tracing::{debug, trace};

use super::{
    checksum::{Md5Context, Md5Digest},
    delta_error::{ChecksumRole, DeltaError},
    window::{DeltaOp, DeltaWindow, WindowHandler},
};

/// Applies a window stream to `source`, writing the produced text to
/// `target`.
///
/// Windows must arrive in stream order: a source view may move forward but
/// never back, which lets the applier read `source` strictly sequentially
/// and keep only the current source view in memory.
#[derive(Debug)]
pub struct TxDeltaApplier<S, W> {
    source: S,
    target: W,

    source_view: Vec<u8>,
    source_view_offset: u64,
    source_view_len: usize,
    target_view: Vec<u8>,

    checksum: Md5Context,
    expected_result: Option<Md5Digest>,
    finished: bool,
}

impl<S: Read, W: Write> TxDeltaApplier<S, W> {
    pub fn new(source: S, target: W) -> Self {
        TxDeltaApplier {
            source,
            target,
            source_view: Vec::new(),
            source_view_offset: 0,
            source_view_len: 0,
            target_view: Vec::new(),
            checksum: Md5Context::default(),
            expected_result: None,
            finished: false,
        }
    }

    /// Verify the digest of the produced text when the stream ends.
    #[must_use]
    pub fn with_expected_result(mut self, digest: Option<Md5Digest>) -> Self {
        self.expected_result = digest;
        self
    }

    pub fn into_target(self) -> W { self.target }

    fn apply_window(&mut self, window: &DeltaWindow) -> Result<(), DeltaError> {
        assert!(
            window.sview_offset >= self.source_view_offset
                && window.source_view_end()
                    >= self.source_view_offset + self.source_view_len as u64,
            "Source view must not slide backwards"
        );

        size_buffer(&mut self.target_view, window.tview_len);

        if window.sview_offset != self.source_view_offset
            || window.sview_len > self.source_view.len()
        {
            size_buffer(&mut self.source_view, window.sview_len);

            // Keep the part of the previous view that overlaps the new one.
            let buffered_end = self.source_view_offset + self.source_view_len as u64;
            if buffered_end > window.sview_offset {
                let start = (window.sview_offset - self.source_view_offset) as usize;
                self.source_view.copy_within(start..self.source_view_len, 0);
                self.source_view_len -= start;
            } else {
                // Source bytes between the two views are never needed.
                let gap = window.sview_offset - buffered_end;
                let skipped = io::copy(&mut (&mut self.source).take(gap), &mut io::sink())?;
                if skipped != gap {
                    return Err(DeltaError::IncompleteData {
                        expected: gap as usize,
                        actual: skipped as usize,
                    });
                }
                self.source_view_len = 0;
            }
            self.source_view_offset = window.sview_offset;
        }

        if self.source_view_len < window.sview_len {
            let expected = window.sview_len - self.source_view_len;
            let actual = read_full(
                &mut self.source,
                &mut self.source_view[self.source_view_len..window.sview_len],
            )?;
            if actual != expected {
                return Err(DeltaError::IncompleteData { expected, actual });
            }
            self.source_view_len = window.sview_len;
        }

        apply_instructions(window, &self.source_view, &mut self.target_view);

        let produced = &self.target_view[..window.tview_len];
        self.checksum.update(produced);
        self.target.write_all(produced)?;

        trace!(
            sview_offset = window.sview_offset,
            tview_len = window.tview_len,
            "Applied delta window"
        );

        Ok(())
    }

    fn finish(&mut self) -> Result<(), DeltaError> {
        self.finished = true;
        self.target.flush()?;

        let actual = std::mem::take(&mut self.checksum).finish();
        debug!(%actual, "Delta applied");

        match self.expected_result {
            Some(expected) if expected != actual => Err(DeltaError::ChecksumMismatch {
                role: ChecksumRole::Result,
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }
}

impl<S: Read, W: Write> WindowHandler for TxDeltaApplier<S, W> {
    fn handle_window(&mut self, window: Option<&DeltaWindow>) -> Result<(), DeltaError> {
        assert!(!self.finished, "Delta window received after the end of the stream");

        match window {
            Some(window) => self.apply_window(window),
            None => self.finish(),
        }
    }
}

/// Grows `buffer` to hold at least `len` bytes, doubling its size at least.
fn size_buffer(buffer: &mut Vec<u8>, len: usize) {
    if len > buffer.len() {
        let size = (buffer.len() * 2).max(len);
        buffer.resize(size, 0);
    }
}

/// Reads until `buffer` is full or `reader` is exhausted, returning the
/// number of bytes read.
fn read_full<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}

/// Runs the instructions of `window` against the source view, producing
/// exactly `tview_len` bytes at the start of `target`.
fn apply_instructions(window: &DeltaWindow, source: &[u8], target: &mut [u8]) {
    let mut position = 0;

    for op in &window.ops {
        let length = op.length();
        assert!(
            position + length <= window.tview_len,
            "Delta instructions overrun the target view"
        );

        match *op {
            DeltaOp::Source { offset, .. } => {
                target[position..position + length]
                    .copy_from_slice(&source[offset..offset + length]);
            }
            DeltaOp::Target { offset, .. } => {
                assert!(offset < position, "Target copy must start in produced text");

                // Byte by byte: the copy may overlap the bytes it produces.
                for i in offset..offset + length {
                    target[position] = target[i];
                    position += 1;
                }
                continue;
            }
            DeltaOp::New { offset, .. } => {
                target[position..position + length]
                    .copy_from_slice(&window.new_data[offset..offset + length]);
            }
        }

        position += length;
    }

    assert_eq!(
        position, window.tview_len,
        "Delta instructions must produce exactly the target view"
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::{collection::vec, prelude::*, sample::Index};
    use test_case::test_matrix;

    use super::*;
    use crate::delta::{TxDeltaStream, WindowBuilder, send_stream};

    /// Text lines with enough repetition for the delta to find matches.
    fn sample(len: usize, seed: u32) -> Vec<u8> {
        (0u32..)
            .flat_map(|i| format!("{seed} {}\n", i.wrapping_mul(seed) % 97).into_bytes())
            .take(len)
            .collect()
    }

    fn round_trip(source: &[u8], target: &[u8], window_size: usize) -> Vec<u8> {
        let mut stream = TxDeltaStream::new(source, target, window_size);
        let mut applier = TxDeltaApplier::new(source, Vec::new())
            .with_expected_result(Some(Md5Digest::of(target)));

        send_stream(&mut stream, &mut applier).unwrap();
        applier.into_target()
    }

    #[test_matrix(
        [1, 7, 64, 1000, 100_000],
        [(0, 0), (0, 300), (300, 0), (500, 700), (2000, 1500)]
    )]
    fn test_round_trip(window_size: usize, (source_len, target_len): (usize, usize)) {
        let source = sample(source_len, 3);
        let mut target = sample(target_len, 7);
        // Share a stretch of the source so copies happen.
        let shared = source.len().min(target.len()) / 2;
        target[..shared].copy_from_slice(&source[source.len() - shared..]);

        assert_eq!(round_trip(&source, &target, window_size), target);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_spliced_text_round_trips(
            source in vec(0u8..12, 0..2000),
            insert in vec(0u8..12, 0..300),
            cut in (any::<Index>(), any::<Index>()),
            window_size in prop_oneof![1usize..64, 64usize..4096],
        ) {
            let mut bounds = [cut.0.index(source.len() + 1), cut.1.index(source.len() + 1)];
            bounds.sort_unstable();

            let mut target = source[..bounds[0]].to_vec();
            target.extend_from_slice(&insert);
            target.extend_from_slice(&source[bounds[1]..]);

            prop_assert_eq!(round_trip(&source, &target, window_size), target);
        }
    }

    #[test]
    fn test_edited_copy_round_trips() {
        let source = sample(5000, 11);
        let mut target = source.clone();
        target.splice(1000..1010, b"inserted text".iter().copied());
        target.drain(3000..3400);
        target.extend_from_slice(&source[..100]);

        for window_size in [50, 512, 4096] {
            assert_eq!(round_trip(&source, &target, window_size), target);
        }
    }

    #[test]
    fn test_short_source_is_incomplete_data() {
        let mut builder = WindowBuilder::new(0, 10, 10);
        builder.push_source(0, 10);
        let window = builder.finish();

        let mut applier = TxDeltaApplier::new(&b"12345"[..], Vec::new());
        let error = applier.handle_window(Some(&window)).unwrap_err();

        assert!(matches!(
            error,
            DeltaError::IncompleteData {
                expected: 10,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_result_checksum_mismatch() {
        let mut applier = TxDeltaApplier::new(&b""[..], Vec::new())
            .with_expected_result(Some(Md5Digest::of(b"something else")));

        let mut builder = WindowBuilder::new(0, 0, 3);
        builder.push_new(b"abc");
        applier.handle_window(Some(&builder.finish())).unwrap();

        let error = applier.handle_window(None).unwrap_err();
        assert!(matches!(
            error,
            DeltaError::ChecksumMismatch {
                role: ChecksumRole::Result,
                ..
            }
        ));
    }

    #[test]
    fn test_overlapping_target_copy_repeats() {
        let mut builder = WindowBuilder::new(0, 0, 7);
        builder.push_new(b"ab");
        builder.push_target(0, 5);

        let mut applier = TxDeltaApplier::new(&b""[..], Vec::new());
        applier.handle_window(Some(&builder.finish())).unwrap();
        applier.handle_window(None).unwrap();

        assert_eq!(applier.into_target(), b"abababa");
    }

    #[test]
    #[should_panic(expected = "Source view must not slide backwards")]
    fn test_backward_source_view_panics() {
        let source = b"0123456789";
        let mut applier = TxDeltaApplier::new(&source[..], Vec::new());

        let mut first = WindowBuilder::new(4, 4, 4);
        first.push_source(0, 4);
        applier.handle_window(Some(&first.finish())).unwrap();

        let mut second = WindowBuilder::new(2, 2, 2);
        second.push_source(0, 2);
        let _ = applier.handle_window(Some(&second.finish()));
    }
}
