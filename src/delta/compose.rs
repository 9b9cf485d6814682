use tracing::trace;

use super::{
    delta_error::DeltaError,
    window::{DeltaOp, DeltaWindow, WindowBuilder},
};

/// Composes `a`, turning a source view into an intermediate text, with `b`,
/// turning a view of that intermediate text into the final one. Applying the
/// composite to `a`'s source view gives what applying `a` and then `b` does.
///
/// `b`'s source view is a range of `a`'s target view. A `b` that never
/// copies from its source is already the composite, apart from its source
/// view, and `None` is returned.
pub fn compose_windows(a: &DeltaWindow, b: &DeltaWindow) -> Result<Option<DeltaWindow>, DeltaError> {
    if !b.ops.iter().any(|op| matches!(op, DeltaOp::Source { .. })) {
        return Ok(None);
    }

    a.validate()?;
    b.validate()?;
    if b.source_view_end() > a.tview_len as u64 {
        return Err(DeltaError::ComposeOutOfRange {
            end: b.source_view_end(),
            available: a.tview_len,
        });
    }

    let index = OffsetIndex::new(a);
    let view_start = b.sview_offset as usize;
    let mut builder = WindowBuilder::new(a.sview_offset, a.sview_len, b.tview_len);

    for op in &b.ops {
        match *op {
            DeltaOp::Source { offset, length } => {
                let start = view_start + offset;
                index.copy_range(start, start + length, &mut builder);
            }
            DeltaOp::Target { offset, length } => builder.push_target(offset, length),
            DeltaOp::New { offset, length } => builder.push_new(&b.new_data[offset..offset + length]),
        }
    }

    let composite = builder.finish();
    trace!(
        first_ops = a.ops.len(),
        second_ops = b.ops.len(),
        composite_ops = composite.ops.len(),
        "Composed delta windows"
    );
    Ok(Some(composite))
}

/// Maps positions in the target view of a window to the instructions
/// producing them.
struct OffsetIndex<'a> {
    window: &'a DeltaWindow,
    starts: Vec<usize>,
}

impl<'a> OffsetIndex<'a> {
    fn new(window: &'a DeltaWindow) -> Self {
        let starts = window
            .ops
            .iter()
            .scan(0, |position, op| {
                let start = *position;
                *position += op.length();
                Some(start)
            })
            .collect();

        OffsetIndex { window, starts }
    }

    /// The instruction producing the target byte at `position`, and where
    /// its output starts.
    fn find(&self, position: usize) -> (DeltaOp, usize) {
        let index = self.starts.partition_point(|&start| start <= position) - 1;
        (self.window.ops[index], self.starts[index])
    }

    /// Appends instructions producing the target bytes `start..end` of the
    /// indexed window from its source view and literal data alone.
    fn copy_range(&self, start: usize, end: usize, builder: &mut WindowBuilder) {
        // Ranges still to copy, the next one on top.
        let mut pending = vec![(start, end)];

        while let Some((start, end)) = pending.pop() {
            if start >= end {
                continue;
            }

            let (op, op_start) = self.find(start);
            let piece_end = end.min(op_start + op.length());
            if piece_end < end {
                pending.push((piece_end, end));
            }

            let skip = start - op_start;
            let length = piece_end - start;
            match op {
                DeltaOp::Source { offset, .. } => builder.extend_source(offset + skip, length),
                DeltaOp::New { offset, .. } => {
                    builder.push_new(&self.window.new_data[offset + skip..offset + skip + length]);
                }
                DeltaOp::Target { offset, .. } => {
                    // A target copy may overlap its own output, repeating the
                    // `period` bytes before it. Every byte maps back into that
                    // stretch, which lies before the copy.
                    let period = op_start - offset;
                    let mut pieces = Vec::new();
                    let mut position = skip;
                    while position < skip + length {
                        let phase = position % period;
                        let chunk = (period - phase).min(skip + length - position);
                        pieces.push((offset + phase, offset + phase + chunk));
                        position += chunk;
                    }
                    pending.extend(pieces.into_iter().rev());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::{collection::vec, prelude::*};
    use test_case::test_case;

    use super::*;
    use crate::delta::{TxDeltaApplier, TxDeltaStream, WindowHandler};

    fn apply(window: &DeltaWindow, source: &[u8]) -> Vec<u8> {
        let mut applier = TxDeltaApplier::new(source, Vec::new());
        applier.handle_window(Some(window)).unwrap();
        applier.handle_window(None).unwrap();
        applier.into_target()
    }

    fn single_window(source: &[u8], target: &[u8]) -> DeltaWindow {
        let mut stream = TxDeltaStream::new(source, target, 1 << 16);
        stream.next_window().unwrap().unwrap()
    }

    /// The composite, or `b` moved onto `a`'s source view when it needs no
    /// source at all.
    fn composite_of(a: &DeltaWindow, b: &DeltaWindow) -> DeltaWindow {
        compose_windows(a, b).unwrap().unwrap_or_else(|| DeltaWindow {
            sview_offset: a.sview_offset,
            sview_len: a.sview_len,
            ..b.clone()
        })
    }

    /// `abcXY` followed by a copy repeating `XY`.
    fn repeating_window() -> DeltaWindow {
        let mut builder = WindowBuilder::new(0, 6, 11);
        builder.push_source(0, 3);
        builder.push_new(b"XY");
        builder.push_target(3, 6);
        builder.finish()
    }

    #[test_case(
        "the quick brown fox jumps over the lazy dog\n",
        "the quick brown cat jumps over the lazy dog\nand again\n",
        "and again\nthe quick brown cat naps\n";
        "reordered text"
    )]
    #[test_case("", "fresh text", "fresh text, fresh text"; "empty source")]
    #[test_case("aaaaaaaaaa", "aaaaaaaaaaaaaaaaaaaaaaaaa", "baaaaaaaaaaaaaaaaaaab"; "runs")]
    fn test_composite_matches_applying_both(source: &str, middle: &str, target: &str) {
        let a = single_window(source.as_bytes(), middle.as_bytes());
        let b = single_window(middle.as_bytes(), target.as_bytes());
        assert_eq!(apply(&b, &apply(&a, source.as_bytes())), target.as_bytes());

        let composite = composite_of(&a, &b);
        assert_eq!(apply(&composite, source.as_bytes()), target.as_bytes());
    }

    proptest! {
        #[test]
        fn test_random_composites_match_applying_both(
            source in vec(0u8..6, 0..300),
            middle in vec(0u8..6, 1..300),
            target in vec(0u8..6, 1..300),
        ) {
            let a = single_window(&source, &middle);
            let b = single_window(&middle, &target);

            let composite = composite_of(&a, &b);
            prop_assert_eq!(apply(&composite, &source), target);
        }
    }

    #[test]
    fn test_copies_out_of_an_overlapping_target_copy() {
        let source = b"abcdef";
        let a = repeating_window();
        assert_eq!(apply(&a, source), b"abcXYXYXYXY");

        let mut builder = WindowBuilder::new(2, 8, 11);
        builder.push_source(3, 4);
        builder.push_new(b"--");
        builder.push_source(0, 2);
        builder.push_target(0, 3);
        let b = builder.finish();

        let composite = compose_windows(&a, &b).unwrap().unwrap();
        assert_eq!(composite.sview_offset, a.sview_offset);
        assert_eq!(composite.sview_len, a.sview_len);
        assert_eq!(apply(&composite, source), b"XYXY--cXXYX");
    }

    #[test]
    fn test_second_window_without_source_copies_is_the_composite() {
        let mut builder = WindowBuilder::new(0, 0, 6);
        builder.push_new(b"ab");
        builder.push_target(0, 4);
        let b = builder.finish();

        assert_eq!(compose_windows(&repeating_window(), &b).unwrap(), None);
        assert_eq!(apply(&b, b""), b"ababab");
    }

    #[test]
    fn test_source_view_past_the_first_target_is_rejected() {
        let mut builder = WindowBuilder::new(8, 4, 4);
        builder.push_source(0, 4);

        assert!(matches!(
            compose_windows(&repeating_window(), &builder.finish()),
            Err(DeltaError::ComposeOutOfRange {
                end: 12,
                available: 11
            })
        ));
    }
}
