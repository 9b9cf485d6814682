use std::io::Read;

use tracing::{debug, trace};

use super::{
    checksum::{Md5Context, Md5Digest},
    delta_error::DeltaError,
    vdelta::vdelta,
    window::{DeltaWindow, WindowBuilder},
};
use crate::config::DeltaConfig;

/// Lazily computes the delta windows turning `source` into `target`.
///
/// Every window covers the next `window_size` target bytes. Its source view
/// is the last `window_size` source bytes of the previous window followed by
/// the next `window_size` unread source bytes; the very first read takes an
/// extra half window to get the overlap started. Once the source runs dry,
/// the final source view is reused for the remaining target windows.
///
/// The MD5 digest of the target is computed along the way and is available
/// from [`TxDeltaStream::md5_digest`] once the stream is exhausted.
#[derive(Debug)]
pub struct TxDeltaStream<S, T> {
    source: S,
    target: T,
    window_size: usize,

    buffer: Vec<u8>,
    saved_source_len: usize,
    position: u64,

    checksum: Md5Context,
    digest: Option<Md5Digest>,
    finished: bool,
}

impl<S: Read, T: Read> TxDeltaStream<S, T> {
    pub fn new(source: S, target: T, window_size: usize) -> Self {
        assert!(window_size > 0, "Delta windows must cover at least one byte");

        TxDeltaStream {
            source,
            target,
            window_size,
            buffer: Vec::with_capacity(window_size * 3),
            saved_source_len: 0,
            position: 0,
            checksum: Md5Context::default(),
            digest: None,
            finished: false,
        }
    }

    /// A stream cutting windows of the configured size.
    pub fn with_config(source: S, target: T, config: &DeltaConfig) -> Self {
        Self::new(source, target, config.window_size.max(1))
    }

    /// Returns the next window, or `None` once the target is exhausted.
    /// Every call after the first `None` returns `None` again.
    pub fn next_window(&mut self) -> Result<Option<DeltaWindow>, DeltaError> {
        if self.finished {
            return Ok(None);
        }

        let result = self.compute_window();
        if result.is_err() {
            self.finished = true;
        }
        result
    }

    /// The digest of the whole target, known after the last window.
    pub fn md5_digest(&self) -> Option<Md5Digest> { self.digest }

    fn compute_window(&mut self) -> Result<Option<DeltaWindow>, DeltaError> {
        let mut new_source_len = self.window_size;
        if self.saved_source_len == 0 {
            new_source_len += self.window_size / 2;
        }

        self.buffer.truncate(self.saved_source_len);
        let new_source_len = (&mut self.source)
            .take(new_source_len as u64)
            .read_to_end(&mut self.buffer)?;
        let total_source_len = self.buffer.len();

        let target_len = (&mut self.target)
            .take(self.window_size as u64)
            .read_to_end(&mut self.buffer)?;
        self.position += new_source_len as u64;

        if target_len == 0 {
            self.finished = true;

            let digest = std::mem::take(&mut self.checksum).finish();
            self.digest = Some(digest);
            debug!(source_bytes = self.position, %digest, "Delta stream finished");

            return Ok(None);
        }

        self.checksum.update(&self.buffer[total_source_len..]);

        let sview_offset = self.position - total_source_len as u64;
        let mut builder = WindowBuilder::new(sview_offset, total_source_len, target_len);
        vdelta(&mut builder, &self.buffer, total_source_len);
        let window = builder.finish();

        trace!(
            sview_offset,
            sview_len = total_source_len,
            tview_len = target_len,
            ops = window.ops.len(),
            new_data = window.new_data.len(),
            "Computed delta window"
        );

        // Keep the last window's worth of the source view.
        self.saved_source_len = total_source_len.min(self.window_size);
        self.buffer
            .copy_within(total_source_len - self.saved_source_len..total_source_len, 0);

        Ok(Some(window))
    }
}

impl<S: Read, T: Read> Iterator for TxDeltaStream<S, T> {
    type Item = Result<DeltaWindow, DeltaError>;

    fn next(&mut self) -> Option<Self::Item> { self.next_window().transpose() }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::delta::DeltaOp;

    #[test]
    fn test_identical_content_copies_only_from_source() {
        let bytes = (0..100_u8).collect::<Vec<_>>();
        let stream = TxDeltaStream::new(&bytes[..], &bytes[..], 16);

        let windows = stream.collect::<Result<Vec<_>, _>>().unwrap();

        assert_eq!(windows.len(), 7);
        assert_eq!(
            windows.iter().map(|window| window.tview_len).sum::<usize>(),
            100
        );
        for window in &windows {
            assert!(window.new_data.is_empty(), "{window:?}");
            assert!(
                window
                    .ops
                    .iter()
                    .all(|op| matches!(op, DeltaOp::Source { .. })),
                "{window:?}"
            );
        }
    }

    #[test]
    fn test_source_views_slide_forward() {
        let bytes = (0..100_u8).collect::<Vec<_>>();
        let windows = TxDeltaStream::new(&bytes[..], &bytes[..], 16)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        let views = windows
            .iter()
            .map(|window| (window.sview_offset, window.sview_len))
            .collect::<Vec<_>>();
        assert_eq!(
            views,
            [
                (0, 24),
                (8, 32),
                (24, 32),
                (40, 32),
                (56, 32),
                (72, 28),
                (84, 16)
            ]
        );
    }

    #[test_case(b"", b""; "both empty")]
    #[test_case(b"old", b""; "empty target")]
    fn test_empty_target_has_no_windows(source: &[u8], target: &[u8]) {
        let mut stream = TxDeltaStream::new(source, target, 16);

        assert_eq!(stream.next_window().unwrap(), None);
        assert_eq!(stream.next_window().unwrap(), None);
        assert_eq!(stream.md5_digest(), Some(Md5Digest::of(b"")));
    }

    #[test]
    fn test_digest_is_known_after_the_last_window() {
        let target = b"some target text";
        let mut stream = TxDeltaStream::new(&b"source"[..], &target[..], 4);

        while stream.next_window().unwrap().is_some() {
            assert_eq!(stream.md5_digest(), None);
        }
        assert_eq!(stream.md5_digest(), Some(Md5Digest::of(target)));
    }
}
