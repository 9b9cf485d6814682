//! Binary text deltas.
//!
//! A [`TxDeltaStream`] slices a source/target pair into [`DeltaWindow`]s,
//! each holding the instructions rebuilding one stretch of the target.
//! Windows flow into a [`WindowHandler`]: a [`TxDeltaApplier`] rebuilds the
//! target, an [`SvndiffEncoder`] serializes them, and an [`SvndiffDecoder`]
//! parses them back on the other end.

use std::io::Read;

mod apply;
mod checksum;
mod compose;
mod delta_error;
mod stream;
mod svndiff;
mod vdelta;
mod window;

pub use apply::TxDeltaApplier;
pub use checksum::Md5Digest;
pub use compose::compose_windows;
pub use delta_error::{ChecksumRole, DeltaError, MalformedSvndiff};
pub use stream::TxDeltaStream;
pub use svndiff::{SvndiffDecoder, SvndiffEncoder};
pub use vdelta::vdelta;
pub use window::{DeltaOp, DeltaWindow, WindowBuilder, WindowHandler};

use crate::config::DeltaConfig;

/// Pumps every window of `stream` into `handler`, followed by the final
/// `None`.
pub fn send_stream<S, T, H>(
    stream: &mut TxDeltaStream<S, T>,
    handler: &mut H,
) -> Result<(), DeltaError>
where
    S: Read,
    T: Read,
    H: WindowHandler + ?Sized,
{
    while let Some(window) = stream.next_window()? {
        handler.handle_window(Some(&window))?;
    }
    handler.handle_window(None)
}

/// Sends `bytes` as a delta against an empty source: windows made of new
/// data only, followed by the final `None`.
pub fn send_bytes<H: WindowHandler + ?Sized>(
    bytes: &[u8],
    config: &DeltaConfig,
    handler: &mut H,
) -> Result<(), DeltaError> {
    for chunk in bytes.chunks(config.window_size.max(1)) {
        let mut builder = WindowBuilder::new(0, 0, chunk.len());
        builder.push_new(chunk);
        handler.handle_window(Some(&builder.finish()))?;
    }
    handler.handle_window(None)
}
