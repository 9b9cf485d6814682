//! The svndiff serialization of window streams.
//!
//! A stream starts with `SVN` and a version byte, followed by one record per
//! window:
//!
//! ```text
//! sview_offset sview_len tview_len instructions_len new_data_len
//! instructions...
//! new data...
//! ```
//!
//! Integers are big-endian groups of seven bits, the high bit of each byte
//! marking that another byte follows. An instruction starts with a byte
//! holding the opcode in its top two bits (`00` source, `01` target, `10`
//! new) and the length in its low six bits; a length outside `1..=63` is
//! written as a separate integer after a zero. Source and target copies are
//! followed by their offset; new data is consumed in instruction order.

use std::io::{self, Write};

use tracing::{trace, warn};

use super::{
    delta_error::{DeltaError, MalformedSvndiff},
    window::{DeltaOp, DeltaWindow, WindowHandler},
};
use crate::{
    config::DeltaConfig,
    consts::{SVNDIFF_MAGIC, SVNDIFF_VERSION},
};

const HEADER_LEN: usize = SVNDIFF_MAGIC.len() + 1;

const OP_SOURCE: u8 = 0b00;
const OP_TARGET: u8 = 0b01;
const OP_NEW: u8 = 0b10;

/// Writes the windows it receives to `output` as svndiff.
#[derive(Debug)]
pub struct SvndiffEncoder<W> {
    output: W,
    header_written: bool,
}

impl<W: Write> SvndiffEncoder<W> {
    pub fn new(output: W) -> Self {
        SvndiffEncoder {
            output,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W { self.output }
}

impl<W: Write> WindowHandler for SvndiffEncoder<W> {
    fn handle_window(&mut self, window: Option<&DeltaWindow>) -> Result<(), DeltaError> {
        if !self.header_written {
            self.output.write_all(SVNDIFF_MAGIC)?;
            self.output.write_all(&[SVNDIFF_VERSION])?;
            self.header_written = true;
        }

        let Some(window) = window else {
            self.output.flush()?;
            return Ok(());
        };

        let mut instructions = Vec::new();
        for op in &window.ops {
            let (opcode, offset) = match *op {
                DeltaOp::Source { offset, .. } => (OP_SOURCE, Some(offset)),
                DeltaOp::Target { offset, .. } => (OP_TARGET, Some(offset)),
                DeltaOp::New { .. } => (OP_NEW, None),
            };

            let length = op.length();
            if (1..=0x3f).contains(&length) {
                instructions.push((opcode << 6) | length as u8);
            } else {
                instructions.push(opcode << 6);
                encode_int(&mut instructions, length as u64);
            }

            if let Some(offset) = offset {
                encode_int(&mut instructions, offset as u64);
            }
        }

        let mut header = Vec::new();
        encode_int(&mut header, window.sview_offset);
        encode_int(&mut header, window.sview_len as u64);
        encode_int(&mut header, window.tview_len as u64);
        encode_int(&mut header, instructions.len() as u64);
        encode_int(&mut header, window.new_data.len() as u64);

        self.output.write_all(&header)?;
        self.output.write_all(&instructions)?;
        self.output.write_all(&window.new_data)?;

        Ok(())
    }
}

/// Parses svndiff pushed into it and hands every complete window to a
/// [`WindowHandler`].
///
/// Bytes can arrive in arbitrarily sized pieces, either through
/// [`SvndiffDecoder::push`] or through [`io::Write`]. Every window is
/// validated before it is handed on: its instructions must stay within its
/// views and its new data, and its source view must not slide backward
/// relative to the previous window.
#[derive(Debug)]
pub struct SvndiffDecoder<H> {
    handler: H,
    tolerate_early_close: bool,

    header: Vec<u8>,
    buffer: Vec<u8>,
    last_sview_offset: u64,
    last_sview_end: u64,
}

impl<H: WindowHandler> SvndiffDecoder<H> {
    pub fn new(handler: H, tolerate_early_close: bool) -> Self {
        SvndiffDecoder {
            handler,
            tolerate_early_close,
            header: Vec::with_capacity(HEADER_LEN),
            buffer: Vec::new(),
            last_sview_offset: 0,
            last_sview_end: 0,
        }
    }

    pub fn with_config(handler: H, config: &DeltaConfig) -> Self { Self::new(handler, config.tolerate_early_close) }

    pub fn push(&mut self, mut bytes: &[u8]) -> Result<(), DeltaError> {
        if self.header.len() < HEADER_LEN {
            let take = bytes.len().min(HEADER_LEN - self.header.len());
            self.header.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            self.check_header()?;
        }

        self.buffer.extend_from_slice(bytes);

        while let Some((window, consumed)) = self.parse_window()? {
            trace!(
                sview_offset = window.sview_offset,
                tview_len = window.tview_len,
                "Decoded svndiff window"
            );

            self.last_sview_offset = window.sview_offset;
            self.last_sview_end = window.source_view_end();
            self.buffer.drain(..consumed);

            self.handler.handle_window(Some(&window))?;
        }

        Ok(())
    }

    /// Ends the stream, delivering the final `None` to the handler and
    /// returning it.
    pub fn close(mut self) -> Result<H, DeltaError> {
        if self.header.len() < HEADER_LEN || !self.buffer.is_empty() {
            if !self.tolerate_early_close {
                return Err(MalformedSvndiff::UnexpectedEnd.into());
            }

            warn!(
                pending_bytes = self.buffer.len(),
                "svndiff stream closed in the middle of a window"
            );
        }

        self.handler.handle_window(None)?;
        Ok(self.handler)
    }

    fn check_header(&self) -> Result<(), DeltaError> {
        let magic_len = self.header.len().min(SVNDIFF_MAGIC.len());
        if self.header[..magic_len] != SVNDIFF_MAGIC[..magic_len] {
            return Err(MalformedSvndiff::InvalidHeader.into());
        }

        match self.header.get(SVNDIFF_MAGIC.len()) {
            Some(&version) if version > SVNDIFF_VERSION => Err(DeltaError::UnsupportedVersion(version)),
            _ => Ok(()),
        }
    }

    /// Parses the window at the start of the buffer, returning it with the
    /// number of bytes it occupies, or `None` when more bytes are needed.
    fn parse_window(&self) -> Result<Option<(DeltaWindow, usize)>, DeltaError> {
        let mut position = 0;
        let mut fields = [0_u64; 5];
        for field in &mut fields {
            let Some((value, length)) = decode_int(&self.buffer[position..])? else {
                return Ok(None);
            };
            *field = value;
            position += length;
        }

        let [sview_offset, sview_len, tview_len, instructions_len, new_len] = fields;
        let [sview_len, tview_len, instructions_len, new_len] =
            [sview_len, tview_len, instructions_len, new_len].map(usize::try_from);
        let (Ok(sview_len), Ok(tview_len), Ok(instructions_len), Ok(new_len)) =
            (sview_len, tview_len, instructions_len, new_len)
        else {
            return Err(MalformedSvndiff::CorruptWindowHeader.into());
        };

        let sview_end = sview_offset
            .checked_add(sview_len as u64)
            .ok_or(MalformedSvndiff::CorruptWindowHeader)?;
        if sview_offset < self.last_sview_offset || sview_end < self.last_sview_end {
            return Err(MalformedSvndiff::BackwardSlidingView.into());
        }

        let body_len = instructions_len
            .checked_add(new_len)
            .ok_or(MalformedSvndiff::CorruptWindowHeader)?;
        if self.buffer.len() - position < body_len {
            return Ok(None);
        }

        let instructions = &self.buffer[position..position + instructions_len];
        let ops = decode_instructions(instructions, sview_len, tview_len, new_len)?;
        position += instructions_len;

        let window = DeltaWindow {
            sview_offset,
            sview_len,
            tview_len,
            ops,
            new_data: self.buffer[position..position + new_len].to_vec(),
        };

        Ok(Some((window, position + new_len)))
    }
}

impl<H: WindowHandler> Write for SvndiffDecoder<H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

fn encode_int(output: &mut Vec<u8>, value: u64) {
    let mut groups = 1;
    while groups < 10 && value >> (7 * groups) > 0 {
        groups += 1;
    }

    for group in (0..groups).rev() {
        let continuation = if group > 0 { 0x80 } else { 0 };
        output.push(((value >> (7 * group)) & 0x7f) as u8 | continuation);
    }
}

/// Decodes an integer from the start of `bytes`, returning it with the
/// number of bytes it occupies, or `None` when `bytes` ends inside it.
fn decode_int(bytes: &[u8]) -> Result<Option<(u64, usize)>, MalformedSvndiff> {
    let mut value: u64 = 0;
    for (index, byte) in bytes.iter().enumerate() {
        if value >> (64 - 7) != 0 {
            return Err(MalformedSvndiff::CorruptWindowHeader);
        }
        value = (value << 7) | u64::from(byte & 0x7f);

        if byte & 0x80 == 0 {
            return Ok(Some((value, index + 1)));
        }
    }
    Ok(None)
}

fn read_int(bytes: &mut &[u8]) -> Result<usize, MalformedSvndiff> {
    let (value, length) = decode_int(bytes)
        .ok()
        .flatten()
        .ok_or(MalformedSvndiff::InvalidInstructions)?;
    *bytes = &bytes[length..];
    usize::try_from(value).map_err(|_| MalformedSvndiff::InvalidInstructions)
}

fn decode_instructions(
    mut bytes: &[u8],
    sview_len: usize,
    tview_len: usize,
    new_len: usize,
) -> Result<Vec<DeltaOp>, MalformedSvndiff> {
    let mut ops = Vec::new();
    let mut target_position = 0;
    let mut new_position = 0;

    while let Some((&selector, rest)) = bytes.split_first() {
        bytes = rest;

        let mut length = usize::from(selector & 0x3f);
        if length == 0 {
            length = read_int(&mut bytes)?;
        }
        if length > tview_len - target_position {
            return Err(MalformedSvndiff::InvalidInstructions);
        }

        let op = match selector >> 6 {
            OP_SOURCE => {
                let offset = read_int(&mut bytes)?;
                if offset > sview_len || length > sview_len - offset {
                    return Err(MalformedSvndiff::InvalidInstructions);
                }
                DeltaOp::Source { offset, length }
            }
            OP_TARGET => {
                let offset = read_int(&mut bytes)?;
                if offset >= target_position {
                    return Err(MalformedSvndiff::InvalidInstructions);
                }
                DeltaOp::Target { offset, length }
            }
            OP_NEW => {
                if length > new_len - new_position {
                    return Err(MalformedSvndiff::InvalidInstructions);
                }
                let offset = new_position;
                new_position += length;
                DeltaOp::New { offset, length }
            }
            _ => return Err(MalformedSvndiff::InvalidInstructions),
        };

        target_position += length;
        ops.push(op);
    }

    if target_position != tview_len || new_position != new_len {
        return Err(MalformedSvndiff::InvalidInstructions);
    }

    Ok(ops)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::delta::{TxDeltaStream, WindowBuilder, send_stream};

    fn encode(windows: &[DeltaWindow]) -> Vec<u8> {
        let mut encoder = SvndiffEncoder::new(Vec::new());
        for window in windows {
            encoder.handle_window(Some(window)).unwrap();
        }
        encoder.handle_window(None).unwrap();
        encoder.into_inner()
    }

    fn decode(bytes: &[u8]) -> Result<Vec<DeltaWindow>, DeltaError> {
        let mut decoder = SvndiffDecoder::new(Vec::new(), false);
        decoder.push(bytes)?;
        decoder.close()
    }

    fn sample_window() -> DeltaWindow {
        let mut builder = WindowBuilder::new(5, 10, 80);
        builder.push_source(2, 8);
        builder.push_new(b"xyz");
        builder.push_target(1, 69);
        builder.finish()
    }

    #[test_case(1, &[0x01])]
    #[test_case(33, &[0x21])]
    #[test_case(129, &[0x81, 0x01])]
    #[test_case(2000, &[0x8f, 0x50])]
    fn test_integer_encoding(value: u64, expected: &[u8]) {
        let mut output = Vec::new();
        encode_int(&mut output, value);
        assert_eq!(output, expected);
        assert_eq!(decode_int(&output), Ok(Some((value, expected.len()))));
    }

    #[test]
    fn test_window_encoding() {
        let bytes = encode(&[sample_window()]);

        assert_eq!(
            hex::encode(bytes),
            concat!(
                "53564e00",     // header
                "050a50",   // sview_offset, sview_len, tview_len
                "06",       // instructions_len
                "03",       // new_data_len
                "0802",     // source, 8 bytes at 2
                "83",       // new, 3 bytes
                "404501",   // target, 69 bytes at 1
                "78797a",   // new data
            )
        );
    }

    #[test]
    fn test_empty_stream_is_only_a_header() {
        assert_eq!(encode(&[]), b"SVN\0");
        assert!(decode(b"SVN\0").unwrap().is_empty());
    }

    #[test]
    fn test_stream_round_trip() {
        let source = b"the original text of a file that is about to change a bit".repeat(20);
        let mut target = source.clone();
        target.splice(300..320, b"some new words".iter().copied());
        target.extend_from_slice(b"and an appendix");

        let mut windows = Vec::new();
        send_stream(
            &mut TxDeltaStream::new(&source[..], &target[..], 128),
            &mut windows,
        )
        .unwrap();
        assert!(windows.len() > 1);

        assert_eq!(decode(&encode(&windows)).unwrap(), windows);
    }

    #[test]
    fn test_byte_by_byte_push() {
        let windows = vec![sample_window(), sample_window()];
        let bytes = encode(&windows);

        let mut decoder = SvndiffDecoder::new(Vec::new(), false);
        for byte in &bytes {
            decoder.push(std::slice::from_ref(byte)).unwrap();
        }

        assert_eq!(decoder.close().unwrap(), windows);
    }

    #[test]
    fn test_write_adapter() {
        let bytes = encode(&[sample_window()]);

        let mut decoder = SvndiffDecoder::new(Vec::new(), false);
        io::copy(&mut &bytes[..], &mut decoder).unwrap();

        assert_eq!(decoder.close().unwrap(), [sample_window()]);
    }

    #[test_case(b"SVX\0"; "wrong magic")]
    #[test_case(b"X"; "wrong first byte")]
    fn test_invalid_header(bytes: &[u8]) {
        assert!(matches!(
            decode(bytes),
            Err(DeltaError::Malformed(MalformedSvndiff::InvalidHeader))
        ));
    }

    #[test]
    fn test_newer_version_is_rejected() {
        assert!(matches!(
            decode(b"SVN\x01"),
            Err(DeltaError::UnsupportedVersion(1))
        ));
    }

    #[test]
    fn test_early_close() {
        let bytes = encode(&[sample_window()]);
        let truncated = &bytes[..bytes.len() - 2];

        assert!(matches!(
            decode(truncated),
            Err(DeltaError::Malformed(MalformedSvndiff::UnexpectedEnd))
        ));

        let config = DeltaConfig {
            tolerate_early_close: true,
            ..DeltaConfig::default()
        };
        let mut tolerant = SvndiffDecoder::with_config(Vec::new(), &config);
        tolerant.push(truncated).unwrap();
        assert!(tolerant.close().unwrap().is_empty());
    }

    #[test]
    fn test_source_copy_outside_view_is_invalid() {
        let mut builder = WindowBuilder::new(0, 4, 8);
        builder.push_source(0, 8);
        let bytes = encode(&[builder.finish()]);

        assert!(matches!(
            decode(&bytes),
            Err(DeltaError::Malformed(MalformedSvndiff::InvalidInstructions))
        ));
    }

    #[test]
    fn test_backward_sliding_view_is_rejected() {
        let mut later = WindowBuilder::new(10, 4, 4);
        later.push_source(0, 4);
        let mut earlier = WindowBuilder::new(2, 4, 4);
        earlier.push_source(0, 4);

        let bytes = encode(&[later.finish(), earlier.finish()]);
        let mut decoder = SvndiffDecoder::new(Vec::new(), false);

        assert!(matches!(
            decoder.push(&bytes),
            Err(DeltaError::Malformed(MalformedSvndiff::BackwardSlidingView))
        ));
    }
}
