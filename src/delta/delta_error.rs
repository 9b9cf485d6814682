use std::io;

use thiserror::Error;

use super::checksum::Md5Digest;

/// What a checksum was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumRole {
    /// The source text a delta is applied to.
    Base,
    /// The text a delta produced.
    Result,
}

impl std::fmt::Display for ChecksumRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumRole::Base => write!(f, "base text"),
            ChecksumRole::Result => write!(f, "result text"),
        }
    }
}

/// Ways in which svndiff data can be corrupt.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedSvndiff {
    #[error("svndiff has invalid header")]
    InvalidHeader,

    #[error("svndiff contains corrupt window header")]
    CorruptWindowHeader,

    #[error("svndiff has backwards-sliding source views")]
    BackwardSlidingView,

    #[error("svndiff contains invalid instructions")]
    InvalidInstructions,

    #[error("unexpected end of svndiff input")]
    UnexpectedEnd,
}

#[derive(Error, Debug)]
pub enum DeltaError {
    /// The underlying byte stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Delta source ended unexpectedly: the window needs {expected} more bytes, got {actual}")]
    IncompleteData { expected: usize, actual: usize },

    #[error(transparent)]
    Malformed(#[from] MalformedSvndiff),

    #[error("Cannot compose windows: the source view ends at {end}, but the first window produces {available} bytes")]
    ComposeOutOfRange { end: u64, available: usize },

    #[error("Unsupported svndiff version {0}")]
    UnsupportedVersion(u8),

    #[error("Checksum mismatch for {role}: expected {expected}, actual {actual}")]
    ChecksumMismatch {
        role: ChecksumRole,
        expected: Md5Digest,
        actual: Md5Digest,
    },
}
