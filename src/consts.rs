/// Target window size used when slicing a source/target pair into delta
/// windows.
pub const DEFAULT_WINDOW_SIZE: usize = 102_400;

/// Lines of context around each unified diff hunk.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

pub const DEFAULT_CONFLICT_MODIFIED_MARKER: &str = "<<<<<<<";
pub const DEFAULT_CONFLICT_ORIGINAL_MARKER: &str = "|||||||";
pub const DEFAULT_CONFLICT_SEPARATOR: &str = "=======";
pub const DEFAULT_CONFLICT_LATEST_MARKER: &str = ">>>>>>>";

/// Magic bytes that open every svndiff stream, followed by the version byte.
pub const SVNDIFF_MAGIC: &[u8; 3] = b"SVN";
pub const SVNDIFF_VERSION: u8 = 0;
