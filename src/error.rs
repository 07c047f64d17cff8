use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure modes of [`compress`](crate::compress).
///
/// Anything else (malformed internal state, impossible symbol values) is a
/// bug and handled with debug assertions rather than error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressError {
    /// The output buffer cannot hold the next chunk's header, or the
    /// bitstream ran out of room mid-chunk. The output contents are
    /// unspecified when this is returned.
    BufferTooSmall,
    /// The scratch buffer or the dictionary tables could not be allocated.
    OutOfMemory,
}

impl Display for CompressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressError::BufferTooSmall => {
                write!(f, "output buffer too small for the compressed data")
            }
            CompressError::OutOfMemory => {
                write!(f, "failed to allocate compression work memory")
            }
        }
    }
}

impl Error for CompressError {}
