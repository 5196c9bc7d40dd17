use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by permafrost.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Requested FFT size is not a supported power of two.
    InvalidFftSize(usize),
    /// No source buffer has been bound to the engine.
    BufferUnavailable,
    /// The bound buffer name is not present in the buffer pool.
    BufferNotFound(String),
    /// The bound buffer holds fewer frames than one analysis window.
    BufferTooShort { needed: usize, actual: usize },
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFftSize(size) => {
                write!(
                    f,
                    "FFT size must be a power of 2 between 512 and 8192, but is {size}"
                )
            }
            Self::BufferUnavailable => write!(f, "No buffer set"),
            Self::BufferNotFound(name) => write!(f, "Buffer '{name}' not found"),
            Self::BufferTooShort { needed, actual } => {
                write!(
                    f,
                    "Buffer too small (need at least {needed} frames, got {actual})"
                )
            }
        }
    }
}
