//! Test error types.

use std::fmt;

use sporelink_ws::FrameError;

/// Errors that can occur while inspecting captured traffic.
#[derive(Debug)]
pub enum TestError {
    /// Captured bytes did not decode as a frame
    Frame(FrameError),
    /// Captured bytes ended in the middle of a frame
    Truncated(usize),
    /// A client frame was sent without a masking key
    Unmasked(usize),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "Frame error: {e}"),
            Self::Truncated(n) => write!(f, "Truncated capture: {n} trailing bytes"),
            Self::Unmasked(i) => write!(f, "Client frame {i} was not masked"),
        }
    }
}

impl std::error::Error for TestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Frame(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FrameError> for TestError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}
