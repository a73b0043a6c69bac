//! Error types for georaster

use std::io;
use thiserror::Error;

/// Result type for georaster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in raster, band and codec operations
#[derive(Error, Debug)]
pub enum Error {
    /// Bad dimensions, missing buffer or an operation the band kind does not allow
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Pixel coordinates or band index outside the valid extent
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// An allocation could not be satisfied
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Corrupt or truncated serialized bytes
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Degenerate geometry or a feature outside what the reader handles
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedData(msg.into())
    }

    pub(crate) fn out_of_range(msg: impl Into<String>) -> Self {
        Error::OutOfRange(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MalformedData("truncated header".to_string());
        assert_eq!(err.to_string(), "Malformed data: truncated header");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_helpers_pick_variant() {
        assert!(matches!(Error::invalid("x"), Error::InvalidArgument(_)));
        assert!(matches!(Error::out_of_range("x"), Error::OutOfRange(_)));
        assert!(matches!(Error::malformed("x"), Error::MalformedData(_)));
    }
}
