//! Error types for the SlimPlexor engine
//!
//! Defines engine error types using thiserror for clear error propagation.
//! Would-block is deliberately absent: a sink that cannot take data right
//! now reports [`WriteOutcome::WouldBlock`](crate::sink::WriteOutcome),
//! which is an outcome and not a failure.

use crate::sink::SinkError;
use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] slimplexor_common::Error),

    /// No destination device is mapped to the negotiated rate
    #[error("Could not find target device for sample rate {rate}")]
    DeviceNotFound { rate: u32 },

    /// Transfer buffer could not be allocated
    #[error("Could not allocate transfer buffer of {bytes} bytes")]
    AllocationFailure { bytes: usize },

    /// Source sample format outside the conversion table
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Negotiated parameters cannot describe a stream
    #[error("Invalid stream parameters: {0}")]
    InvalidParameters(String),

    /// Destination device could not be opened
    #[error("Could not open destination device {device}: {source}")]
    SinkOpenFailure {
        device: String,
        #[source]
        source: SinkError,
    },

    /// Destination device rejected hardware or software parameters
    #[error("Destination device {device} rejected parameters: {source}")]
    SinkConfigFailure {
        device: String,
        #[source]
        source: SinkError,
    },

    /// Destination device could not be prepared for playback
    #[error("Error while preparing destination device {device}: {source}")]
    SinkPrepareFailure {
        device: String,
        #[source]
        source: SinkError,
    },

    /// Write failed and the follow-up recovery failed too
    #[error("Write to destination device {device} failed and could not be recovered: {source}")]
    SinkWriteFailure {
        device: String,
        #[source]
        source: SinkError,
    },

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
