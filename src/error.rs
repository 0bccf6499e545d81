//! Error types for the transfer protocol and the download manager.

use thiserror::Error;

/// Framing or message errors. Every variant is fatal to the session carrying it.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Length header larger than `MAX_FRAME_LEN`
    #[error("frame length {len} exceeds limit {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Stream ended partway through a length header
    #[error("truncated frame header: got {got} of 4 bytes")]
    TruncatedHeader { got: usize },

    /// Payload is not the JSON message we expected
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// File body does not add up to the announced size
    #[error("transfer length mismatch: announced {expected} bytes, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    /// Peer closed the stream while a response was still owed
    #[error("connection closed by peer")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a client session that end the in-flight download with no
/// usable outcome.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Connect refused or reset
    #[error("connection error: {0}")]
    Connection(#[source] std::io::Error),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// Cancelled by the user between frames
    #[error("download cancelled")]
    Cancelled,

    /// Local filesystem failure before any bytes were requested
    #[error("local I/O error: {0}")]
    Local(#[source] std::io::Error),
}
