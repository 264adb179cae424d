//! Error types for the WebSocket server.
//!
//! Failures fall into three families: protocol violations (malformed frames,
//! bad handshakes), socket-level I/O errors, and server lifecycle errors.
//! Protocol and I/O failures are local to one session; lifecycle failures
//! affect the whole server.

use thiserror::Error;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Opcode value outside the six defined by RFC 6455.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// Client frame arrived without the mask bit set (RFC 6455 Section 5.1).
    #[error("Mask bit not set on client frame")]
    MaskBitNotSet,

    /// Reserved bits set without a negotiated extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Buffer ends before the frame does.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// Frame payload exceeds the configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Advertised payload size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Invalid UTF-8 in a text frame.
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8,

    /// Upgrade request carried no Sec-WebSocket-Key header.
    #[error("Handshake request missing Sec-WebSocket-Key header")]
    MissingHandshakeKey,

    /// Malformed upgrade request.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Handshake data exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Actual handshake size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Peer closed the underlying stream.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Stream read exceeded the configured timeout.
    #[error("Stream read timed out")]
    Timeout,

    /// I/O error on the underlying socket.
    #[error("I/O error: {0}")]
    Io(String),

    /// `start` called while the server is already running.
    #[error("Server is already running")]
    AlreadyRunning,

    /// Bind or listen failure during `start`.
    #[error("Server startup failed: {0}")]
    Startup(String),
}

impl Error {
    /// Whether this error is a protocol violation (malformed frame or
    /// handshake). Non-retryable; the offending session is torn down.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::InvalidOpcode(_)
                | Error::MaskBitNotSet
                | Error::ReservedBitsSet
                | Error::IncompleteFrame { .. }
                | Error::FrameTooLarge { .. }
                | Error::ControlFrameTooLarge(_)
                | Error::InvalidUtf8
                | Error::MissingHandshakeKey
                | Error::InvalidHandshake(_)
                | Error::HandshakeTooLarge { .. }
        )
    }

    /// Whether this error is a socket-level failure.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Timeout | Error::ConnectionClosed
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
