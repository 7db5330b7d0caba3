//! Protocol error types.

use thiserror::Error;

use crate::constants::describe_opcode;

/// Errors that can occur when working with the programmer protocol.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The byte stream ended before a whole frame arrived.
    #[error("transport closed mid-frame")]
    TransportClosed,

    /// A payload does not fit the one-byte length field.
    #[error("payload too large: maximum {max} bytes, got {actual}")]
    PayloadTooLarge {
        /// Maximum allowed payload length.
        max: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// A raw text frame must carry between 1 and 256 bytes.
    #[error("raw frame body must be 1..=256 bytes, got {actual}")]
    InvalidRawLength {
        /// Actual body length.
        actual: usize,
    },

    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Frame is longer than its length byte says.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        actual: usize,
    },

    /// A command's payload is shorter than its fixed argument block.
    #[error("malformed {} payload: expected {expected} bytes, got {actual}", describe_opcode(*.opcode))]
    MalformedPayload {
        /// Opcode of the offending frame.
        opcode: u8,
        /// Required payload length.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// The peer answered with a different opcode than the request implies.
    #[error("unexpected response: expected {}, got {}", describe_opcode(*.expected), describe_opcode(*.actual))]
    UnexpectedResponse {
        /// Opcode that was expected.
        expected: u8,
        /// Opcode that arrived.
        actual: u8,
    },

    /// FILEREAD can only ask for 1 to 256 bytes.
    #[error("read count must be 1..=256, got {0}")]
    InvalidReadCount(usize),

    /// I/O failure on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the stream is unusable after this error.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProtocolError::TransportClosed | ProtocolError::Io(_))
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
