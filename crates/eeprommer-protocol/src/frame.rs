//! Frame encoding/decoding utilities.
//!
//! Every message on the programmer's serial link is one length-prefixed frame:
//!
//! ```text
//! +-----+--------+-------------------+
//! |  L  | opcode | payload[0..L]     |
//! +-----+--------+-------------------+
//! ```
//!
//! `L` is the payload length (0-255), not the frame length, so a frame is
//! always `L + 2` bytes. There is no start marker and no checksum: a reader
//! that loses its place stays lost.
//!
//! The programmer also emits *raw* frames for text (the FILEOPEN prompt): the
//! same length byte followed by `L + 1` text bytes, with the first text byte
//! sitting in the opcode slot.

use std::io::{self, Read, Write};

use bytes::BufMut;
use log::trace;

use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};

/// One protocol message: an opcode byte and up to 255 payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw opcode byte. Kept raw so unknown opcodes can still be reported.
    pub opcode: u8,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame.
    pub fn new(opcode: impl Into<u8>, payload: impl Into<Vec<u8>>) -> Self {
        Frame {
            opcode: opcode.into(),
            payload: payload.into(),
        }
    }

    /// Create a frame with an empty payload.
    pub fn empty(opcode: impl Into<u8>) -> Self {
        Frame::new(opcode, Vec::new())
    }

    /// Encode the frame for transmission.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_frame(self.opcode, &self.payload)
    }

    /// Decode exactly one frame from `bytes`.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Frame> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(ProtocolError::FrameTooShort {
                expected: FRAME_OVERHEAD,
                actual: bytes.len(),
            });
        }

        let expected = bytes[0] as usize + FRAME_OVERHEAD;
        if bytes.len() < expected {
            return Err(ProtocolError::FrameTooShort {
                expected,
                actual: bytes.len(),
            });
        }
        if bytes.len() > expected {
            return Err(ProtocolError::FrameTooLong {
                max: expected,
                actual: bytes.len(),
            });
        }

        Ok(Frame::new(bytes[1], &bytes[2..]))
    }

    /// Fixed one-byte argument at the start of the payload.
    pub fn arg_u8(&self) -> ProtocolResult<u8> {
        self.payload
            .first()
            .copied()
            .ok_or(ProtocolError::MalformedPayload {
                opcode: self.opcode,
                expected: 1,
                actual: 0,
            })
    }

    /// Fixed little-endian 16-bit argument at the start of the payload.
    pub fn arg_u16_le(&self) -> ProtocolResult<u16> {
        match self.payload.as_slice() {
            [lo, hi, ..] => Ok(u16::from_le_bytes([*lo, *hi])),
            _ => Err(ProtocolError::MalformedPayload {
                opcode: self.opcode,
                expected: 2,
                actual: self.payload.len(),
            }),
        }
    }
}

/// Encode an opcode and payload as a frame.
pub fn encode_frame(opcode: u8, payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge {
            max: MAX_PAYLOAD,
            actual: payload.len(),
        });
    }

    let mut buf = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    buf.put_u8(payload.len() as u8);
    buf.put_u8(opcode);
    buf.put_slice(payload);
    Ok(buf)
}

/// Encode a raw text frame: length byte `body.len() - 1`, then `body`.
pub fn encode_raw(body: &[u8]) -> ProtocolResult<Vec<u8>> {
    if body.is_empty() || body.len() > MAX_RAW_BODY {
        return Err(ProtocolError::InvalidRawLength { actual: body.len() });
    }

    let mut buf = Vec::with_capacity(1 + body.len());
    buf.put_u8((body.len() - 1) as u8);
    buf.put_slice(body);
    Ok(buf)
}

fn map_read_error(err: io::Error) -> ProtocolError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        ProtocolError::TransportClosed
    } else {
        ProtocolError::Io(err)
    }
}

/// A blocking frame reader/writer over any duplex byte stream.
///
/// Each call moves exactly one frame. The link keeps no read-ahead buffer,
/// so bytes that follow a frame stay in the stream for the next call.
#[derive(Debug)]
pub struct FrameLink<T> {
    stream: T,
}

impl<T: Read + Write> FrameLink<T> {
    /// Wrap a stream.
    pub fn new(stream: T) -> Self {
        FrameLink { stream }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> T {
        self.stream
    }

    /// Block until a full frame body has arrived: the length byte `L`, then
    /// `L + 1` further bytes.
    fn read_body(&mut self) -> ProtocolResult<Vec<u8>> {
        let mut len = [0u8; 1];
        self.stream.read_exact(&mut len).map_err(map_read_error)?;

        let mut body = vec![0u8; len[0] as usize + 1];
        self.stream.read_exact(&mut body).map_err(map_read_error)?;
        Ok(body)
    }

    /// Receive the next frame.
    pub fn recv_frame(&mut self) -> ProtocolResult<Frame> {
        let mut body = self.read_body()?;
        let payload = body.split_off(1);
        let frame = Frame::new(body[0], payload);
        trace!(
            "rx {} [{} bytes]",
            describe_opcode(frame.opcode),
            frame.payload.len()
        );
        Ok(frame)
    }

    /// Receive the next frame as a raw text body (`L + 1` bytes).
    pub fn recv_raw(&mut self) -> ProtocolResult<Vec<u8>> {
        let body = self.read_body()?;
        trace!("rx raw [{} bytes]", body.len());
        Ok(body)
    }

    /// Send one frame as a single write.
    pub fn send_frame(&mut self, opcode: impl Into<u8>, payload: &[u8]) -> ProtocolResult<()> {
        let opcode = opcode.into();
        let buf = encode_frame(opcode, payload)?;
        self.write_all(&buf)?;
        trace!("tx {} [{} bytes]", describe_opcode(opcode), payload.len());
        Ok(())
    }

    /// Write already encoded frames as a single write.
    pub(crate) fn write_all(&mut self, buf: &[u8]) -> ProtocolResult<()> {
        self.stream.write_all(buf)?;
        self.stream.flush()?;
        Ok(())
    }
}
