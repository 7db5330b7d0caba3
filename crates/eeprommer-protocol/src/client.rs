//! Requester side of the file protocol.
//!
//! The programmer firmware drives a host-side file through these commands
//! when the user picks "file on serial". [`FileClient`] speaks that half of
//! the conversation, which is what simulators and tests use to exercise a
//! responder.
//!
//! Only PING, FILEOPEN, FILESIZE and FILEREAD are answered by the responder;
//! the other commands are fire-and-forget.

use std::io::{Read, Write};

use log::{debug, trace};

use crate::access::AccessMode;
use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::{encode_frame, encode_raw, Frame, FrameLink};

/// Drives a remote file session over a [`FrameLink`].
pub struct FileClient<T> {
    link: FrameLink<T>,
}

impl<T: Read + Write> FileClient<T> {
    /// Create a client over a byte stream.
    pub fn new(stream: T) -> Self {
        FileClient {
            link: FrameLink::new(stream),
        }
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> T {
        self.link.into_inner()
    }

    fn expect(&mut self, opcode: Opcode) -> ProtocolResult<Frame> {
        let frame = self.link.recv_frame()?;
        if frame.opcode != opcode.code() {
            return Err(ProtocolError::UnexpectedResponse {
                expected: opcode.code(),
                actual: frame.opcode,
            });
        }
        Ok(frame)
    }

    /// Check that the responder is alive.
    pub fn ping(&mut self) -> ProtocolResult<()> {
        self.link.send_frame(Opcode::Ping, &[])?;
        self.expect(Opcode::Ping)?;
        Ok(())
    }

    /// Ask the responder to choose a file, showing `prompt` to its operator.
    ///
    /// Blocks until the operator has picked a path.
    ///
    /// The header and prompt go out together; a prompt that cannot be framed
    /// fails before anything is sent.
    pub fn open(&mut self, prompt: &str, must_exist: bool) -> ProtocolResult<()> {
        let mut buf = encode_frame(Opcode::FileOpen.code(), &[u8::from(must_exist)])?;
        buf.extend_from_slice(&encode_raw(prompt.as_bytes())?);
        self.link.write_all(&buf)?;
        trace!("tx FILEOPEN with prompt [{} bytes]", prompt.len());
        self.expect(Opcode::FileOpen)?;
        debug!("file opened on responder (must_exist={})", must_exist);
        Ok(())
    }

    /// Open the chosen file's storage with `access`. Not acknowledged.
    pub fn configure(&mut self, access: AccessMode) -> ProtocolResult<()> {
        self.link
            .send_frame(Opcode::FileConf, &[access.to_byte()])
    }

    /// Current size of the open file.
    pub fn size(&mut self) -> ProtocolResult<u16> {
        self.link.send_frame(Opcode::FileSize, &[])?;
        let reply = self.expect(Opcode::FileSize)?;
        reply.arg_u16_le()
    }

    /// Move the cursor to an absolute offset. Not acknowledged.
    pub fn seek(&mut self, position: u16) -> ProtocolResult<()> {
        self.link
            .send_frame(Opcode::FileSeek, &position.to_le_bytes())
    }

    /// Read up to `count` (1-256) bytes from the cursor.
    ///
    /// Returns fewer bytes when the file ends first.
    pub fn read(&mut self, count: usize) -> ProtocolResult<Vec<u8>> {
        if count == 0 || count > MAX_READ {
            return Err(ProtocolError::InvalidReadCount(count));
        }

        self.link
            .send_frame(Opcode::FileRead, &[(count - 1) as u8])?;

        let mut data = Vec::with_capacity(count);
        for _ in 0..read_response_frames(count) {
            let reply = self.expect(Opcode::FileRead)?;
            data.extend_from_slice(&reply.payload);
        }
        Ok(data)
    }

    /// Write `data` (at most 255 bytes) at the cursor. Not acknowledged.
    pub fn write(&mut self, data: &[u8]) -> ProtocolResult<()> {
        if data.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                max: MAX_PAYLOAD,
                actual: data.len(),
            });
        }
        self.link.send_frame(Opcode::FileWrite, &[])?;
        self.link.send_frame(Opcode::FileWrite, data)
    }

    /// Ask the responder to make written data durable. Not acknowledged.
    pub fn flush(&mut self) -> ProtocolResult<()> {
        self.link.send_frame(Opcode::FileFlush, &[])
    }

    /// End the session. Not acknowledged.
    pub fn close(&mut self) -> ProtocolResult<()> {
        self.link.send_frame(Opcode::FileClose, &[])
    }
}
