//! Protocol constants
//!
//! Opcodes, size limits and access-mode bits used on the programmer's serial
//! link. Every frame carries exactly one opcode byte.

use std::fmt;

// ============================================================================
// Opcodes
// ============================================================================

/// Liveness check; the responder echoes an empty PING.
pub const PKT_PING: u8 = 0x00;
/// Begin a file session (1 byte payload: must-exist flag).
pub const PKT_FILEOPEN: u8 = 0x10;
/// Open the storage for the session (1 byte payload: access mode).
pub const PKT_FILECONF: u8 = 0x11;
/// Query the open file's size (reply: 2 bytes little-endian).
pub const PKT_FILESIZE: u8 = 0x12;
/// Move the cursor to an absolute offset (2 bytes little-endian).
pub const PKT_FILESEEK: u8 = 0x13;
/// Read `n + 1` bytes (1 byte payload: `n`).
pub const PKT_FILEREAD: u8 = 0x14;
/// Write the payload of the following data frame.
pub const PKT_FILEWRIT: u8 = 0x15;
/// Make buffered writes durable.
pub const PKT_FILEFLUS: u8 = 0x16;
/// End the file session.
pub const PKT_FILECLOS: u8 = 0x17;

// ============================================================================
// Limits
// ============================================================================

/// Largest payload a single frame can carry (the length byte's range).
pub const MAX_PAYLOAD: usize = 255;
/// Frame overhead: one length byte and one opcode byte.
pub const FRAME_OVERHEAD: usize = 2;
/// Largest raw text frame body (prompt text sent as one frame).
pub const MAX_RAW_BODY: usize = MAX_PAYLOAD + 1;
/// Largest number of bytes a single FILEREAD request may ask for.
pub const MAX_READ: usize = 256;

/// Number of FILEREAD frames that answer a request for `count` bytes.
///
/// Reads of up to [`MAX_PAYLOAD`] bytes fit one frame; a 256-byte read is
/// split across two. The count is fixed by the request, not by how many bytes
/// the file actually had left.
pub fn read_response_frames(count: usize) -> usize {
    count.div_ceil(MAX_PAYLOAD).max(1)
}

// ============================================================================
// Opcode enumeration
// ============================================================================

/// The known opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `PING` (0x00).
    Ping,
    /// `FILEOPEN` (0x10).
    FileOpen,
    /// `FILECONF` (0x11).
    FileConf,
    /// `FILESIZE` (0x12).
    FileSize,
    /// `FILESEEK` (0x13).
    FileSeek,
    /// `FILEREAD` (0x14).
    FileRead,
    /// `FILEWRIT` (0x15).
    FileWrite,
    /// `FILEFLUS` (0x16).
    FileFlush,
    /// `FILECLOS` (0x17).
    FileClose,
}

impl Opcode {
    /// All opcodes in wire order.
    pub const ALL: [Opcode; 9] = [
        Opcode::Ping,
        Opcode::FileOpen,
        Opcode::FileConf,
        Opcode::FileSize,
        Opcode::FileSeek,
        Opcode::FileRead,
        Opcode::FileWrite,
        Opcode::FileFlush,
        Opcode::FileClose,
    ];

    /// Get the wire byte for this opcode.
    pub fn code(self) -> u8 {
        match self {
            Opcode::Ping => PKT_PING,
            Opcode::FileOpen => PKT_FILEOPEN,
            Opcode::FileConf => PKT_FILECONF,
            Opcode::FileSize => PKT_FILESIZE,
            Opcode::FileSeek => PKT_FILESEEK,
            Opcode::FileRead => PKT_FILEREAD,
            Opcode::FileWrite => PKT_FILEWRIT,
            Opcode::FileFlush => PKT_FILEFLUS,
            Opcode::FileClose => PKT_FILECLOS,
        }
    }

    /// Look up an opcode from its wire byte.
    pub fn from_code(code: u8) -> Option<Opcode> {
        match code {
            PKT_PING => Some(Opcode::Ping),
            PKT_FILEOPEN => Some(Opcode::FileOpen),
            PKT_FILECONF => Some(Opcode::FileConf),
            PKT_FILESIZE => Some(Opcode::FileSize),
            PKT_FILESEEK => Some(Opcode::FileSeek),
            PKT_FILEREAD => Some(Opcode::FileRead),
            PKT_FILEWRIT => Some(Opcode::FileWrite),
            PKT_FILEFLUS => Some(Opcode::FileFlush),
            PKT_FILECLOS => Some(Opcode::FileClose),
            _ => None,
        }
    }

    /// The mnemonic used in logs and device documentation.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Ping => "PING",
            Opcode::FileOpen => "FILEOPEN",
            Opcode::FileConf => "FILECONF",
            Opcode::FileSize => "FILESIZE",
            Opcode::FileSeek => "FILESEEK",
            Opcode::FileRead => "FILEREAD",
            Opcode::FileWrite => "FILEWRIT",
            Opcode::FileFlush => "FILEFLUS",
            Opcode::FileClose => "FILECLOS",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op.code()
    }
}

/// Render a raw opcode byte, using the mnemonic when it is known.
pub fn describe_opcode(code: u8) -> String {
    match Opcode::from_code(code) {
        Some(op) => format!("{} (0x{:02X})", op, code),
        None => format!("unknown (0x{:02X})", code),
    }
}
