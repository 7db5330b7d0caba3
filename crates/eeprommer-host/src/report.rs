//! Session event reporting.
//!
//! The dispatcher never prints. Everything the operator might want to see is
//! handed to a [`Reporter`] as a [`SessionEvent`]; the binary logs them via
//! `tracing`, tests collect them in an [`EventLog`].

use std::fmt;
use std::path::PathBuf;

use eeprommer_protocol::{describe_opcode, AccessMode, Frame};
use tracing::{debug, info, trace, warn};

use crate::dispatcher::Phase;
use crate::driver::Shutdown;
use crate::hexdump::{hex_line, hexdump};

// ============================================================================
// Events
// ============================================================================

/// Something that happened while serving the programmer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The driver is waiting for the first frame.
    Ready,
    /// A command frame arrived.
    FrameReceived(Frame),
    /// PING answered.
    Ping,
    /// FILEOPEN accepted and a path chosen.
    FileOpened {
        /// Prompt shown to the operator.
        prompt: String,
        /// Path the operator chose.
        path: PathBuf,
        /// Whether the file had to exist.
        must_exist: bool,
    },
    /// FILECONF opened the storage handle.
    Configured {
        /// Access mode requested by the programmer.
        access: AccessMode,
    },
    /// FILESIZE answered.
    Size {
        /// True size of the file.
        actual: u64,
        /// Size sent on the wire.
        reported: u16,
    },
    /// FILESEEK moved the cursor.
    Seek {
        /// New absolute position.
        position: u16,
    },
    /// FILEREAD answered.
    Read {
        /// Cursor position before the read.
        offset: u64,
        /// Bytes asked for.
        requested: usize,
        /// Bytes actually read.
        data: Vec<u8>,
    },
    /// FILEWRIT stored data.
    Wrote {
        /// Cursor position before the write.
        offset: u64,
        /// Bytes written.
        data: Vec<u8>,
    },
    /// FILEFLUS completed.
    Flushed,
    /// FILECLOS released the storage handle.
    Closed {
        /// Path of the closed file.
        path: PathBuf,
    },
    /// A command arrived that has no handler in the current phase.
    InvalidAction {
        /// Offending opcode byte.
        opcode: u8,
        /// Phase at the time.
        phase: Phase,
    },
    /// A command was accepted but failed.
    CommandFailed {
        /// Opcode of the failed command.
        opcode: u8,
        /// Phase the session stays in.
        phase: Phase,
        /// Error description.
        error: String,
    },
    /// The driver stopped.
    Stopped(Shutdown),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Ready => write!(f, "Ready."),
            SessionEvent::FrameReceived(frame) => write!(
                f,
                "rx {} [{}]",
                describe_opcode(frame.opcode),
                hex_line(&frame.payload)
            ),
            SessionEvent::Ping => write!(f, "Ping!"),
            SessionEvent::FileOpened {
                prompt,
                path,
                must_exist,
            } => write!(
                f,
                "Opening file `{}' for \"{}\", must_exist = {}",
                path.display(),
                sanitize_for_display(prompt),
                must_exist
            ),
            SessionEvent::Configured { access } => {
                write!(f, "File is accessed with flags {}", access)
            }
            SessionEvent::Size { actual, reported } => {
                if *actual > u64::from(u16::MAX) {
                    write!(
                        f,
                        "File size {} does not fit 16 bits, reporting 0x{:04x}",
                        actual, reported
                    )
                } else {
                    write!(f, "Querying file size: {}", actual)
                }
            }
            SessionEvent::Seek { position } => write!(f, "Seeking to position 0x{:04x}", position),
            SessionEvent::Read {
                offset,
                requested,
                data,
            } => write!(
                f,
                "Read {}/{} bytes at 0x{:04x}",
                data.len(),
                requested,
                offset
            ),
            SessionEvent::Wrote { offset, data } => {
                write!(f, "Wrote {} bytes at 0x{:04x}", data.len(), offset)
            }
            SessionEvent::Flushed => write!(f, "Flushing file"),
            SessionEvent::Closed { path } => write!(f, "Closing file `{}'", path.display()),
            SessionEvent::InvalidAction { opcode, phase } => write!(
                f,
                "Action {} is invalid in current context ({})",
                describe_opcode(*opcode),
                phase
            ),
            SessionEvent::CommandFailed {
                opcode,
                phase,
                error,
            } => write!(
                f,
                "{} failed in {}: {}",
                describe_opcode(*opcode),
                phase,
                error
            ),
            SessionEvent::Stopped(reason) => write!(f, "Stopped: {}", reason),
        }
    }
}

// ============================================================================
// Reporters
// ============================================================================

/// Receives session events.
pub trait Reporter {
    /// Handle one event.
    fn report(&mut self, event: &SessionEvent);
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingReporter {
    hexdump: bool,
}

impl TracingReporter {
    /// Create a reporter; with `hexdump` set, read and write payloads are
    /// dumped at debug level.
    pub fn new(hexdump: bool) -> Self {
        TracingReporter { hexdump }
    }

    fn dump(&self, data: &[u8], offset: u64) {
        if self.hexdump && !data.is_empty() {
            debug!("\n{}", hexdump(data, offset as usize));
        }
    }
}

impl Reporter for TracingReporter {
    fn report(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::FrameReceived(_) => trace!("{}", event),
            SessionEvent::Ready
            | SessionEvent::Ping
            | SessionEvent::FileOpened { .. }
            | SessionEvent::Configured { .. }
            | SessionEvent::Closed { .. }
            | SessionEvent::Stopped(_) => info!("{}", event),
            SessionEvent::Size { actual, .. } if *actual > u64::from(u16::MAX) => {
                warn!("{}", event)
            }
            SessionEvent::Read { offset, data, .. } | SessionEvent::Wrote { offset, data } => {
                debug!("{}", event);
                self.dump(data, *offset);
            }
            SessionEvent::Size { .. } | SessionEvent::Seek { .. } | SessionEvent::Flushed => {
                debug!("{}", event)
            }
            SessionEvent::InvalidAction { .. } | SessionEvent::CommandFailed { .. } => {
                warn!("{}", event)
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<SessionEvent>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far.
    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Remove and return all events so far.
    pub fn take(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of rejected commands.
    pub fn invalid_actions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SessionEvent::InvalidAction { .. }))
            .count()
    }

    /// Number of failed commands.
    pub fn failures(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SessionEvent::CommandFailed { .. }))
            .count()
    }
}

impl Reporter for EventLog {
    fn report(&mut self, event: &SessionEvent) {
        self.events.push(event.clone());
    }
}

/// Sanitize a string for display, replacing non-printable characters with escape sequences.
/// Prompts come straight off the serial line and may contain anything.
pub fn sanitize_for_display(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\t' => result.push_str("\\t"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\0' => result.push_str("\\0"),
            c if c.is_ascii_graphic() || c == ' ' => result.push(c),
            c if c.is_ascii_control() => result.push_str(&format!("\\x{:02x}", c as u32)),
            '\u{FFFD}' => result.push_str("\\u{FFFD}"),
            c if c.is_alphanumeric() || c.is_whitespace() => result.push(c),
            c => result.push_str(&format!("\\u{{{:04x}}}", c as u32)),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_for_display() {
        assert_eq!(sanitize_for_display("Load file"), "Load file");
        assert_eq!(sanitize_for_display("a\tb\r\n"), "a\\tb\\r\\n");
        assert_eq!(sanitize_for_display("\x07bell"), "\\x07bell");
        assert_eq!(sanitize_for_display("\u{FFFD}"), "\\u{FFFD}");
    }

    #[test]
    fn test_event_display() {
        let event = SessionEvent::InvalidAction {
            opcode: 0x12,
            phase: Phase::Idle,
        };
        assert_eq!(
            event.to_string(),
            "Action FILESIZE (0x12) is invalid in current context (Idle)"
        );

        let event = SessionEvent::Size {
            actual: 70_000,
            reported: 0xFFFF,
        };
        assert!(event.to_string().contains("does not fit 16 bits"));
    }

    #[test]
    fn test_event_log_counts() {
        let mut log = EventLog::new();
        log.report(&SessionEvent::Ready);
        log.report(&SessionEvent::InvalidAction {
            opcode: 0x17,
            phase: Phase::Idle,
        });
        log.report(&SessionEvent::CommandFailed {
            opcode: 0x11,
            phase: Phase::AwaitingConfigure,
            error: "storage open failed".to_string(),
        });
        assert_eq!(log.events().len(), 3);
        assert_eq!(log.invalid_actions(), 1);
        assert_eq!(log.failures(), 1);
        assert_eq!(log.take().len(), 3);
        assert!(log.events().is_empty());
    }
}
