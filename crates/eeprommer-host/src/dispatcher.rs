//! Command dispatcher.
//!
//! The programmer's file session is a three-phase state machine. Each
//! incoming frame is routed by `(phase, opcode)` to one handler; frames with
//! no route are rejected without touching the session.
//!
//! | Phase               | Accepted                                    | Next phase          |
//! |---------------------|---------------------------------------------|---------------------|
//! | `Idle`              | PING, FILEOPEN                              | `Idle`, `AwaitingConfigure` |
//! | `AwaitingConfigure` | FILECONF                                    | `Configured`        |
//! | `Configured`        | FILESIZE, FILESEEK, FILEREAD, FILEWRIT, FILEFLUS, FILECLOS | `Configured`, FILECLOS: `Idle` |
//!
//! A handler that fails leaves the phase where it was. Nothing is ever sent
//! back to report a failure; the protocol has no error opcode.

use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use eeprommer_protocol::{
    read_response_frames, AccessMode, Frame, FrameLink, Opcode, MAX_PAYLOAD,
};
use tracing::debug;

use crate::error::{HostError, HostResult};
use crate::report::{Reporter, SessionEvent};
use crate::resolver::PathResolver;
use crate::session::FileSession;
use crate::storage::{read_up_to, Storage, StorageHandle};

// ============================================================================
// Phases and routing
// ============================================================================

/// Where the file session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No file session.
    Idle,
    /// A path has been chosen, the storage is not open yet.
    AwaitingConfigure,
    /// The storage handle is open.
    Configured,
}

impl Phase {
    /// All phases.
    pub const ALL: [Phase; 3] = [Phase::Idle, Phase::AwaitingConfigure, Phase::Configured];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::AwaitingConfigure => write!(f, "AwaitingConfigure"),
            Phase::Configured => write!(f, "Configured"),
        }
    }
}

/// Handler selected for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Answer a PING.
    Ping,
    /// Start a session (FILEOPEN).
    Open,
    /// Open the storage (FILECONF).
    Configure,
    /// Report the size (FILESIZE).
    Size,
    /// Move the cursor (FILESEEK).
    Seek,
    /// Read bytes (FILEREAD).
    Read,
    /// Write bytes (FILEWRIT).
    Write,
    /// Make writes durable (FILEFLUS).
    Flush,
    /// End the session (FILECLOS).
    Close,
}

/// Look up the handler for `opcode` in `phase`.
pub fn route(phase: Phase, opcode: u8) -> Option<Action> {
    let action = match (phase, Opcode::from_code(opcode)?) {
        (Phase::Idle, Opcode::Ping) => Action::Ping,
        (Phase::Idle, Opcode::FileOpen) => Action::Open,
        (Phase::AwaitingConfigure, Opcode::FileConf) => Action::Configure,
        (Phase::Configured, Opcode::FileSize) => Action::Size,
        (Phase::Configured, Opcode::FileSeek) => Action::Seek,
        (Phase::Configured, Opcode::FileRead) => Action::Read,
        (Phase::Configured, Opcode::FileWrite) => Action::Write,
        (Phase::Configured, Opcode::FileFlush) => Action::Flush,
        (Phase::Configured, Opcode::FileClose) => Action::Close,
        _ => return None,
    };
    Some(action)
}

/// Outcome of dispatching one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The handler ran and the session moved to `phase`.
    Handled {
        /// Handler that ran.
        action: Action,
        /// Phase after the handler.
        phase: Phase,
    },
    /// No handler for this opcode in this phase; nothing changed.
    Rejected {
        /// Offending opcode byte.
        opcode: u8,
        /// Current phase.
        phase: Phase,
    },
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Owns the session state and runs command handlers.
pub struct Dispatcher<S, R, P> {
    phase: Phase,
    session: Option<FileSession>,
    storage: S,
    resolver: R,
    reporter: P,
}

fn open_handle(session: &mut Option<FileSession>) -> HostResult<&mut dyn StorageHandle> {
    session.as_mut().ok_or(HostError::NoOpenFile)?.handle()
}

impl<S: Storage, R: PathResolver, P: Reporter> Dispatcher<S, R, P> {
    /// Create a dispatcher in the `Idle` phase.
    pub fn new(storage: S, resolver: R, reporter: P) -> Self {
        Dispatcher {
            phase: Phase::Idle,
            session: None,
            storage,
            resolver,
            reporter,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The current file session, if any.
    pub fn session(&self) -> Option<&FileSession> {
        self.session.as_ref()
    }

    /// The path resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The reporter.
    pub fn reporter(&self) -> &P {
        &self.reporter
    }

    /// Hand an event to the reporter.
    pub fn report(&mut self, event: SessionEvent) {
        self.reporter.report(&event);
    }

    /// Route `frame` and run its handler.
    ///
    /// Handlers that need a second frame (FILEOPEN's prompt, FILEWRIT's data)
    /// read it from `link` before returning. A rejected frame is reported and
    /// returned as [`Dispatch::Rejected`]. A failing handler is reported and
    /// its error returned; the phase stays unchanged either way.
    pub fn dispatch<T: Read + Write>(
        &mut self,
        link: &mut FrameLink<T>,
        frame: &Frame,
    ) -> HostResult<Dispatch> {
        let phase = self.phase;

        let Some(action) = route(phase, frame.opcode) else {
            self.report(SessionEvent::InvalidAction {
                opcode: frame.opcode,
                phase,
            });
            return Ok(Dispatch::Rejected {
                opcode: frame.opcode,
                phase,
            });
        };

        match self.execute(action, link, frame) {
            Ok(next) => {
                if next != phase {
                    debug!("phase {} -> {}", phase, next);
                }
                self.phase = next;
                Ok(Dispatch::Handled {
                    action,
                    phase: next,
                })
            }
            Err(e) => {
                if !e.is_fatal() {
                    self.report(SessionEvent::CommandFailed {
                        opcode: frame.opcode,
                        phase,
                        error: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }

    fn execute<T: Read + Write>(
        &mut self,
        action: Action,
        link: &mut FrameLink<T>,
        frame: &Frame,
    ) -> HostResult<Phase> {
        match action {
            Action::Ping => self.handle_ping(link),
            Action::Open => self.handle_open(link, frame),
            Action::Configure => self.handle_configure(frame),
            Action::Size => self.handle_size(link),
            Action::Seek => self.handle_seek(frame),
            Action::Read => self.handle_read(link, frame),
            Action::Write => self.handle_write(link),
            Action::Flush => self.handle_flush(),
            Action::Close => self.handle_close(),
        }
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    fn handle_ping<T: Read + Write>(&mut self, link: &mut FrameLink<T>) -> HostResult<Phase> {
        link.send_frame(Opcode::Ping, &[])?;
        self.report(SessionEvent::Ping);
        Ok(Phase::Idle)
    }

    fn handle_open<T: Read + Write>(
        &mut self,
        link: &mut FrameLink<T>,
        frame: &Frame,
    ) -> HostResult<Phase> {
        let must_exist = frame.arg_u8()? != 0;

        // The prompt always follows FILEOPEN as a raw text frame.
        let prompt = String::from_utf8_lossy(&link.recv_raw()?).into_owned();
        let path = self.resolver.resolve(&prompt, must_exist)?;

        self.session = Some(FileSession::new(path.clone(), must_exist));
        link.send_frame(Opcode::FileOpen, &[])?;

        self.report(SessionEvent::FileOpened {
            prompt,
            path,
            must_exist,
        });
        Ok(Phase::AwaitingConfigure)
    }

    fn handle_configure(&mut self, frame: &Frame) -> HostResult<Phase> {
        let access = AccessMode::from_byte(frame.arg_u8()?);
        let session = self.session.as_mut().ok_or(HostError::NoOpenFile)?;
        session.configure(&mut self.storage, access)?;

        self.report(SessionEvent::Configured { access });
        Ok(Phase::Configured)
    }

    fn handle_size<T: Read + Write>(&mut self, link: &mut FrameLink<T>) -> HostResult<Phase> {
        let handle = open_handle(&mut self.session)?;
        let actual = handle.size().map_err(HostError::storage("size"))?;

        // Sizes past 16 bits cannot be expressed; saturate and let the
        // reporter flag it.
        let reported = u16::try_from(actual).unwrap_or(u16::MAX);
        link.send_frame(Opcode::FileSize, &reported.to_le_bytes())?;

        self.report(SessionEvent::Size { actual, reported });
        Ok(Phase::Configured)
    }

    fn handle_seek(&mut self, frame: &Frame) -> HostResult<Phase> {
        let position = frame.arg_u16_le()?;
        let handle = open_handle(&mut self.session)?;
        handle
            .seek(SeekFrom::Start(u64::from(position)))
            .map_err(HostError::storage("seek"))?;

        self.report(SessionEvent::Seek { position });
        Ok(Phase::Configured)
    }

    fn handle_read<T: Read + Write>(
        &mut self,
        link: &mut FrameLink<T>,
        frame: &Frame,
    ) -> HostResult<Phase> {
        let requested = usize::from(frame.arg_u8()?) + 1;
        let handle = open_handle(&mut self.session)?;
        let offset = handle
            .stream_position()
            .map_err(HostError::storage("seek"))?;

        let mut data = vec![0u8; requested];
        let got = read_up_to(handle, &mut data).map_err(HostError::storage("read"))?;
        data.truncate(got);

        for i in 0..read_response_frames(requested) {
            let start = (i * MAX_PAYLOAD).min(data.len());
            let end = (start + MAX_PAYLOAD).min(data.len());
            link.send_frame(Opcode::FileRead, &data[start..end])?;
        }

        self.report(SessionEvent::Read {
            offset,
            requested,
            data,
        });
        Ok(Phase::Configured)
    }

    fn handle_write<T: Read + Write>(&mut self, link: &mut FrameLink<T>) -> HostResult<Phase> {
        // The bytes to write arrive in the next frame; its length is the
        // write length.
        let data_frame = link.recv_frame()?;
        if data_frame.opcode != Opcode::FileWrite.code() {
            debug!(
                "FILEWRIT data frame carries opcode 0x{:02x}, using payload anyway",
                data_frame.opcode
            );
        }

        let handle = open_handle(&mut self.session)?;
        let offset = handle
            .stream_position()
            .map_err(HostError::storage("seek"))?;
        handle
            .write_all(&data_frame.payload)
            .map_err(HostError::storage("write"))?;

        self.report(SessionEvent::Wrote {
            offset,
            data: data_frame.payload,
        });
        Ok(Phase::Configured)
    }

    fn handle_flush(&mut self) -> HostResult<Phase> {
        let handle = open_handle(&mut self.session)?;
        handle.sync().map_err(HostError::storage("flush"))?;

        self.report(SessionEvent::Flushed);
        Ok(Phase::Configured)
    }

    fn handle_close(&mut self) -> HostResult<Phase> {
        if let Some(mut session) = self.session.take() {
            session.release();
            self.report(SessionEvent::Closed {
                path: session.path().to_path_buf(),
            });
        }
        Ok(Phase::Idle)
    }
}
