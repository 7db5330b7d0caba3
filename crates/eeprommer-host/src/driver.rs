//! Blocking serve loop.
//!
//! Reads one frame at a time, hands it to the [`Dispatcher`] and keeps going
//! until the link closes or shutdown is requested. Command failures are
//! reported by the dispatcher and do not stop the loop.

use std::fmt;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use eeprommer_protocol::{FrameLink, ProtocolError};
use tracing::error;

use crate::dispatcher::Dispatcher;
use crate::error::{HostError, HostResult};
use crate::report::{Reporter, SessionEvent};
use crate::resolver::PathResolver;
use crate::storage::Storage;

/// Why the serve loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The peer went away.
    TransportClosed,
    /// The operator asked to stop.
    Interrupted,
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shutdown::TransportClosed => write!(f, "transport closed"),
            Shutdown::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Serve frames from `link` until it closes or `shutdown` is raised.
///
/// Returns the reason the loop stopped. Transport failures other than a clean
/// close are returned as errors. An open file session is left as is; it is
/// released when the dispatcher is dropped.
pub fn run<T, S, R, P>(
    link: &mut FrameLink<T>,
    dispatcher: &mut Dispatcher<S, R, P>,
    shutdown: &AtomicBool,
) -> HostResult<Shutdown>
where
    T: Read + Write,
    S: Storage,
    R: PathResolver,
    P: Reporter,
{
    dispatcher.report(SessionEvent::Ready);

    let reason = loop {
        if shutdown.load(Ordering::Relaxed) {
            break Shutdown::Interrupted;
        }

        let frame = match link.recv_frame() {
            Ok(frame) => frame,
            Err(e) => match stop_reason(HostError::Protocol(e), shutdown) {
                Ok(reason) => break reason,
                Err(e) => return Err(e),
            },
        };

        dispatcher.report(SessionEvent::FrameReceived(frame.clone()));

        match dispatcher.dispatch(link, &frame) {
            Ok(_) => {}
            Err(e) if e.is_fatal() => match stop_reason(e, shutdown) {
                Ok(reason) => break reason,
                Err(e) => return Err(e),
            },
            // Already reported; the next frame is served normally.
            Err(_) => {}
        }
    };

    dispatcher.report(SessionEvent::Stopped(reason));
    Ok(reason)
}

/// Decide whether a fatal error is an orderly stop.
fn stop_reason(err: HostError, shutdown: &AtomicBool) -> HostResult<Shutdown> {
    if shutdown.load(Ordering::Relaxed) {
        return Ok(Shutdown::Interrupted);
    }
    match err {
        HostError::Protocol(ProtocolError::TransportClosed) => Ok(Shutdown::TransportClosed),
        err => {
            error!("transport failure: {}", err);
            Err(err)
        }
    }
}
