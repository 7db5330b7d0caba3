//! Host-side responder for the eeprommer3 serial file protocol.
//!
//! The programmer asks the host to open, read and write files on its behalf.
//! [`Dispatcher`] holds the single file session and answers each frame;
//! [`run`] drives it over any byte stream, normally a serial port opened with
//! [`open_serial`].
//!
//! ```rust,ignore
//! use eeprommer_host::*;
//!
//! let port = open_serial("/dev/ttyUSB0", &SerialSettings::default())?;
//! let mut link = FrameLink::new(InterruptibleStream::new(port, shutdown.clone()));
//! let mut dispatcher = Dispatcher::new(
//!     FsStorage,
//!     DialogResolver::new(None),
//!     TracingReporter::new(false),
//! );
//! run(&mut link, &mut dispatcher, &shutdown)?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod hexdump;
pub mod logging;
pub mod report;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod transport;

pub use config::{HostConfig, SerialSettings};
pub use dispatcher::{route, Action, Dispatch, Dispatcher, Phase};
pub use driver::{run, Shutdown};
pub use eeprommer_protocol::FrameLink;
pub use error::{HostError, HostResult};
pub use report::{EventLog, Reporter, SessionEvent, TracingReporter};
pub use resolver::{DialogResolver, FixedResolver, PathResolver};
pub use session::FileSession;
pub use storage::{FsStorage, Storage, StorageHandle};
pub use transport::{list_ports, loopback_pair, open_serial, InterruptibleStream, LoopbackEnd};
