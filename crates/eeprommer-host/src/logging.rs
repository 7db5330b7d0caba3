//! Logging setup for the host binary.
//!
//! Human-readable output to stderr. `RUST_LOG` wins when set; otherwise the
//! level follows the `-v` count. Records from the protocol crate's `log`
//! macros are forwarded into the same subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter directive for a `-v` count.
pub fn verbosity_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Call once, early in `main()`.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_directive(verbosity)));

    let stderr_layer = fmt::layer()
        .with_target(verbosity > 1)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    // try_init: a second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
}
