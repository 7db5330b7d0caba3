//! eeprommer-host: serve files to an eeprommer3 programmer over serial.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use eeprommer_host::logging::init_logging;
use eeprommer_host::{
    list_ports, open_serial, run, DialogResolver, Dispatcher, FixedResolver, FrameLink, FsStorage,
    HostConfig, HostResult, InterruptibleStream, PathResolver, Shutdown, TracingReporter,
};

#[derive(Parser, Debug)]
#[command(name = "eeprommer-host")]
#[command(about = "Serve host files to an eeprommer3 programmer over a serial link")]
#[command(version)]
struct Cli {
    /// Serial port the programmer is attached to
    #[arg(short, long, required_unless_present = "list_ports")]
    port: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Baud rate (overrides the config file)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Answer every file prompt with this path instead of asking
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Hex dump read and written data in the log
    #[arg(long)]
    hexdump: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match try_main(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: Cli) -> HostResult<ExitCode> {
    if cli.list_ports {
        let ports = list_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        }
        for port in ports {
            println!("{}\t{}", port.name, port.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    config.hexdump |= cli.hexdump;
    config.validate()?;

    let Some(port_name) = cli.port.as_deref() else {
        error!("--port is required");
        return Ok(ExitCode::FAILURE);
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed)) {
            warn!("could not install Ctrl-C handler: {}", e);
        }
    }

    let port = open_serial(port_name, &config.serial)?;
    let mut link = FrameLink::new(InterruptibleStream::new(port, shutdown.clone()));
    let reporter = TracingReporter::new(config.hexdump);

    let reason = match cli.file {
        Some(path) => serve(&mut link, FixedResolver::new(path), reporter, &shutdown)?,
        None => serve(
            &mut link,
            DialogResolver::new(config.start_dir.clone()).with_shutdown(shutdown.clone()),
            reporter,
            &shutdown,
        )?,
    };

    match reason {
        Shutdown::Interrupted => {
            println!("Thank you for using eeprommer3.");
            Ok(ExitCode::SUCCESS)
        }
        Shutdown::TransportClosed => {
            error!("serial link to {} closed", port_name);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn serve<T, R>(
    link: &mut FrameLink<T>,
    resolver: R,
    reporter: TracingReporter,
    shutdown: &AtomicBool,
) -> HostResult<Shutdown>
where
    T: std::io::Read + std::io::Write,
    R: PathResolver,
{
    info!("waiting for the programmer (Ctrl-C to quit)");
    let mut dispatcher = Dispatcher::new(FsStorage, resolver, reporter);
    run(link, &mut dispatcher, shutdown)
}
