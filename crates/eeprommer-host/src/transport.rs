//! Byte transports the host can serve over.
//!
//! The programmer talks over a USB serial line. Tests and in-process
//! simulations use a loopback pair instead.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use serialport::{SerialPort, SerialPortType};
use tracing::info;

use crate::config::SerialSettings;
use crate::error::HostResult;

// ============================================================================
// Serial
// ============================================================================

/// Open `port_name` with the given line settings.
pub fn open_serial(port_name: &str, settings: &SerialSettings) -> HostResult<Box<dyn SerialPort>> {
    let port = serialport::new(port_name, settings.baud_rate)
        .data_bits(settings.data_bits()?)
        .parity(settings.parity())
        .stop_bits(settings.stop_bits()?)
        .flow_control(settings.flow_control())
        .timeout(settings.poll_interval())
        .open()?;
    info!("opened {} @ {} baud", port_name, settings.baud_rate);
    Ok(port)
}

/// A stream whose reads wait through timeouts until shutdown is requested.
///
/// The wrapped stream is expected to time out periodically; each timeout is a
/// chance to notice the shutdown flag. Once the flag is raised the pending
/// read fails.
pub struct InterruptibleStream<S> {
    inner: S,
    shutdown: Arc<AtomicBool>,
}

impl<S> InterruptibleStream<S> {
    /// Wrap `inner`; reads give up once `shutdown` is raised.
    pub fn new(inner: S, shutdown: Arc<AtomicBool>) -> Self {
        InterruptibleStream { inner, shutdown }
    }
}

impl<S: Read> Read for InterruptibleStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    // Not ErrorKind::Interrupted: read_exact would retry it.
                    if self.shutdown.load(Ordering::Relaxed) {
                        return Err(io::Error::new(io::ErrorKind::Other, "shutdown requested"));
                    }
                }
                other => return other,
            }
        }
    }
}

impl<S: Write> Write for InterruptibleStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A serial port as listed by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    /// Device path or COM name to pass to `--port`.
    pub name: String,
    /// Port kind, with USB ids and product name when known.
    pub description: String,
}

/// List the serial ports present on this machine.
pub fn list_ports() -> HostResult<Vec<PortSummary>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| PortSummary {
            description: describe_port_type(&p.port_type),
            name: p.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut text = format!("USB {:04x}:{:04x}", usb.vid, usb.pid);
            if let Some(product) = &usb.product {
                text.push(' ');
                text.push_str(product);
            }
            if let Some(serial) = &usb.serial_number {
                text.push_str(&format!(" (serial {})", serial));
            }
            text
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

// ============================================================================
// Loopback
// ============================================================================

/// One end of an in-process duplex byte pipe.
///
/// Each write is delivered to the peer as one chunk. Reads block until data
/// arrives and return end of stream once the peer end is dropped and all of
/// its data has been read.
pub struct LoopbackEnd {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
}

/// Create two connected loopback ends.
pub fn loopback_pair() -> (LoopbackEnd, LoopbackEnd) {
    let (a_tx, b_rx) = crossbeam_channel::unbounded();
    let (b_tx, a_rx) = crossbeam_channel::unbounded();
    (
        LoopbackEnd {
            tx: a_tx,
            rx: a_rx,
            pending: VecDeque::new(),
        },
        LoopbackEnd {
            tx: b_tx,
            rx: b_rx,
            pending: VecDeque::new(),
        },
    )
}

impl Read for LoopbackEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending.extend(chunk),
                // Peer dropped.
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for LoopbackEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "loopback peer dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
