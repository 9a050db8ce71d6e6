//! Transport seam between the connection manager and the operating system.
//!
//! `SerialTransport` opens devices and lists them; `SerialLink` is one open
//! device. The system implementation lives in `system.rs`, the mock used by the
//! test suite in `mock.rs`.

use crate::domain::config::{ConnectionConfig, DataBits, Handshake, Parity, StopBits};
use crate::domain::error::{OpenError, TransportErrorKind};
use std::io;
use std::time::Duration;

/// Read and write timeout applied to every opened link.
pub const IO_TIMEOUT: Duration = Duration::from_millis(500);

/// Fully resolved parameters for opening one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub handshake: Handshake,
    pub dtr: bool,
    pub rts: bool,
    pub timeout: Duration,
}

impl PortSettings {
    pub fn new(port_name: impl Into<String>, config: &ConnectionConfig) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: config.baud_rate,
            data_bits: config.data_bits,
            parity: config.parity,
            stop_bits: config.stop_bits,
            handshake: config.handshake,
            dtr: config.dtr_enabled,
            rts: config.rts_enabled,
            timeout: IO_TIMEOUT,
        }
    }

    /// Same device and framing at another baud rate.
    pub fn at_baud(&self, baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..self.clone()
        }
    }
}

/// Result of one blocking read on a link.
#[derive(Debug)]
pub enum ReadOutcome {
    /// `n` bytes were written into the buffer.
    Data(usize),
    /// Timeout with nothing received.
    Idle,
    /// A line fault; the link is still usable.
    Fault(TransportErrorKind),
    /// The device went away; the link is dead.
    Closed(io::Error),
}

pub trait SerialTransport: Send + Sync {
    /// Device names reported by the system, in system order.
    fn port_names(&self) -> io::Result<Vec<String>>;

    /// Open a device with the given settings.
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn SerialLink>, OpenError>;
}

/// One open device. Dropping it closes the device.
pub trait SerialLink: Send {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    fn set_rts(&mut self, level: bool) -> io::Result<()>;

    fn set_dtr(&mut self, level: bool) -> io::Result<()>;

    /// Independent read handle on the same device. The device is released only
    /// once both the link and every reader have been dropped.
    fn reader(&self) -> io::Result<Box<dyn LinkReader>>;
}

pub trait LinkReader: Send {
    fn read_chunk(&mut self, buffer: &mut [u8]) -> ReadOutcome;
}
