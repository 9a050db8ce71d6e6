//! Operating-system serial ports via the `serialport` crate.

use super::transport::{LinkReader, PortSettings, ReadOutcome, SerialLink, SerialTransport};
use crate::domain::config::{DataBits, Handshake, Parity, StopBits};
use crate::domain::error::{OpenError, TransportErrorKind};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Transport backed by the system's serial devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTransport;

impl SystemTransport {
    pub fn new() -> Self {
        Self
    }
}

impl SerialTransport for SystemTransport {
    fn port_names(&self) -> io::Result<Vec<String>> {
        let ports = serialport::available_ports().map_err(io::Error::from)?;
        Ok(ports.into_iter().map(|info| info.port_name).collect())
    }

    fn open(&self, settings: &PortSettings) -> Result<Box<dyn SerialLink>, OpenError> {
        let mut port = serialport::new(settings.port_name.as_str(), settings.baud_rate)
            .data_bits(settings.data_bits.into())
            .parity(to_serialport_parity(settings.parity))
            .stop_bits(to_serialport_stop_bits(settings.stop_bits))
            .flow_control(to_serialport_flow_control(settings.handshake))
            .timeout(settings.timeout)
            .open()
            .map_err(|e| classify_open_error(&settings.port_name, e))?;

        let io_failure = |e: serialport::Error| OpenError::IoFailure {
            port: settings.port_name.clone(),
            source: io::Error::from(e),
        };

        port.write_data_terminal_ready(settings.dtr).map_err(io_failure)?;
        if settings.handshake.drives_rts() {
            debug!("RTS left to the driver for {} handshake", settings.handshake);
        } else {
            port.write_request_to_send(settings.rts).map_err(io_failure)?;
        }

        debug!(
            "Opened {} at {} baud ({}{}{})",
            settings.port_name,
            settings.baud_rate,
            settings.data_bits,
            settings.parity.name().chars().next().unwrap_or('N'),
            settings.stop_bits
        );

        Ok(Box::new(SystemLink { port }))
    }
}

struct SystemLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink for SystemLink {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn set_rts(&mut self, level: bool) -> io::Result<()> {
        self.port.write_request_to_send(level).map_err(io::Error::from)
    }

    fn set_dtr(&mut self, level: bool) -> io::Result<()> {
        self.port.write_data_terminal_ready(level).map_err(io::Error::from)
    }

    fn reader(&self) -> io::Result<Box<dyn LinkReader>> {
        let port = self.port.try_clone().map_err(io::Error::from)?;
        Ok(Box::new(SystemReader { port }))
    }
}

struct SystemReader {
    port: Box<dyn SerialPort>,
}

impl LinkReader for SystemReader {
    fn read_chunk(&mut self, buffer: &mut [u8]) -> ReadOutcome {
        match self.port.read(buffer) {
            Ok(0) => ReadOutcome::Idle,
            Ok(n) => ReadOutcome::Data(n),
            Err(e) => classify_read_error(e),
        }
    }
}

fn classify_open_error(port: &str, err: serialport::Error) -> OpenError {
    let missing = match err.kind() {
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => true,
        // On unix a held port (TIOCEXCL, flock) also reports NoDevice.
        serialport::ErrorKind::NoDevice => !cfg!(unix) || !Path::new(port).exists(),
        _ => false,
    };

    if missing {
        OpenError::DeviceNotFound(port.to_string())
    } else {
        OpenError::IoFailure {
            port: port.to_string(),
            source: io::Error::from(err),
        }
    }
}

fn classify_read_error(err: io::Error) -> ReadOutcome {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
            ReadOutcome::Idle
        }
        // Drivers surface framing and parity faults as invalid data.
        io::ErrorKind::InvalidData => ReadOutcome::Fault(TransportErrorKind::Frame),
        _ => ReadOutcome::Closed(err),
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

fn to_serialport_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
        Parity::Mark | Parity::Space => {
            info!("{} parity is not supported by the system driver, using None", parity);
            serialport::Parity::None
        }
    }
}

fn to_serialport_stop_bits(stop_bits: StopBits) -> serialport::StopBits {
    match stop_bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
        StopBits::OnePointFive => {
            info!("OnePointFive stop bits are not supported by the system driver, using Two");
            serialport::StopBits::Two
        }
    }
}

fn to_serialport_flow_control(handshake: Handshake) -> serialport::FlowControl {
    match handshake {
        Handshake::None => serialport::FlowControl::None,
        Handshake::XonXoff => serialport::FlowControl::Software,
        Handshake::Rts => serialport::FlowControl::Hardware,
        Handshake::RtsXonXoff => {
            info!("Combined RTS/XonXoff handshake is not supported by the system driver, using RTS");
            serialport::FlowControl::Hardware
        }
    }
}
