use std::fmt;
use thiserror::Error;

/// SerialTerm unified error type
#[derive(Error, Debug)]
pub enum SerialTermError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] ConfigValidationError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Port selection aborted")]
    SelectionAborted,
}

pub type SerialTermResult<T> = Result<T, SerialTermError>;

/// An option value that does not name a member of its enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {option} value '{value}', the correct values are ({expected})")]
pub struct ConfigValidationError {
    pub option: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl ConfigValidationError {
    pub fn new(option: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        Self {
            option,
            value: value.into(),
            expected,
        }
    }
}

/// Failure to open the serial device.
#[derive(Error, Debug)]
pub enum OpenError {
    /// The device file is absent (unplugged or never present).
    #[error("Device '{0}' not found")]
    DeviceNotFound(String),

    #[error("Failed to open '{port}': {source}")]
    IoFailure {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to '{0}' is already open")]
    AlreadyOpen(String),
}

/// Failure of an operation that needs the live connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Connection to '{0}' is not open")]
    NotOpen(String),

    #[error("I/O error on '{port}': {source}")]
    Io {
        port: String,
        #[source]
        source: std::io::Error,
    },
}

/// Line-level receive/transmit fault reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Frame,
    Overrun,
    RxParity,
    RxOver,
    TxFull,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Frame => write!(f, "Frame"),
            TransportErrorKind::Overrun => write!(f, "Overrun"),
            TransportErrorKind::RxParity => write!(f, "RXParity"),
            TransportErrorKind::RxOver => write!(f, "RXOver"),
            TransportErrorKind::TxFull => write!(f, "TXFull"),
        }
    }
}

/// Transport fault observed during an active session. The connection stays open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{port} Error: {kind}")]
pub struct TransportError {
    pub port: String,
    pub kind: TransportErrorKind,
}

#[derive(Error, Debug)]
pub enum ResetProtocolError {
    #[error("Cannot reset '{0}': connection is not open")]
    NotOpen(String),

    #[error("Failed to drive control line: {0}")]
    LineControl(#[source] ConnectionError),

    #[error("Bootloader trigger at {baud} baud failed: {source}")]
    Bootloader {
        baud: u32,
        #[source]
        source: OpenError,
    },
}

impl OpenError {
    pub fn is_device_missing(&self) -> bool {
        matches!(self, OpenError::DeviceNotFound(_))
    }
}
