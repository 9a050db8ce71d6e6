use crate::domain::config::{
    ConnectionConfig, ConnectionDefaults, DataBits, FileConfig, Handshake, Parity, StopBits, DEFAULT_BAUD_RATE,
    DEFAULT_DATA_BITS,
};
use crate::domain::error::ConfigValidationError;
use crate::infrastructure::logging::DEFAULT_LOG_LEVEL;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments for SerialTerm
#[derive(Parser, Debug)]
#[command(
    name = "serialterm",
    version = env!("CARGO_PKG_VERSION"),
    about = "Interactive serial port terminal",
    long_about = "A serial port terminal that streams device output, forwards keystrokes, \
                  reconnects automatically and can reset ESP32 and RP2040 boards."
)]
pub struct Args {
    /// Serial port to open; chosen interactively when omitted
    #[arg(short = 'P', long)]
    pub port: Option<String>,

    /// Baud rate [default: 115200]
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Data bits, 5 to 8 [default: 8]
    #[arg(long)]
    pub data_bits: Option<u8>,

    /// Parity: None, Mark, Even, Odd or Space [default: None]
    #[arg(long)]
    pub parity: Option<String>,

    /// Stop bits: One, OnePointFive or Two [default: One]
    #[arg(long)]
    pub stop_bits: Option<String>,

    /// Handshake: None, RTS, XonXoff or RTSXonXoff [default: None]
    #[arg(long)]
    pub handshake: Option<String>,

    /// Exit when the device disconnects
    #[arg(long)]
    pub disconnect_exit: bool,

    /// Reset the ESP32 through RTS after every connect
    #[arg(short = 'r', long = "reset-esp32")]
    pub reset_esp32: bool,

    /// Hold DTR low
    #[arg(long)]
    pub disable_dtr: bool,

    /// Hold RTS low
    #[arg(long)]
    pub disable_rts: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Command to execute; without one the interactive terminal starts
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List available serial ports
    List,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

impl Args {
    /// Merge the command line over the file defaults.
    ///
    /// A value given on the command line wins over the file, which wins over
    /// the built-in default. Every enum-like value is checked the same way
    /// wherever it came from.
    pub fn resolve(&self, defaults: &ConnectionDefaults) -> Result<ConnectionConfig, ConfigValidationError> {
        let baud_rate = self.baud.or(defaults.baud).unwrap_or(DEFAULT_BAUD_RATE);
        if baud_rate == 0 {
            return Err(ConfigValidationError::new("baud", "0", "a positive integer"));
        }

        let data_bits =
            DataBits::try_from(self.data_bits.or(defaults.data_bits).unwrap_or(DEFAULT_DATA_BITS))?;

        let parity = match self.parity.as_deref().or(defaults.parity.as_deref()) {
            Some(name) => name.parse::<Parity>()?,
            None => Parity::None,
        };
        let stop_bits = match self.stop_bits.as_deref().or(defaults.stop_bits.as_deref()) {
            Some(name) => name.parse::<StopBits>()?,
            None => StopBits::One,
        };
        let handshake = match self.handshake.as_deref().or(defaults.handshake.as_deref()) {
            Some(name) => name.parse::<Handshake>()?,
            None => Handshake::None,
        };

        Ok(ConnectionConfig {
            port: self.port.clone().or_else(|| defaults.port.clone()),
            baud_rate,
            data_bits,
            parity,
            stop_bits,
            handshake,
            disconnect_exit: self.disconnect_exit || defaults.disconnect_exit.unwrap_or(false),
            reset_on_connect: self.reset_esp32 || defaults.reset_esp32.unwrap_or(false),
            dtr_enabled: !self.disable_dtr && defaults.dtr.unwrap_or(true),
            rts_enabled: !self.disable_rts && defaults.rts.unwrap_or(true),
        })
    }

    pub fn log_level(&self, file: &FileConfig) -> String {
        if self.verbose {
            return "debug".to_string();
        }
        file.logging
            .level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }

    pub fn log_path(&self, file: &FileConfig) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| file.logging.file.as_ref().map(PathBuf::from))
    }
}
