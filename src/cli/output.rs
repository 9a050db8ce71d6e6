use crate::cli::args::OutputFormat;
use crate::infrastructure::serial::PortDescriptor;
use crate::terminal::render;
use std::io::{self, Write};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_ports(&mut self, ports: &[PortDescriptor]) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::SerialTermError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Writer for line-oriented command output
pub struct ConsoleWriter<W: Write> {
    format: OutputFormat,
    out: W,
}

impl ConsoleWriter<io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, io::stdout())
    }
}

impl<W: Write> ConsoleWriter<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self { format, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputWriter for ConsoleWriter<W> {
    fn write_ports(&mut self, ports: &[PortDescriptor]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.out, "Serial Ports")?;
                writeln!(self.out, "------------")?;
                writeln!(self.out, "{}", render::port_table(ports))?;
            }
            OutputFormat::Table => {
                writeln!(self.out, "{}", render::port_table(ports))?;
            }
            OutputFormat::Json => {
                let output = serde_json::to_string_pretty(ports)?;
                writeln!(self.out, "{}", output)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}
