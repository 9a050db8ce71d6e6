use crate::cli::args::{Args, Command, OutputFormat};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::session::Session;
use crate::domain::config::{ConnectionConfig, FileConfig};
use crate::domain::error::{SerialTermError, SerialTermResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::{
    list_ports, PortSettings, SerialConnectionManager, SerialTransport, SystemTransport,
};
use crate::terminal::{render, ConsoleDisplay, ConsoleKeyboard, DisplaySink, Key, Keyboard, RawModeGuard};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How often the port list is refreshed while waiting for a device.
pub const PORT_POLL: Duration = Duration::from_millis(100);

/// Execute CLI command
pub async fn execute_command(args: Args) -> SerialTermResult<()> {
    let file = load_file_config(&args)?;
    init_logging(&args.log_level(&file), args.log_path(&file).as_deref())?;

    let transport: Arc<dyn SerialTransport> = Arc::new(SystemTransport::new());
    match args.command {
        Some(Command::List) => list_command(transport.as_ref(), args.output),
        None => {
            // Only the terminal needs the line parameters, so only it can reject them.
            let config = args.resolve(&file.defaults)?;
            debug!("Resolved connection config: {:?}", config);
            terminal_command(config, transport).await
        }
    }
}

fn load_file_config(args: &Args) -> SerialTermResult<FileConfig> {
    match &args.config {
        Some(path) => ConfigManager::with_path(path).load_config(),
        None => match ConfigManager::new() {
            Ok(manager) => manager.load_config(),
            // No home directory, so no default file either.
            Err(_) => Ok(FileConfig::default()),
        },
    }
}

/// Print every serial port with its busy/free status.
pub fn list_command(transport: &dyn SerialTransport, format: OutputFormat) -> SerialTermResult<()> {
    let ports = list_ports(transport);
    ConsoleWriter::stdout(format).write_ports(&ports)?;
    Ok(())
}

async fn terminal_command(config: ConnectionConfig, transport: Arc<dyn SerialTransport>) -> SerialTermResult<()> {
    let _raw_mode = RawModeGuard::enable().map_err(|e| SerialTermError::Terminal(e.to_string()))?;
    let mut keyboard = ConsoleKeyboard::new();
    let mut display = ConsoleDisplay::new();

    let port = match &config.port {
        Some(port) => port.clone(),
        None => resolve_port_name(transport.as_ref(), &mut keyboard, &mut display).await?,
    };
    info!("Starting terminal on {}", port);

    let connection = SerialConnectionManager::new(transport, PortSettings::new(port, &config));
    let mut session = Session::new(&config, connection, Box::new(keyboard), Box::new(display));
    session.run().await
}

/// Pick a port when none was configured.
///
/// Waits for a device when there is none, takes the only one when there is
/// one, and otherwise asks the user to choose by its 1-based number. Escape
/// aborts the wait and the prompt.
pub async fn resolve_port_name<K, D>(
    transport: &dyn SerialTransport,
    keyboard: &mut K,
    display: &mut D,
) -> SerialTermResult<String>
where
    K: Keyboard + ?Sized,
    D: DisplaySink + ?Sized,
{
    let mut waiting = false;

    loop {
        let mut ports = list_ports(transport);

        match ports.len() {
            0 => {
                if !waiting {
                    display.write_line("Waiting for COM device.")?;
                    waiting = true;
                }
                if keyboard.poll_key(Duration::ZERO)? == Some(Key::Escape) {
                    return Err(SerialTermError::SelectionAborted);
                }
                tokio::time::sleep(PORT_POLL).await;
            }
            1 => {
                let port = ports.remove(0).name;
                display.write_line(&format!("Port defaulted to {}", port))?;
                return Ok(port);
            }
            count => {
                display.write_line("Select a port:")?;
                display.write_line(&render::port_table(&ports))?;
                display.write_text("\nport number: ")?;

                let key = next_key(keyboard).await?;
                if key == Key::Escape {
                    display.write_line("")?;
                    return Err(SerialTermError::SelectionAborted);
                }

                let choice = match key {
                    Key::Char(c) => {
                        display.write_line(&c.to_string())?;
                        c.to_digit(10).map(|d| d as usize).filter(|d| (1..=count).contains(d))
                    }
                    _ => {
                        display.write_line("")?;
                        None
                    }
                };

                match choice {
                    Some(ordinal) => {
                        let port = ports.swap_remove(ordinal - 1).name;
                        display.write_line(&format!("Port set to {}", port))?;
                        return Ok(port);
                    }
                    None => display.write_line("Error setting port")?,
                }
            }
        }
    }
}

async fn next_key<K: Keyboard + ?Sized>(keyboard: &mut K) -> SerialTermResult<Key> {
    loop {
        if let Some(key) = keyboard.poll_key(Duration::ZERO)? {
            return Ok(key);
        }
        tokio::time::sleep(PORT_POLL).await;
    }
}
