use super::keys::Command;
use super::state::SessionState;
use crate::core::reset::{control_line_reset, enter_bootloader};
use crate::domain::config::ConnectionConfig;
use crate::domain::error::{OpenError, ResetProtocolError, SerialTermResult};
use crate::infrastructure::serial::connection::INBOUND_CAPACITY;
use crate::infrastructure::serial::{LinkEvent, SerialConnectionManager};
use crate::terminal::{render, DisplaySink, Keyboard};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Supervision period of the session loop.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// Interactive terminal session over a single serial connection.
///
/// Everything here runs on one task: each tick drains what the link's reader
/// delivered, reconnects if the link is gone, then handles at most one key.
pub struct Session {
    connection: SerialConnectionManager,
    keyboard: Box<dyn Keyboard>,
    display: Box<dyn DisplaySink>,
    disconnect_exit: bool,
    reset_on_connect: bool,
    state: SessionState,
}

impl Session {
    pub fn new(
        config: &ConnectionConfig,
        connection: SerialConnectionManager,
        keyboard: Box<dyn Keyboard>,
        display: Box<dyn DisplaySink>,
    ) -> Self {
        Self {
            connection,
            keyboard,
            display,
            disconnect_exit: config.disconnect_exit,
            reset_on_connect: config.reset_on_connect,
            state: SessionState::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection(&self) -> &SerialConnectionManager {
        &self.connection
    }

    /// Run until the user exits or the device disappears with disconnect-exit set.
    ///
    /// The connection is closed before this returns.
    pub async fn run(&mut self) -> SerialTermResult<()> {
        let result = self.run_until_stopped().await;
        self.connection.close().await;
        info!("Session on {} ended", self.connection.port_name());
        result
    }

    async fn run_until_stopped(&mut self) -> SerialTermResult<()> {
        self.start().await?;

        let mut ticker = interval(TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while self.state.running {
            ticker.tick().await;
            self.tick().await?;
        }
        Ok(())
    }

    /// Announce the connection and make the first open attempt.
    pub async fn start(&mut self) -> SerialTermResult<()> {
        let banner = format!("Connecting to: {}", self.connection.describe());
        self.display.write_line(&banner)?;

        match self.connection.open() {
            Ok(()) => {
                self.state.mark_connected(true);
                self.after_connect().await;
            }
            Err(e) => {
                info!("{}", e);
                let notice = format!("Failed to open {}", self.connection.port_name());
                self.display.write_line(&notice)?;
            }
        }
        Ok(())
    }

    /// One supervision step.
    pub async fn tick(&mut self) -> SerialTermResult<()> {
        if !self.state.running {
            return Ok(());
        }

        self.drain_inbound()?;
        self.supervise().await?;

        if self.state.running {
            if let Some(key) = self.keyboard.poll_key(Duration::ZERO)? {
                self.dispatch(Command::for_key(key)).await?;
            }
        }

        self.state.mark_connected(self.connection.is_open());
        Ok(())
    }

    fn drain_inbound(&mut self) -> SerialTermResult<()> {
        for _ in 0..INBOUND_CAPACITY {
            let Some(event) = self.connection.next_event() else {
                break;
            };
            match event {
                LinkEvent::Data(bytes) => self.display.write_bytes(&bytes)?,
                LinkEvent::Fault(fault) => self.display.write_line(&fault.to_string())?,
                LinkEvent::Lost(_) => {
                    self.state.mark_connected(false);
                    break;
                }
            }
        }
        Ok(())
    }

    async fn supervise(&mut self) -> SerialTermResult<()> {
        if self.state.paused || self.connection.is_open() {
            return Ok(());
        }

        match self.connection.open() {
            Ok(()) => {
                self.state.mark_connected(true);
                self.display.write_line("Reconnected.")?;
                self.after_connect().await;
            }
            Err(OpenError::DeviceNotFound(port)) => {
                if !self.state.reconnecting {
                    self.display.write_line("Disconnected.")?;
                }
                if self.disconnect_exit {
                    info!("{} disconnected, exiting", port);
                    self.state.running = false;
                    return Ok(());
                }
                self.state.reconnecting = true;
            }
            Err(OpenError::AlreadyOpen(port)) => {
                error!("Connection to {} is open while the session saw it closed", port);
                self.state.running = false;
            }
            Err(e) => debug!("Reopen failed, retrying: {}", e),
        }
        Ok(())
    }

    async fn after_connect(&mut self) {
        if self.reset_on_connect {
            if let Err(e) = control_line_reset(&mut self.connection).await {
                log_reset_failure(&e);
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> SerialTermResult<()> {
        match command {
            Command::ClearScreen => self.display.clear()?,
            Command::Exit => self.state.running = false,
            Command::ShowHelp => self.show_help()?,
            Command::TogglePause => self.toggle_pause().await?,
            Command::ShowStatus => {
                let status = format!("Connected to: {}", self.connection.describe());
                self.display.write_line(&status)?;
            }
            Command::ResetDevice => {
                if let Err(e) = control_line_reset(&mut self.connection).await {
                    log_reset_failure(&e);
                }
            }
            Command::EnterBootloader => {
                if let Err(e) = enter_bootloader(&mut self.connection).await {
                    log_reset_failure(&e);
                }
                self.state.paused = true;
            }
            Command::Transmit(bytes) => self.transmit(&bytes),
            Command::Ignore => {}
        }
        Ok(())
    }

    async fn toggle_pause(&mut self) -> SerialTermResult<()> {
        self.state.paused = !self.state.paused;
        if self.state.paused {
            self.display.write_text("Disconnected ... ")?;
            self.connection.close().await;
        } else {
            self.display.write_text("Reconnecting ... ")?;
        }
        Ok(())
    }

    fn show_help(&mut self) -> SerialTermResult<()> {
        self.display.write_text("\nTerminal Keys\n-------------\n")?;
        self.display.write_line(&render::help_table())?;
        self.display.write_text("\n")?;
        Ok(())
    }

    fn transmit(&mut self, bytes: &[u8]) {
        if !self.connection.is_open() {
            debug!("Dropped {} bytes, {} is not open", bytes.len(), self.connection.port_name());
            return;
        }
        // A write racing an unplug fails here before the reader reports it.
        if let Err(e) = self.connection.write(bytes) {
            info!("{}", e);
        }
    }
}

/// Resets requested while closed or aimed at an absent device are routine.
fn log_reset_failure(e: &ResetProtocolError) {
    match e {
        ResetProtocolError::NotOpen(_) => info!("{}", e),
        ResetProtocolError::Bootloader { source, .. } if source.is_device_missing() => info!("{}", e),
        _ => warn!("{}", e),
    }
}
