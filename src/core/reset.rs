//! Hardware reset protocols for attached microcontrollers.
//!
//! ESP32 boards wire RTS to the chip's enable pin, so pulsing RTS restarts
//! the firmware. RP2040 boards running a USB CDC stack reboot into their
//! bootloader when the port is opened at 1200 baud and closed again.

use crate::domain::error::ResetProtocolError;
use crate::infrastructure::serial::SerialConnectionManager;
use std::time::Duration;
use tracing::info;

/// How long RTS stays asserted.
pub const RESET_HOLD: Duration = Duration::from_millis(100);
pub const BOOTLOADER_BAUD: u32 = 1200;

/// Assert RTS, hold it, then release it.
///
/// The caller is suspended for the whole hold.
pub async fn control_line_reset(connection: &mut SerialConnectionManager) -> Result<(), ResetProtocolError> {
    if !connection.is_open() {
        return Err(ResetProtocolError::NotOpen(connection.port_name().to_string()));
    }

    connection.set_rts(true).map_err(ResetProtocolError::LineControl)?;
    tokio::time::sleep(RESET_HOLD).await;
    connection.set_rts(false).map_err(ResetProtocolError::LineControl)?;

    info!("Reset device on {}", connection.port_name());
    Ok(())
}

/// Close the connection, then open and close it at the bootloader baud rate.
///
/// The connection is left closed whatever the outcome.
pub async fn enter_bootloader(connection: &mut SerialConnectionManager) -> Result<(), ResetProtocolError> {
    connection.close().await;
    connection
        .pulse_open(BOOTLOADER_BAUD)
        .map_err(|source| ResetProtocolError::Bootloader {
            baud: BOOTLOADER_BAUD,
            source,
        })?;

    info!("Triggered bootloader on {}", connection.port_name());
    Ok(())
}
