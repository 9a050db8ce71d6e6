//! SerialTerm Library
//!
//! Interactive serial port terminal: connection supervision with automatic
//! reconnection, keystroke forwarding and ESP32/RP2040 reset protocols.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod terminal;

pub use crate::core::session::{Session, SessionState};
pub use crate::domain::config::ConnectionConfig;
pub use crate::domain::error::{SerialTermError, SerialTermResult};
pub use crate::infrastructure::serial::SerialConnectionManager;
