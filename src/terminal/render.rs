//! Table rendering for the help and port listings.

use crate::infrastructure::serial::PortDescriptor;
use tabled::{Table, Tabled};

pub const NO_PORTS_MESSAGE: &str = "No serial ports detected.";

/// Row of the key help table
#[derive(Tabled, Debug, Clone, PartialEq, Eq)]
pub struct HelpRow {
    #[tabled(rename = "Key")]
    pub key: &'static str,
    #[tabled(rename = "Function")]
    pub function: &'static str,
}

/// Row of the port listing
#[derive(Tabled, Debug, Clone, PartialEq, Eq)]
pub struct PortRow {
    #[tabled(rename = "#")]
    pub ordinal: usize,
    #[tabled(rename = "Port")]
    pub port: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&PortDescriptor> for PortRow {
    fn from(port: &PortDescriptor) -> Self {
        Self {
            ordinal: port.ordinal,
            port: port.name.clone(),
            status: port.status.to_string(),
        }
    }
}

pub fn help_rows() -> Vec<HelpRow> {
    vec![
        HelpRow { key: "F1", function: "Display SerialTerm key help" },
        HelpRow { key: "F2", function: "Disconnect / Reconnect serial connection" },
        HelpRow { key: "F3", function: "Display serial port settings" },
        HelpRow { key: "F4", function: "Soft reset ESP32 by toggling RTS" },
        HelpRow { key: "F5", function: "Reset RP2040 to programming mode by a 1200 baud open/close" },
        HelpRow { key: "Home", function: "Clear terminal screen" },
        HelpRow { key: "ESC", function: "Exit terminal program" },
    ]
}

pub fn help_table() -> String {
    Table::new(help_rows()).to_string()
}

/// Port table, or the no-ports line when the listing is empty.
pub fn port_table(ports: &[PortDescriptor]) -> String {
    if ports.is_empty() {
        return NO_PORTS_MESSAGE.to_string();
    }
    Table::new(ports.iter().map(PortRow::from)).to_string()
}
