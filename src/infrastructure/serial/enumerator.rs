//! Port enumeration with a busy/free probe.

use super::transport::{PortSettings, SerialTransport};
use crate::domain::config::ConnectionConfig;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Free,
    Busy,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Free => write!(f, "(free)"),
            PortStatus::Busy => write!(f, "(busy)"),
        }
    }
}

/// One enumerated port. Only meaningful at the moment it was probed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDescriptor {
    /// 1-based position in the listing.
    pub ordinal: usize,
    pub name: String,
    pub status: PortStatus,
}

/// List every system port and probe it by opening and closing it.
///
/// A failing system listing is reported as no ports at all.
pub fn list_ports(transport: &dyn SerialTransport) -> Vec<PortDescriptor> {
    let names = match transport.port_names() {
        Ok(names) => names,
        Err(e) => {
            warn!("Failed to enumerate serial ports: {}", e);
            return Vec::new();
        }
    };

    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let status = probe(transport, &name);
            PortDescriptor {
                ordinal: index + 1,
                name,
                status,
            }
        })
        .collect()
}

fn probe(transport: &dyn SerialTransport, name: &str) -> PortStatus {
    let settings = PortSettings::new(name, &ConnectionConfig::default());
    match transport.open(&settings) {
        Ok(link) => {
            drop(link);
            PortStatus::Free
        }
        Err(e) => {
            debug!("Probe of {} failed: {}", name, e);
            PortStatus::Busy
        }
    }
}
