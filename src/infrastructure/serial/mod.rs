// Serial module - Serial port transport, connection ownership and enumeration
pub mod connection;
pub mod enumerator;
pub mod mock;
pub mod system;
pub mod transport;

pub use connection::{LinkEvent, SerialConnectionManager};
pub use enumerator::{list_ports, PortDescriptor, PortStatus};
pub use system::SystemTransport;
pub use transport::{PortSettings, SerialTransport};
