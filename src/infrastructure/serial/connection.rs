//! Serial connection manager: the single owner of the live port handle.

use super::transport::{LinkReader, PortSettings, ReadOutcome, SerialLink, SerialTransport};
use crate::domain::error::{ConnectionError, OpenError, TransportError};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Inbound events buffered per link before the reader waits for the session.
pub const INBOUND_CAPACITY: usize = 64;
const READ_BUFFER_SIZE: usize = 1024;

/// What the reader of an open link delivers.
#[derive(Debug)]
pub enum LinkEvent {
    /// Bytes exactly as received.
    Data(Vec<u8>),
    /// Line fault; the connection stays open.
    Fault(TransportError),
    /// The device went away. The manager has already dropped the link.
    Lost(io::Error),
}

struct ActiveLink {
    link: Box<dyn SerialLink>,
    events: mpsc::Receiver<LinkEvent>,
    stop: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

/// Owns the one live connection and its reader.
///
/// Each open link gets its own event channel, so events from a link that was
/// closed or replaced can never be mistaken for events of the current one.
pub struct SerialConnectionManager {
    transport: Arc<dyn SerialTransport>,
    settings: PortSettings,
    active: Option<ActiveLink>,
    rts: bool,
    dtr: bool,
}

impl SerialConnectionManager {
    pub fn new(transport: Arc<dyn SerialTransport>, settings: PortSettings) -> Self {
        let (rts, dtr) = (settings.rts, settings.dtr);
        Self {
            transport,
            settings,
            active: None,
            rts,
            dtr,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.settings.port_name
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Open the configured device and start its reader.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&mut self) -> Result<(), OpenError> {
        if self.active.is_some() {
            return Err(OpenError::AlreadyOpen(self.settings.port_name.clone()));
        }

        let link = self.transport.open(&self.settings)?;
        let reader = link.reader().map_err(|source| OpenError::IoFailure {
            port: self.settings.port_name.clone(),
            source,
        })?;

        let (sender, events) = mpsc::channel(INBOUND_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let port = self.settings.port_name.clone();
        let reader_stop = Arc::clone(&stop);
        let reader = tokio::task::spawn_blocking(move || read_loop(reader, port, sender, reader_stop));

        self.active = Some(ActiveLink {
            link,
            events,
            stop,
            reader,
        });
        self.rts = self.settings.rts;
        self.dtr = self.settings.dtr;

        info!("Opened {} at {} baud", self.settings.port_name, self.settings.baud_rate);
        Ok(())
    }

    /// Release the device. Returns once the reader has let go of its handle.
    pub async fn close(&mut self) {
        let Some(ActiveLink {
            link,
            events,
            stop,
            reader,
        }) = self.active.take()
        else {
            return;
        };

        stop.store(true, Ordering::Release);
        // Unblocks a reader waiting on a full channel.
        drop(events);
        drop(link);

        if let Err(e) = reader.await {
            warn!("Reader for {} ended abnormally: {}", self.settings.port_name, e);
        }
        info!("Closed {}", self.settings.port_name);
    }

    /// Open the same device at `baud_rate` and close it again immediately.
    pub fn pulse_open(&mut self, baud_rate: u32) -> Result<(), OpenError> {
        if self.active.is_some() {
            return Err(OpenError::AlreadyOpen(self.settings.port_name.clone()));
        }

        let link = self.transport.open(&self.settings.at_baud(baud_rate))?;
        drop(link);
        debug!("Pulsed {} at {} baud", self.settings.port_name, baud_rate);
        Ok(())
    }

    /// Transmit immediately. No queueing beyond the driver's own buffer.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
        let port = &self.settings.port_name;
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| ConnectionError::NotOpen(port.clone()))?;

        active.link.write_all(data).map_err(|source| ConnectionError::Io {
            port: port.clone(),
            source,
        })?;
        debug!("Sent {} bytes to {}", data.len(), port);
        Ok(())
    }

    pub fn set_rts(&mut self, level: bool) -> Result<(), ConnectionError> {
        let port = &self.settings.port_name;
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| ConnectionError::NotOpen(port.clone()))?;

        active.link.set_rts(level).map_err(|source| ConnectionError::Io {
            port: port.clone(),
            source,
        })?;
        self.rts = level;
        Ok(())
    }

    pub fn set_dtr(&mut self, level: bool) -> Result<(), ConnectionError> {
        let port = &self.settings.port_name;
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| ConnectionError::NotOpen(port.clone()))?;

        active.link.set_dtr(level).map_err(|source| ConnectionError::Io {
            port: port.clone(),
            source,
        })?;
        self.dtr = level;
        Ok(())
    }

    /// Next pending inbound event, without waiting.
    ///
    /// A `Lost` event tears the link down before it is returned, so
    /// `is_open()` is already false when the caller sees it.
    pub fn next_event(&mut self) -> Option<LinkEvent> {
        let active = self.active.as_mut()?;
        match active.events.try_recv() {
            Ok(LinkEvent::Lost(e)) => {
                info!("Lost connection to {}: {}", self.settings.port_name, e);
                self.discard();
                Some(LinkEvent::Lost(e))
            }
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("Reader for {} stopped unexpectedly", self.settings.port_name);
                self.discard();
                None
            }
        }
    }

    /// One-line summary of the connection parameters and control lines.
    pub fn describe(&self) -> String {
        let s = &self.settings;
        format!(
            "'{}' (B:{} | P:{} | DB: {} | SB:{} | HS: {} | DTR {} | RTS {})",
            s.port_name, s.baud_rate, s.parity, s.data_bits, s.stop_bits, s.handshake, self.dtr, self.rts
        )
    }

    fn discard(&mut self) {
        if let Some(active) = self.active.take() {
            active.stop.store(true, Ordering::Release);
        }
    }
}

impl Drop for SerialConnectionManager {
    fn drop(&mut self) {
        self.discard();
    }
}

fn read_loop(
    mut reader: Box<dyn LinkReader>,
    port: String,
    events: mpsc::Sender<LinkEvent>,
    stop: Arc<AtomicBool>,
) {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    while !stop.load(Ordering::Acquire) {
        let event = match reader.read_chunk(&mut buffer) {
            ReadOutcome::Idle => continue,
            ReadOutcome::Data(n) => {
                debug!("Received {} bytes from {}", n, port);
                LinkEvent::Data(buffer[..n].to_vec())
            }
            ReadOutcome::Fault(kind) => LinkEvent::Fault(TransportError {
                port: port.clone(),
                kind,
            }),
            ReadOutcome::Closed(e) => {
                let _ = events.blocking_send(LinkEvent::Lost(e));
                break;
            }
        };

        if events.blocking_send(event).is_err() {
            break;
        }
    }

    debug!("Reader for {} stopped", port);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{ConnectionConfig, DataBits, Handshake, Parity, StopBits};
    use crate::domain::error::TransportErrorKind;
    use crate::infrastructure::serial::mock::MockTransport;
    use proptest::prelude::*;
    use std::time::Duration;

    fn manager(transport: &MockTransport, port: &str) -> SerialConnectionManager {
        let settings = PortSettings::new(port, &ConnectionConfig::default());
        SerialConnectionManager::new(Arc::new(transport.clone()), settings)
    }

    async fn wait_for_event(manager: &mut SerialConnectionManager) -> Option<LinkEvent> {
        for _ in 0..400 {
            if let Some(event) = manager.next_event() {
                return Some(event);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_open_and_close() {
        let transport = MockTransport::with_ports(["/dev/ttyUSB0"]);
        let mut manager = manager(&transport, "/dev/ttyUSB0");

        assert!(!manager.is_open());
        manager.open().unwrap();
        assert!(manager.is_open());
        assert_eq!(transport.open_handles("/dev/ttyUSB0"), 2);

        manager.close().await;
        assert!(!manager.is_open());
        assert_eq!(transport.open_handles("/dev/ttyUSB0"), 0);

        // idempotent
        manager.close().await;
        assert!(!manager.is_open());
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let transport = MockTransport::with_ports(["COM3"]);
        let mut manager = manager(&transport, "COM3");

        manager.open().unwrap();
        assert!(matches!(manager.open(), Err(OpenError::AlreadyOpen(_))));
        assert_eq!(transport.opens().len(), 1);
        manager.close().await;
    }

    #[tokio::test]
    async fn test_open_missing_device() {
        let transport = MockTransport::with_ports(Vec::<String>::new());
        let mut manager = manager(&transport, "COM9");

        assert!(matches!(manager.open(), Err(OpenError::DeviceNotFound(_))));
        assert!(!manager.is_open());
    }

    #[tokio::test]
    async fn test_open_busy_device_is_io_failure() {
        let transport = MockTransport::with_ports(["COM3"]);
        transport.set_busy("COM3", true);
        let mut manager = manager(&transport, "COM3");

        assert!(matches!(manager.open(), Err(OpenError::IoFailure { .. })));
    }

    #[tokio::test]
    async fn test_open_uses_exact_parameters() {
        let transport = MockTransport::with_ports(["COM3"]);
        let mut expected = Vec::new();

        for data_bits in DataBits::ALL {
            for parity in Parity::ALL {
                for stop_bits in StopBits::ALL {
                    for handshake in Handshake::ALL {
                        let config = ConnectionConfig {
                            baud_rate: 57_600,
                            data_bits,
                            parity,
                            stop_bits,
                            handshake,
                            ..ConnectionConfig::default()
                        };
                        let settings = PortSettings::new("COM3", &config);
                        let mut manager =
                            SerialConnectionManager::new(Arc::new(transport.clone()), settings.clone());
                        manager.open().unwrap();
                        manager.close().await;
                        expected.push(settings);
                    }
                }
            }
        }

        assert_eq!(transport.opens(), expected);
    }

    proptest! {
        #[test]
        fn prop_open_passes_baud_and_control_lines_through(
            baud_rate in 1u32..=4_000_000,
            dtr_enabled in any::<bool>(),
            rts_enabled in any::<bool>(),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let transport = MockTransport::with_ports(["COM3"]);
            let config = ConnectionConfig {
                baud_rate,
                dtr_enabled,
                rts_enabled,
                ..ConnectionConfig::default()
            };
            let settings = PortSettings::new("COM3", &config);

            runtime.block_on(async {
                let mut manager = SerialConnectionManager::new(Arc::new(transport.clone()), settings.clone());
                manager.open().unwrap();
                manager.close().await;
            });

            let opens = transport.opens();
            prop_assert_eq!(opens.len(), 1);
            prop_assert_eq!(opens[0].baud_rate, baud_rate);
            prop_assert_eq!(opens[0].dtr, dtr_enabled);
            prop_assert_eq!(opens[0].rts, rts_enabled);
            prop_assert_eq!(&opens[0], &settings);
        }
    }

    #[tokio::test]
    async fn test_write_requires_open_connection() {
        let transport = MockTransport::with_ports(["COM3"]);
        let mut manager = manager(&transport, "COM3");

        assert!(matches!(manager.write(b"x"), Err(ConnectionError::NotOpen(_))));
        assert!(matches!(manager.set_rts(true), Err(ConnectionError::NotOpen(_))));
        assert!(matches!(manager.set_dtr(false), Err(ConnectionError::NotOpen(_))));

        manager.open().unwrap();
        manager.write(b"AT\r").unwrap();
        assert_eq!(transport.written(), b"AT\r");
        manager.close().await;
    }

    #[tokio::test]
    async fn test_inbound_bytes_arrive_verbatim() {
        let transport = MockTransport::with_ports(["COM3"]);
        let mut manager = manager(&transport, "COM3");
        manager.open().unwrap();

        transport.inject(b"\x1b[31mhello\r\n");
        match wait_for_event(&mut manager).await {
            Some(LinkEvent::Data(data)) => assert_eq!(data, b"\x1b[31mhello\r\n"),
            other => panic!("expected data, got {:?}", other),
        }
        manager.close().await;
    }

    #[tokio::test]
    async fn test_transport_fault_keeps_connection_open() {
        let transport = MockTransport::with_ports(["COM3"]);
        let mut manager = manager(&transport, "COM3");
        manager.open().unwrap();

        transport.inject_fault(TransportErrorKind::Overrun);
        match wait_for_event(&mut manager).await {
            Some(LinkEvent::Fault(fault)) => {
                assert_eq!(fault.port, "COM3");
                assert_eq!(fault.kind, TransportErrorKind::Overrun);
            }
            other => panic!("expected fault, got {:?}", other),
        }
        assert!(manager.is_open());
        manager.close().await;
    }

    #[tokio::test]
    async fn test_unplug_closes_connection() {
        let transport = MockTransport::with_ports(["COM3"]);
        let mut manager = manager(&transport, "COM3");
        manager.open().unwrap();

        transport.unplug("COM3");
        assert!(matches!(wait_for_event(&mut manager).await, Some(LinkEvent::Lost(_))));
        assert!(!manager.is_open());
        assert!(matches!(manager.open(), Err(OpenError::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_pulse_open_uses_requested_baud() {
        let transport = MockTransport::with_ports(["COM3"]);
        let mut manager = manager(&transport, "COM3");

        manager.open().unwrap();
        assert!(matches!(manager.pulse_open(1200), Err(OpenError::AlreadyOpen(_))));
        manager.close().await;

        manager.pulse_open(1200).unwrap();
        let opens = transport.opens();
        assert_eq!(opens.last().map(|s| s.baud_rate), Some(1200));
        assert_eq!(transport.open_handles("COM3"), 0);
        assert!(!manager.is_open());
    }

    #[tokio::test]
    async fn test_describe_tracks_control_lines() {
        let transport = MockTransport::with_ports(["COM3"]);
        let mut manager = manager(&transport, "COM3");
        assert_eq!(
            manager.describe(),
            "'COM3' (B:115200 | P:None | DB: 8 | SB:One | HS: None | DTR true | RTS true)"
        );

        manager.open().unwrap();
        manager.set_rts(false).unwrap();
        assert!(manager.describe().ends_with("DTR true | RTS false)"));
        manager.close().await;
    }
}
