//! In-memory serial transport for tests.
//!
//! `MockTransport` simulates a set of devices that can be plugged, unplugged,
//! made busy and fed inbound bytes. It records every successful open, every
//! transmitted byte and every control-line change so tests can assert on them.
//! Devices are opened exclusively: opening a device while any handle on it
//! (link or reader) is alive fails the way a busy port does.

use super::transport::{LinkReader, PortSettings, ReadOutcome, SerialLink, SerialTransport};
use crate::domain::error::{OpenError, TransportErrorKind};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const READ_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine {
    Rts,
    Dtr,
}

/// A recorded control-line transition.
#[derive(Debug, Clone)]
pub struct LineChange {
    pub line: ControlLine,
    pub level: bool,
    pub at: Instant,
}

#[derive(Debug)]
enum Inbound {
    Data(Vec<u8>),
    Fault(TransportErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    present: Vec<String>,
    busy: HashSet<String>,
    refused_bauds: HashSet<u32>,
    listing_fails: bool,
    opens: Vec<PortSettings>,
    open_attempts: usize,
    handles: HashMap<String, usize>,
    next_link: u64,
    active_link: Option<u64>,
    severed: HashSet<u64>,
    inbound: VecDeque<Inbound>,
    written: Vec<u8>,
    lines: Vec<LineChange>,
}

impl MockState {
    fn release(&mut self, port: &str) {
        if let Some(count) = self.handles.get_mut(port) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.handles.remove(port);
            }
        }
    }
}

/// Simulated transport. Clones share the same devices.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// A transport with the given devices plugged in.
    pub fn with_ports<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transport = Self::default();
        transport.lock().present = ports.into_iter().map(Into::into).collect();
        transport
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn plug(&self, port: &str) {
        let mut state = self.lock();
        if !state.present.iter().any(|p| p == port) {
            state.present.push(port.to_string());
        }
    }

    /// Remove the device. Any live link on it fails from now on.
    pub fn unplug(&self, port: &str) {
        let mut state = self.lock();
        state.present.retain(|p| p != port);
        if let Some(id) = state.active_link.take() {
            state.severed.insert(id);
        }
    }

    /// Make opens of `port` fail as if another process held it.
    pub fn set_busy(&self, port: &str, busy: bool) {
        let mut state = self.lock();
        if busy {
            state.busy.insert(port.to_string());
        } else {
            state.busy.remove(port);
        }
    }

    /// Make opens at `baud` fail with a missing device.
    pub fn refuse_baud(&self, baud: u32) {
        self.lock().refused_bauds.insert(baud);
    }

    pub fn fail_listing(&self) {
        self.lock().listing_fails = true;
    }

    /// Queue bytes for the currently open link.
    pub fn inject(&self, data: &[u8]) {
        self.lock().inbound.push_back(Inbound::Data(data.to_vec()));
    }

    pub fn inject_fault(&self, kind: TransportErrorKind) {
        self.lock().inbound.push_back(Inbound::Fault(kind));
    }

    /// Settings of every successful open, oldest first.
    pub fn opens(&self) -> Vec<PortSettings> {
        self.lock().opens.clone()
    }

    pub fn open_attempts(&self) -> usize {
        self.lock().open_attempts
    }

    /// Handles (links and readers) currently held on `port`.
    pub fn open_handles(&self, port: &str) -> usize {
        self.lock().handles.get(port).copied().unwrap_or(0)
    }

    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    pub fn line_changes(&self) -> Vec<LineChange> {
        self.lock().lines.clone()
    }
}

impl SerialTransport for MockTransport {
    fn port_names(&self) -> io::Result<Vec<String>> {
        let state = self.lock();
        if state.listing_fails {
            return Err(io::Error::new(io::ErrorKind::Other, "enumeration failed"));
        }
        Ok(state.present.clone())
    }

    fn open(&self, settings: &PortSettings) -> Result<Box<dyn SerialLink>, OpenError> {
        let mut state = self.lock();
        state.open_attempts += 1;

        let port = settings.port_name.clone();
        if !state.present.contains(&port) || state.refused_bauds.contains(&settings.baud_rate) {
            return Err(OpenError::DeviceNotFound(port));
        }
        if state.busy.contains(&port) || state.handles.contains_key(&port) {
            return Err(OpenError::IoFailure {
                port,
                source: io::Error::new(io::ErrorKind::Other, "device or resource busy"),
            });
        }

        state.next_link += 1;
        let id = state.next_link;
        state.active_link = Some(id);
        state.inbound.clear();
        state.opens.push(settings.clone());
        *state.handles.entry(port.clone()).or_insert(0) += 1;

        Ok(Box::new(MockLink {
            id,
            port,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockLink {
    id: u64,
    port: String,
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_alive(&self, state: &MockState) -> io::Result<()> {
        if state.severed.contains(&self.id) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device removed"));
        }
        Ok(())
    }

    fn record_line(&self, line: ControlLine, level: bool) -> io::Result<()> {
        let mut state = self.lock();
        self.ensure_alive(&state)?;
        state.lines.push(LineChange {
            line,
            level,
            at: Instant::now(),
        });
        Ok(())
    }
}

impl SerialLink for MockLink {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        self.ensure_alive(&state)?;
        state.written.extend_from_slice(data);
        Ok(())
    }

    fn set_rts(&mut self, level: bool) -> io::Result<()> {
        self.record_line(ControlLine::Rts, level)
    }

    fn set_dtr(&mut self, level: bool) -> io::Result<()> {
        self.record_line(ControlLine::Dtr, level)
    }

    fn reader(&self) -> io::Result<Box<dyn LinkReader>> {
        let mut state = self.lock();
        self.ensure_alive(&state)?;
        *state.handles.entry(self.port.clone()).or_insert(0) += 1;
        Ok(Box::new(MockReader {
            id: self.id,
            port: self.port.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        let mut state = self.lock();
        if state.active_link == Some(self.id) {
            state.active_link = None;
        }
        state.release(&self.port);
    }
}

struct MockReader {
    id: u64,
    port: String,
    state: Arc<Mutex<MockState>>,
}

impl MockReader {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LinkReader for MockReader {
    fn read_chunk(&mut self, buffer: &mut [u8]) -> ReadOutcome {
        {
            let mut state = self.lock();
            if state.severed.contains(&self.id) {
                return ReadOutcome::Closed(io::Error::new(io::ErrorKind::BrokenPipe, "device removed"));
            }
            if state.active_link == Some(self.id) {
                match state.inbound.pop_front() {
                    Some(Inbound::Data(mut data)) => {
                        let n = data.len().min(buffer.len());
                        buffer[..n].copy_from_slice(&data[..n]);
                        if n < data.len() {
                            state.inbound.push_front(Inbound::Data(data.split_off(n)));
                        }
                        return ReadOutcome::Data(n);
                    }
                    Some(Inbound::Fault(kind)) => return ReadOutcome::Fault(kind),
                    None => {}
                }
            }
        }
        thread::sleep(READ_POLL);
        ReadOutcome::Idle
    }
}

impl Drop for MockReader {
    fn drop(&mut self) {
        self.lock().release(&self.port);
    }
}
