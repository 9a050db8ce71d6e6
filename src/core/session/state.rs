use serde::Serialize;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Waiting for the device to become available
    Connecting,
    Connected,
    /// Suspended by the user
    Paused,
    Terminated,
}

/// Session flags
///
/// `reconnecting` is only ever true while `connected` is false, and means the
/// "Disconnected." notice for the current outage has already been shown.
/// Once `running` is false the session never runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub connected: bool,
    pub paused: bool,
    pub reconnecting: bool,
    pub running: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            connected: false,
            paused: false,
            reconnecting: false,
            running: true,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.running {
            SessionPhase::Terminated
        } else if self.paused {
            SessionPhase::Paused
        } else if self.connected {
            SessionPhase::Connected
        } else {
            SessionPhase::Connecting
        }
    }

    pub(crate) fn mark_connected(&mut self, connected: bool) {
        self.connected = connected;
        if connected {
            self.reconnecting = false;
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
