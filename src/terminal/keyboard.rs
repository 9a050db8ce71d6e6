use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::warn;

/// A key press as the terminal cares about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Home,
    Escape,
    /// Function key F1..F12
    F(u8),
    /// Anything that transmits a character, including control codes.
    Char(char),
    Other,
}

impl Key {
    /// Map a crossterm key event. Release events yield `None`.
    pub fn from_event(event: KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }

        let key = match event.code {
            KeyCode::Home => Key::Home,
            KeyCode::Esc => Key::Escape,
            KeyCode::F(n) => Key::F(n),
            KeyCode::Enter => Key::Char('\r'),
            KeyCode::Tab => Key::Char('\t'),
            KeyCode::Backspace => Key::Char('\x08'),
            KeyCode::Char(c) if event.modifiers.contains(KeyModifiers::CONTROL) && c.is_ascii_alphabetic() => {
                Key::Char(char::from(c.to_ascii_uppercase() as u8 - b'@'))
            }
            KeyCode::Char(c) => Key::Char(c),
            _ => Key::Other,
        };
        Some(key)
    }

    /// Bytes to transmit for this key, if it transmits anything.
    pub fn transmit_bytes(self) -> Option<Vec<u8>> {
        match self {
            Key::Char(c) => {
                let mut buffer = [0u8; 4];
                Some(c.encode_utf8(&mut buffer).as_bytes().to_vec())
            }
            _ => None,
        }
    }
}

/// Non-blocking source of key presses.
pub trait Keyboard: Send {
    /// Wait at most `timeout` for a key press.
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>>;
}

/// Keyboard backed by crossterm's event queue.
#[derive(Debug, Default)]
pub struct ConsoleKeyboard;

impl ConsoleKeyboard {
    pub fn new() -> Self {
        Self
    }
}

impl Keyboard for ConsoleKeyboard {
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(Key::from_event(key)),
            _ => Ok(None),
        }
    }
}

/// Keeps the terminal in raw mode for its lifetime.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}
