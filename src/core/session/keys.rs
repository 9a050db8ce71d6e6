//! Key bindings of the interactive session.

use crate::terminal::Key;

/// What a key press asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ClearScreen,
    Exit,
    ShowHelp,
    TogglePause,
    ShowStatus,
    ResetDevice,
    EnterBootloader,
    Transmit(Vec<u8>),
    Ignore,
}

impl Command {
    pub fn for_key(key: Key) -> Self {
        match key {
            Key::Home => Command::ClearScreen,
            Key::Escape => Command::Exit,
            Key::F(1) => Command::ShowHelp,
            Key::F(2) => Command::TogglePause,
            Key::F(3) => Command::ShowStatus,
            Key::F(4) => Command::ResetDevice,
            Key::F(5) => Command::EnterBootloader,
            other => other.transmit_bytes().map_or(Command::Ignore, Command::Transmit),
        }
    }
}
