// Terminal module - Console output, keyboard input and table rendering
pub mod console;
pub mod keyboard;
pub mod mock;
pub mod render;

pub use console::{ConsoleDisplay, DisplaySink};
pub use keyboard::{ConsoleKeyboard, Key, Keyboard, RawModeGuard};
