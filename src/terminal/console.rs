use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};

/// Where device output and terminal notices are shown.
pub trait DisplaySink: Send {
    /// Device bytes, exactly as received.
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()>;

    /// Text produced by the terminal itself. `\n` starts a new line.
    fn write_text(&mut self, text: &str) -> io::Result<()>;

    fn clear(&mut self) -> io::Result<()>;

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.write_text(line)?;
        self.write_text("\n")
    }
}

/// Standard output in raw mode.
pub struct ConsoleDisplay {
    stdout: Stdout,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self { stdout: io::stdout() }
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for ConsoleDisplay {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        let mut out = self.stdout.lock();
        out.write_all(data)?;
        out.flush()
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        // Raw mode does not translate newlines.
        let text = text.replace('\n', "\r\n");
        let mut out = self.stdout.lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn clear(&mut self) -> io::Result<()> {
        execute!(self.stdout, Clear(ClearType::All), MoveTo(0, 0))
    }
}
