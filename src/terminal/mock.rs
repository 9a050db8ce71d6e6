//! Scripted keyboard and captured display for driving a session in tests.

use super::console::DisplaySink;
use super::keyboard::{Key, Keyboard};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keyboard that replays queued keys, one per poll. Clones share the queue.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeyboard {
    keys: Arc<Mutex<VecDeque<Key>>>,
}

impl ScriptedKeyboard {
    pub fn new<I: IntoIterator<Item = Key>>(keys: I) -> Self {
        Self {
            keys: Arc::new(Mutex::new(keys.into_iter().collect())),
        }
    }

    pub fn push(&self, key: Key) {
        lock(&self.keys).push_back(key);
    }
}

impl Keyboard for ScriptedKeyboard {
    fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<Key>> {
        Ok(lock(&self.keys).pop_front())
    }
}

#[derive(Debug, Default)]
struct Captured {
    output: Vec<u8>,
    clears: usize,
}

/// Display that records everything written to it. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct CapturedDisplay {
    inner: Arc<Mutex<Captured>>,
}

impl CapturedDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> Vec<u8> {
        lock(&self.inner).output.clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }

    /// Occurrences of `needle` in the captured text.
    pub fn count(&self, needle: &str) -> usize {
        self.text().matches(needle).count()
    }

    pub fn clears(&self) -> usize {
        lock(&self.inner).clears
    }
}

impl DisplaySink for CapturedDisplay {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        lock(&self.inner).output.extend_from_slice(data);
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        lock(&self.inner).output.extend_from_slice(text.as_bytes());
        Ok(())
    }

    // Output is kept so assertions can see what came before a clear.
    fn clear(&mut self) -> io::Result<()> {
        lock(&self.inner).clears += 1;
        Ok(())
    }
}
