//! Log capture for TUI mode
//!
//! tracing-subscriber writes into a shared ring buffer instead of stderr so
//! log output never lands on the alternate screen. The UI drains it each
//! tick into a [`LogTail`] and surfaces the latest warning in the status bar.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Lines held between two drains.
const RING_BUFFER_CAPACITY: usize = 256;

/// Lines kept on the display side.
const TAIL_CAPACITY: usize = 50;

#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a line, evicting the oldest when full.
    pub fn push(&self, line: String) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if guard.len() >= RING_BUFFER_CAPACITY {
            guard.pop_front();
        }
        guard.push_back(line);
    }

    /// Take every buffered line, oldest first.
    pub fn drain(&self) -> Vec<String> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.drain(..).collect()
    }
}

/// Collects bytes and pushes complete lines into a [`LogBuffer`].
pub struct BufferWriter {
    buffer: LogBuffer,
    pending: Vec<u8>,
}

impl BufferWriter {
    fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            pending: Vec::new(),
        }
    }

    fn push_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        if !line.is_empty() {
            self.buffer.push(line);
        }
    }
}

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for &b in buf {
            if b == b'\n' {
                self.push_pending();
            } else {
                self.pending.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.push_pending();
        Ok(())
    }
}

impl Drop for BufferWriter {
    fn drop(&mut self) {
        self.push_pending();
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter::new(self.clone())
    }
}

/// Display-side view of recent log lines.
#[derive(Default)]
pub struct LogTail {
    lines: VecDeque<String>,
    last_warning: Option<String>,
}

impl LogTail {
    /// Move everything from `buffer` into the tail.
    pub fn absorb(&mut self, buffer: &LogBuffer) {
        for line in buffer.drain() {
            if line.contains(" WARN ") || line.contains(" ERROR ") {
                self.last_warning = Some(line.clone());
            }
            if self.lines.len() >= TAIL_CAPACITY {
                self.lines.pop_front();
            }
            self.lines.push_back(line);
        }
    }

    pub fn last_warning(&self) -> Option<&str> {
        self.last_warning.as_deref()
    }

    pub fn dismiss_warning(&mut self) {
        self.last_warning = None;
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let buf = LogBuffer::new();
        for i in 0..RING_BUFFER_CAPACITY + 10 {
            buf.push(format!("line {}", i));
        }
        let lines = buf.drain();
        assert_eq!(lines.len(), RING_BUFFER_CAPACITY);
        assert_eq!(lines[0], "line 10");
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn test_writer_splits_lines_and_flushes_partial_on_drop() {
        let buf = LogBuffer::new();
        {
            let mut writer = buf.make_writer();
            write!(writer, "first\nsecond\r\nthird").unwrap();
            assert_eq!(buf.drain(), vec!["first", "second"]);
        }
        assert_eq!(buf.drain(), vec!["third"]);
    }

    #[test]
    fn test_tail_tracks_last_warning() {
        let buf = LogBuffer::new();
        let mut tail = LogTail::default();
        buf.push("2024-01-01T00:00:00Z  INFO Connected as u1".to_string());
        buf.push("2024-01-01T00:00:01Z  WARN Feed poll failed: offline".to_string());
        buf.push("2024-01-01T00:00:02Z DEBUG POST https://x".to_string());
        tail.absorb(&buf);

        assert_eq!(tail.lines().count(), 3);
        assert!(tail.last_warning().unwrap().ends_with("offline"));
        tail.dismiss_warning();
        assert!(tail.last_warning().is_none());
    }

    #[test]
    fn test_tail_is_bounded() {
        let buf = LogBuffer::new();
        let mut tail = LogTail::default();
        for i in 0..TAIL_CAPACITY * 2 {
            buf.push(format!("line {}", i));
        }
        tail.absorb(&buf);
        assert_eq!(tail.lines().count(), TAIL_CAPACITY);
        assert_eq!(tail.lines().next(), Some("line 50"));
    }
}
