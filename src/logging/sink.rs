//! Output destinations.
//!
//! Delivery is best-effort: write and flush errors are swallowed and callers
//! have no way to detect a dropped record.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared, cloneable handle to a byte-stream writer.
///
/// Clones write to the same underlying stream. Each record is written and
/// flushed under the sink lock, so concurrent records never interleave.
#[derive(Clone)]
pub struct Sink {
    name: &'static str,
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Sink {
    pub fn stdout() -> Self {
        Self::named("stdout", io::stdout())
    }

    pub fn stderr() -> Self {
        Self::named("stderr", io::stderr())
    }

    /// Wrap any writer (file, socket, buffer).
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::named("writer", writer)
    }

    fn named<W: Write + Send + 'static>(name: &'static str, writer: W) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether two handles point at the same stream.
    pub fn same_stream(&self, other: &Sink) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Write one serialized record.
    pub fn write_record(&self, line: &str) {
        let mut writer = self.inner.lock();
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    pub fn flush(&self) {
        let _ = self.inner.lock().flush();
    }
}

impl Default for Sink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("name", &self.name).finish()
    }
}

impl From<MemorySink> for Sink {
    fn from(memory: MemorySink) -> Self {
        Self::named("memory", memory)
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn last_line(&self) -> Option<String> {
        self.contents().lines().last().map(str::to_string)
    }

    /// Last record parsed as JSON, if there is one and it parses.
    pub fn last_json(&self) -> Option<serde_json::Value> {
        self.last_line()
            .and_then(|line| serde_json::from_str(&line).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
