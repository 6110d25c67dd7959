use parking_lot::Mutex;
use std::{
    fmt,
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::core::CompletionEntry;

/// Receives one entry per finished process. Called from the clock thread with
/// the state lock released; errors are logged by the caller and not retried.
pub trait CompletionSink: Send {
    fn append(&mut self, entry: &CompletionEntry) -> io::Result<()>;
}

impl fmt::Display for CompletionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PID: {}, Name: {}, CPU: {}, CPU Time: {:.2}, Arrival: {:.2}, Completion: {:.2}, \
             Turnaround: {:.2}, Waiting: {:.2}",
            self.pid,
            self.name,
            self.unit,
            self.cpu_time,
            self.arrival_time,
            self.completion_time,
            self.turnaround_time,
            self.waiting_time
        )
    }
}

/// Appends one line per completion, opening the file for each write.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CompletionSink for FileSink {
    fn append(&mut self, entry: &CompletionEntry) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{entry}")
    }
}

/// Keeps entries in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<CompletionEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<CompletionEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CompletionSink for MemorySink {
    fn append(&mut self, entry: &CompletionEntry) -> io::Result<()> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}
