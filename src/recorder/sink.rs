//! Destinations for traffic records.
//!
//! Each sink owns its own lock; a record is written with a single
//! `write_all` while the lock is held, so concurrent relays interleave at
//! whole-record granularity only.
//!
//! Writes are synchronous and run on the relaying task's worker thread.
//! Response records are capped at `MAX_LOGGED_BODY` bytes of body; request
//! records carry the whole request body.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A destination that accepts formatted traffic records.
pub trait RecordSink: Send + Sync {
    /// Short label used in diagnostics and metrics.
    fn name(&self) -> &str;

    /// Write one complete record.
    fn write_record(&self, record: &str) -> io::Result<()>;

    /// Flush and release the destination. Later writes become no-ops.
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Append-mode log file, opened once and closed once.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    /// Open (or create) `path` for appending. Missing parent directories are
    /// created.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), "Traffic log opened");

        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn write_record(&self, record: &str) -> io::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(file) => file.write_all(record.as_bytes()),
            None => Ok(()),
        }
    }

    fn close(&self) -> io::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = guard.take() {
            file.sync_all()?;
            tracing::debug!(path = %self.path.display(), "Traffic log closed");
        }
        Ok(())
    }
}

/// Process standard output.
pub struct ConsoleSink {
    out: Mutex<Stdout>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(io::stdout()),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write_record(&self, record: &str) -> io::Result<()> {
        let out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let mut handle = out.lock();
        handle.write_all(record.as_bytes())?;
        handle.flush()
    }

    fn close(&self) -> io::Result<()> {
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

/// In-memory sink for crate tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemorySink {
    records: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemorySink {
    pub(crate) fn records(&self) -> Vec<String> {
        self.records.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write_record(&self, record: &str) -> io::Result<()> {
        self.records.lock().unwrap().push(record.to_string());
        Ok(())
    }
}
