//! Append-only NDJSON export of audit entries.
//!
//! The in-memory log only keeps the most recent window. [`NdjsonSink`] is
//! a middleware that writes entries to a file as one JSON object per line,
//! either as they are appended or only as they are evicted.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use custodia_types::CustodiaError;

use crate::entry::AuditEntry;
use crate::middleware::AuditMiddleware;

/// Append-only NDJSON writer.
///
/// Each call to [`append`](NdjsonWriter::append) writes one JSON line and
/// flushes, so a reader never sees a partial entry.
pub struct NdjsonWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl NdjsonWriter {
    /// Open or create the NDJSON file for appending.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append a serializable value as a JSON line.
    pub fn append<T: serde::Serialize>(&mut self, value: &T) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, value).map_err(std::io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Which entries an [`NdjsonSink`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Every entry, as it is appended.
    All,
    /// Only entries leaving the in-memory window.
    Evicted,
}

/// Middleware that mirrors audit entries to an NDJSON file.
///
/// Write failures are logged and dropped; the in-memory log is never
/// affected by export problems.
pub struct NdjsonSink {
    writer: Mutex<NdjsonWriter>,
    mode: ExportMode,
}

impl NdjsonSink {
    pub fn open(path: impl AsRef<Path>, mode: ExportMode) -> Result<Self, CustodiaError> {
        let writer = NdjsonWriter::open(path.as_ref()).map_err(|e| {
            CustodiaError::LedgerError(format!(
                "failed to open audit export {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(Self {
            writer: Mutex::new(writer),
            mode,
        })
    }

    fn write(&self, entry: &AuditEntry) {
        let mut writer = match self.writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writer.append(entry) {
            tracing::warn!(
                path = %writer.path().display(),
                sequence = entry.sequence,
                error = %e,
                "failed to export audit entry"
            );
        }
    }

    /// Read back every entry written to an NDJSON export, in file order.
    pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, CustodiaError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            CustodiaError::LedgerError(format!("failed to open {}: {e}", path.display()))
        })?;

        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                CustodiaError::LedgerError(format!("read failed at line {}: {e}", lineno + 1))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| {
                CustodiaError::LedgerError(format!("bad entry at line {}: {e}", lineno + 1))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl AuditMiddleware for NdjsonSink {
    fn on_entry(&self, entry: &AuditEntry) {
        if self.mode == ExportMode::All {
            self.write(entry);
        }
    }

    fn on_evict(&self, entry: &AuditEntry) {
        if self.mode == ExportMode::Evicted {
            self.write(entry);
        }
    }
}
