//! # Write-Ahead Log
//!
//! A durable, full-snapshot write-ahead log for the engine's MemTable.
//!
//! Unlike an append-only WAL, this log is **rewritten in full** after
//! every mutation: the entire current MemTable contents are serialized
//! and written back to the same file. This keeps the on-disk format
//! trivial (a single JSON document) and keeps recovery `O(MemTable
//! size)`, at the cost of `O(MemTable size)` write amplification per
//! mutation — `memtable_max_size` bounds that cost.
//!
//! ## On-disk format
//!
//! A single JSON document:
//!
//! ```json
//! { "timestamp": 1699999999999, "memTable": [["key", {"value": ..., "expires_at": ..., "timestamp": ...}], ...] }
//! ```
//!
//! `timestamp` is informational only (when the snapshot was taken).
//!
//! ## Durability
//!
//! Every rewrite is written to a temporary file in the same directory
//! and then renamed into place, so a crash mid-rewrite leaves either the
//! previous WAL contents or the new ones on disk — never a half-written
//! file.

#[cfg(test)]
mod tests;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::entry::{Entry, now_ms};

/// Errors returned by WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// Underlying filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The WAL file could not be parsed as the expected JSON schema.
    #[error("WAL deserialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct WalFile {
    timestamp: u64,
    #[serde(rename = "memTable")]
    mem_table: Vec<(Vec<u8>, Entry)>,
}

/// A full-rewrite write-ahead log backing a single MemTable.
///
/// The log has no in-memory state beyond its path: every operation reads
/// or writes the whole file, which is exactly what the "rewrite in full"
/// design calls for (there is nothing to cache between calls).
#[derive(Debug)]
pub struct Wal {
    path: PathBuf,
}

impl Wal {
    /// Points a `Wal` at `path`. Does not touch the filesystem; the file
    /// is created lazily on the first [`Wal::rewrite`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying WAL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the WAL's current contents, if the file exists and is
    /// non-empty. Absent or empty means the MemTable was empty (invariant
    /// §3.1).
    pub fn load(&self) -> Result<Vec<(Vec<u8>, Entry)>, WalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }

        let parsed: WalFile = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), entries = parsed.mem_table.len(), "WAL loaded");
        Ok(parsed.mem_table)
    }

    /// Rewrites the WAL in full with the given MemTable snapshot.
    ///
    /// Writes to a temporary file in the same directory and renames it
    /// into place, so a crash mid-write never leaves a half-written WAL.
    pub fn rewrite(&self, pairs: &[(Vec<u8>, Entry)]) -> Result<(), WalError> {
        let file = WalFile {
            timestamp: now_ms(),
            mem_table: pairs.to_vec(),
        };
        let bytes = serde_json::to_vec(&file)?;

        write_atomic(&self.path, &bytes)?;
        trace!(path = %self.path.display(), entries = pairs.len(), "WAL rewritten");
        Ok(())
    }

    /// Rewrites the WAL as empty. Called after a successful flush.
    pub fn truncate(&self) -> Result<(), WalError> {
        self.rewrite(&[])?;
        debug!(path = %self.path.display(), "WAL truncated");
        Ok(())
    }
}

/// Writes `bytes` to `path` via write-to-temp + rename, so the
/// replacement is atomic with respect to crashes and concurrent readers.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("file"),
        std::process::id()
    );
    let tmp_path = dir.join(tmp_name);

    fs::write(&tmp_path, bytes)?;
    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "atomic rename failed, cleaning up temp file");
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}
