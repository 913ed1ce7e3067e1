//! # Segment (SSTable) Module
//!
//! An immutable, on-disk snapshot of a sealed MemTable.
//!
//! A Segment is identified by a unique `id` (timestamp plus randomness,
//! used only to keep filenames unique — never for ordering) and carries
//! a `created_at` timestamp that *is* the ordering key among Segments:
//! later Segments shadow earlier ones for the same key (invariant §3.2).
//! `seq` breaks ties when two Segments share a `created_at` millisecond;
//! it is assigned by the engine in strict creation order, so sorting by
//! `(created_at, seq)` is deterministic across reopens even under clock
//! coalescing, unlike sorting on the random `id`.
//!
//! ## On-disk format
//!
//! A single JSON document per file, named `sstable_<id>.json`:
//!
//! ```json
//! { "id": "...", "created_at": 1699999999999, "seq": 3, "entries": [["key", {"value": ..., "expires_at": ..., "timestamp": ...}], ...] }
//! ```
//!
//! A Segment is immutable after construction: no operation mutates its
//! entries, and [`Segment::persist`] is the only way its bytes reach disk.


use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::entry::{Entry, now_ms};
use crate::wal::write_atomic;

/// Errors returned by Segment operations.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Underlying filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The segment file could not be parsed as the expected JSON schema;
    /// the caller should skip the file and continue (see [`crate::engine`]
    /// recovery, which tolerates corrupt segments).
    #[error("corrupt segment at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize a segment being persisted (not a corruption —
    /// the in-memory data itself could not be encoded).
    #[error("segment serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct SegmentFile {
    id: String,
    created_at: u64,
    seq: u64,
    entries: Vec<(Vec<u8>, Entry)>,
}

/// An immutable, on-disk snapshot of a sealed MemTable.
#[derive(Debug, Clone)]
pub struct Segment {
    id: String,
    created_at: u64,
    seq: u64,
    entries: Vec<(Vec<u8>, Entry)>,
    /// Populated once the segment has been persisted or loaded from disk;
    /// `None` for a segment that only exists in memory so far.
    path: Option<PathBuf>,
}

impl Segment {
    /// Seals `entries` into a new in-memory Segment with a fresh identifier
    /// and `created_at = now`. `seq` is the engine's creation-order counter,
    /// used to break `created_at` ties. Not yet durable until
    /// [`Segment::persist`].
    pub fn seal(entries: Vec<(Vec<u8>, Entry)>, seq: u64) -> Self {
        let created_at = now_ms();
        Self {
            id: generate_id(created_at),
            created_at,
            seq,
            entries,
            path: None,
        }
    }

    /// Unique identifier (for filename uniqueness only, not ordering).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The ordering key among Segments — later Segments shadow earlier ones.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Creation-order tiebreaker for Segments sharing a `created_at`.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Number of entries sealed into this segment (tombstones and expired
    /// entries included — this is a raw count, not a liveness count).
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// On-disk path, once persisted or loaded.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Looks up `key`. Returns the entry if present and not expired.
    /// Never mutates the segment — an expired entry is simply reported as
    /// a miss, not swept (the segment is immutable; compaction is the
    /// only thing that removes expired entries from disk).
    pub fn lookup(&self, key: &[u8]) -> Option<Entry> {
        let now = now_ms();
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, e)| e.clone())
            .filter(|e| !e.is_expired(now))
    }

    /// Returns all non-expired entries (tombstones included — callers
    /// filter those out as needed).
    pub fn list(&self) -> Vec<(Vec<u8>, Entry)> {
        let now = now_ms();
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .cloned()
            .collect()
    }

    /// Raw entries, tombstones and expired entries included. Used by the
    /// compactor, which needs to see everything to decide what to drop.
    pub fn raw_entries(&self) -> &[(Vec<u8>, Entry)] {
        &self.entries
    }

    /// Writes this segment to `dir` under `sstable_<id>.json`, via
    /// write-to-temp + rename so the file is complete-or-absent under a
    /// crash — never a partial segment.
    pub fn persist(&mut self, dir: &Path) -> Result<(), SegmentError> {
        let path = dir.join(format!("sstable_{}.json", self.id));
        let file = SegmentFile {
            id: self.id.clone(),
            created_at: self.created_at,
            seq: self.seq,
            entries: self.entries.clone(),
        };
        let bytes = serde_json::to_vec(&file)?;
        write_atomic(&path, &bytes)?;
        self.path = Some(path);
        Ok(())
    }

    /// Loads a segment file from `path`. Returns [`SegmentError::Corrupt`]
    /// for malformed content so the caller (engine recovery) can log and
    /// skip it rather than fail outright.
    pub fn load(path: &Path) -> Result<Self, SegmentError> {
        let bytes = fs::read(path)?;
        let parsed: SegmentFile =
            serde_json::from_slice(&bytes).map_err(|source| SegmentError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            id: parsed.id,
            created_at: parsed.created_at,
            seq: parsed.seq,
            entries: parsed.entries,
            path: Some(path.to_path_buf()),
        })
    }

    /// Removes the backing file from disk, if persisted. A no-op for a
    /// segment that was never persisted.
    pub fn discard(&self) -> Result<(), SegmentError> {
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(path = %path.display(), "segment file already gone on discard");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn generate_id(created_at: u64) -> String {
    let suffix: u32 = rand::rng().random();
    format!("{created_at:013x}-{suffix:08x}")
}
