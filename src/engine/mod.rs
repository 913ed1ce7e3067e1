//! # Engine Façade
//!
//! Ties together the MemTable, WAL, Segment list, and Metadata file into
//! the single public surface this crate exposes: `put`, `get`, `delete`,
//! `list`, `stats`, `shutdown`.
//!
//! ## Concurrency model
//!
//! Single-writer. All mutable state lives behind one `RwLock`; readers
//! take a read lock, mutators take a write lock for the whole
//! "mutate MemTable → rewrite WAL → maybe flush → maybe compact"
//! sequence, which is atomic with respect to other mutators (§5).
//! `get` and `list` also need exclusive access because MemTable lookup
//! performs lazy-expiration sweeps, so they take the write lock too —
//! the simplest correct model, not the richest possible sharing.
//!
//! ## Recovery
//!
//! `Engine::open` reads metadata, replays the WAL into the MemTable,
//! and loads every segment file it finds, skipping and logging any it
//! cannot parse. Recovery never deletes a file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compaction::{self, CompactionError};
use crate::entry::{now_ms, Entry};
use crate::memtable::MemTable;
use crate::metadata::{Metadata, MetadataError};
use crate::sstable::{Segment, SegmentError};
use crate::wal::{Wal, WalError};

#[cfg(test)]
mod tests;

/// Errors surfaced by the engine façade.
///
/// This is the public error vocabulary (§7): every subsystem error is
/// either an I/O failure, a corrupt segment, or an invalid argument, so
/// each subsystem's own error enum is folded into one of those three
/// shapes via `#[from]` where the wrapped error is itself an I/O or
/// parse failure.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Any filesystem operation failure (WAL, segment, metadata, directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A segment file could not be parsed.
    #[error("corrupt segment: {0}")]
    CorruptSegment(#[from] SegmentError),

    /// WAL file could not be written or parsed.
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    /// Metadata file could not be written or parsed.
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Compaction failed to persist its merged segment.
    #[error("compaction error: {0}")]
    Compaction(#[from] CompactionError),

    /// Empty key, or any other caller-supplied value the engine rejects
    /// outright rather than acting on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal invariant violation (poisoned lock, unexpected state, etc.).
    /// Per §7, the engine prefers a returned error over a panic even here.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Maps a poisoned-lock error to the engine's error vocabulary (§7: no
/// panics, degraded availability over process termination).
fn lock_poisoned<T>(_: std::sync::PoisonError<T>) -> EngineError {
    EngineError::Internal("RwLock poisoned".into())
}

/// Configuration for an [`Engine`] instance (§3, §6, §10.3).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// MemTable capacity, in entries, before a flush is triggered.
    pub memtable_max_size: usize,
    /// Segment count threshold: once exceeded after a flush, compaction runs.
    pub max_segments: usize,
    /// Default TTL applied to a `put` that does not specify one. `0` means
    /// "never expires".
    pub default_ttl_ms: u64,
    /// Directory the engine persists its WAL, segments, and metadata under.
    pub data_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memtable_max_size: 1000,
            max_segments: 10,
            default_ttl_ms: 60_000,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Snapshot of engine statistics returned by [`Engine::stats`] (§4.6).
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub memtable_size: usize,
    pub segments_count: usize,
    pub total_entries: usize,
    pub default_ttl: u64,
    pub on_disk_segment_files: usize,
    pub data_dir: PathBuf,
}

struct EngineInner {
    memtable: MemTable,
    segments: Vec<Segment>,
    wal: Wal,
    metadata: Metadata,
    config: EngineConfig,
    /// Creation-order counter handed to the next sealed Segment, so ties on
    /// `created_at` (two flushes in the same millisecond) still sort
    /// correctly on reopen. Seeded from the highest `seq` found on disk.
    next_segment_seq: u64,
}

/// The main storage engine handle.
///
/// Cheap to clone — clones share the same underlying state via
/// `Arc<RwLock<_>>`.
pub struct Engine {
    inner: Arc<RwLock<EngineInner>>,
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Engine {
    /// Opens (or creates) an engine rooted at `config.data_dir`, replaying
    /// the WAL and loading every segment file found there (§4.7).
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        if config.memtable_max_size == 0 {
            return Err(EngineError::InvalidArgument(
                "memtable_max_size must be > 0".into(),
            ));
        }
        if config.max_segments == 0 {
            return Err(EngineError::InvalidArgument(
                "max_segments must be > 0".into(),
            ));
        }

        fs::create_dir_all(&config.data_dir)?;

        let metadata = Metadata::new(config.data_dir.join("metadata.json"));
        let default_ttl_ms = metadata.load_default_ttl()?.unwrap_or(config.default_ttl_ms);

        let wal = Wal::new(config.data_dir.join("wal.json"));
        let wal_pairs = wal.load()?;
        let mut memtable = MemTable::new(config.memtable_max_size);
        if !wal_pairs.is_empty() {
            memtable.load_pairs(wal_pairs);
        }

        let mut segments = load_segments(&config.data_dir)?;
        segments.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.seq().cmp(&b.seq())));
        let next_segment_seq = segments.iter().map(Segment::seq).max().map_or(0, |s| s + 1);

        info!(
            segments = segments.len(),
            memtable_entries = memtable.size(),
            data_dir = %config.data_dir.display(),
            "engine recovered"
        );

        let config = EngineConfig {
            default_ttl_ms,
            ..config
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(EngineInner {
                memtable,
                segments,
                wal,
                metadata,
                config,
                next_segment_seq,
            })),
        })
    }

    /// Inserts `key`/`value`. `ttl_ms = None` defers to the engine's
    /// `default_ttl_ms`; `ttl_ms = Some(0)` means "never expires" (§4.6).
    pub fn put(&self, key: &[u8], value: Vec<u8>, ttl_ms: Option<u64>) -> Result<(), EngineError> {
        if key.is_empty() {
            return Err(EngineError::InvalidArgument("key must not be empty".into()));
        }

        let mut inner = self.inner.write().map_err(lock_poisoned)?;
        let effective_ttl = ttl_ms.unwrap_or(inner.config.default_ttl_ms);
        let full = inner.memtable.insert(key.to_vec(), Some(value), Some(effective_ttl));
        inner.wal.rewrite(&inner.memtable.snapshot_pairs())?;

        if full {
            flush(&mut inner)?;
        }
        Ok(())
    }

    /// Removes `key` by inserting a tombstone. Always succeeds, even if
    /// the key is absent (§4.6).
    pub fn delete(&self, key: &[u8]) -> Result<(), EngineError> {
        if key.is_empty() {
            return Err(EngineError::InvalidArgument("key must not be empty".into()));
        }

        let mut inner = self.inner.write().map_err(lock_poisoned)?;
        let full = inner.memtable.insert(key.to_vec(), None, None);
        inner.wal.rewrite(&inner.memtable.snapshot_pairs())?;

        if full {
            flush(&mut inner)?;
        }
        Ok(())
    }

    /// Looks up `key`: MemTable first, then Segments newest-to-oldest
    /// (§4.6). A tombstone or an expired Entry is reported as a miss.
    ///
    /// Reads the MemTable via [`MemTable::peek`], not the mutating
    /// [`MemTable::lookup`]: a key the MemTable has ever seen shadows
    /// every Segment, so an expired MemTable entry must resolve as a
    /// miss, not fall through to an older, still-live Segment value —
    /// which is exactly what sweeping the MemTable entry away would
    /// allow on a later call.
    pub fn get(&self, key: &[u8]) -> Result<Option<Entry>, EngineError> {
        let inner = self.inner.write().map_err(lock_poisoned)?;

        if let Some(entry) = inner.memtable.peek(key) {
            return Ok(if entry.is_live(now_ms()) { Some(entry) } else { None });
        }

        for segment in inner.segments.iter().rev() {
            if let Some(entry) = segment.lookup(key) {
                return Ok(if entry.is_tombstone() { None } else { Some(entry) });
            }
        }

        Ok(None)
    }

    /// Merge-view of every live (non-expired, non-tombstone) key (§4.6).
    pub fn list(&self) -> Result<Vec<(Vec<u8>, Entry)>, EngineError> {
        let mut inner = self.inner.write().map_err(lock_poisoned)?;
        Ok(merged_live_view(&mut inner))
    }

    /// Snapshot of engine statistics (§4.6).
    pub fn stats(&self) -> Result<EngineStats, EngineError> {
        let mut inner = self.inner.write().map_err(lock_poisoned)?;
        let total_entries = merged_live_view(&mut inner).len();
        let on_disk_segment_files = count_segment_files(&inner.config.data_dir)?;

        Ok(EngineStats {
            memtable_size: inner.memtable.size(),
            segments_count: inner.segments.len(),
            total_entries,
            default_ttl: inner.config.default_ttl_ms,
            on_disk_segment_files,
            data_dir: inner.config.data_dir.clone(),
        })
    }

    /// Force-flushes any non-empty MemTable and persists metadata.
    /// Idempotent and best-effort: failures are logged, never returned,
    /// per §7's "shutdown never throws" policy.
    pub fn shutdown(&self) {
        match self.inner.write() {
            Ok(mut inner) => best_effort_shutdown(&mut inner),
            Err(e) => warn!("shutdown: {}", lock_poisoned(e)),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_write() {
            best_effort_shutdown(&mut inner);
        }
    }
}

fn best_effort_shutdown(inner: &mut EngineInner) {
    if !inner.memtable.is_empty() {
        if let Err(e) = flush(inner) {
            warn!(error = %e, "shutdown: flush failed, continuing best-effort");
        }
    }
    if let Err(e) = inner.metadata.persist(inner.config.default_ttl_ms) {
        warn!(error = %e, "shutdown: metadata persist failed");
    }
}

/// Promotes the MemTable to a new Segment and truncates the WAL (§4.4).
/// No-op if the MemTable is empty (flush is idempotent, invariant 6).
fn flush(inner: &mut EngineInner) -> Result<(), EngineError> {
    if inner.memtable.is_empty() {
        return Ok(());
    }

    let pairs = inner.memtable.snapshot_pairs();
    let mut segment = Segment::seal(pairs, inner.next_segment_seq);
    inner.next_segment_seq += 1;
    segment.persist(&inner.config.data_dir)?;

    inner.segments.push(segment);
    inner.memtable.clear();

    if let Err(e) = inner.wal.truncate() {
        warn!(error = %e, "WAL truncate failed after flush; recovery will replay stale WAL entries, which MemTable shadowing makes harmless");
        return Err(e.into());
    }

    debug!(segments = inner.segments.len(), "flush complete");

    if inner.segments.len() > inner.config.max_segments {
        if let Err(e) = run_compaction(inner) {
            warn!(error = %e, "compaction failed; triggering flush still succeeds");
        }
    }

    Ok(())
}

/// Merges all Segments into one and replaces them (§4.5). Compaction
/// errors are the caller's to swallow — a failed compaction must not
/// fail the flush that triggered it.
fn run_compaction(inner: &mut EngineInner) -> Result<(), EngineError> {
    let seq = inner.next_segment_seq;
    let Some(new_segment) = compaction::compact(&inner.segments, &inner.config.data_dir, seq)?
    else {
        return Ok(());
    };
    inner.next_segment_seq += 1;

    for old in &inner.segments {
        if let Err(e) = old.discard() {
            warn!(segment_id = old.id(), error = %e, "failed to discard superseded segment");
        }
    }

    info!(
        new_segment_id = new_segment.id(),
        entries = new_segment.entry_count(),
        "compaction collapsed segments"
    );
    inner.segments = vec![new_segment];
    Ok(())
}

/// Accumulates oldest-segment-to-newest, then applies the MemTable on
/// top, then drops tombstones and expired entries (§4.6 `list` algorithm).
fn merged_live_view(inner: &mut EngineInner) -> Vec<(Vec<u8>, Entry)> {
    let now = now_ms();
    let mut merged: HashMap<Vec<u8>, Entry> = HashMap::new();

    for segment in &inner.segments {
        for (key, entry) in segment.raw_entries() {
            merged.insert(key.clone(), entry.clone());
        }
    }
    for (key, entry) in inner.memtable.snapshot_pairs() {
        merged.insert(key, entry);
    }

    merged.retain(|_, entry| entry.is_live(now));
    merged.into_iter().collect()
}

fn load_segments(data_dir: &Path) -> Result<Vec<Segment>, EngineError> {
    let mut segments = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_segment_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("sstable_") && n.ends_with(".json"));
        if !is_segment_file {
            continue;
        }

        match Segment::load(&path) {
            Ok(segment) => segments.push(segment),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unparseable segment file"),
        }
    }
    Ok(segments)
}

fn count_segment_files(data_dir: &Path) -> Result<usize, std::io::Error> {
    let count = fs::read_dir(data_dir)?
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("sstable_") && n.ends_with(".json"))
        })
        .count();
    Ok(count)
}
