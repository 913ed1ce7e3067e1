//! # Compaction Module
//!
//! Merges all existing Segments into one, reclaiming space held by
//! overwritten, tombstoned, or expired entries (§4.5).
//!
//! Triggered only by `segments.len() > max_segments` at the end of a
//! flush — there is no scheduled/background trigger and no size-tiered
//! bucketing; this engine keeps exactly the single "merge everything"
//! strategy the spec calls for.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::entry::{Entry, now_ms};
use crate::sstable::{Segment, SegmentError};

/// Errors returned by compaction.
#[derive(Debug, thiserror::Error)]
pub enum CompactionError {
    #[error("segment error: {0}")]
    Segment(#[from] SegmentError),
}

/// Merges `segments` (oldest first) into a single new Segment persisted
/// to `dir`.
///
/// Returns `None` if `segments.len() <= 1` (no-op per §4.5). On success,
/// returns the new Segment; the caller is responsible for discarding the
/// old Segment files and replacing the in-memory list — compaction
/// itself never mutates the input.
///
/// If persisting the merged Segment fails, the error is returned and the
/// input Segments are left completely untouched (they are never
/// consulted for deletion until persist of the replacement succeeds).
pub fn compact(
    segments: &[Segment],
    dir: &Path,
    seq: u64,
) -> Result<Option<Segment>, CompactionError> {
    if segments.len() <= 1 {
        return Ok(None);
    }

    let now = now_ms();
    let mut merged: HashMap<Vec<u8>, Entry> = HashMap::new();

    // Oldest to newest; later segments overwrite earlier ones for the
    // same key (segment order is the tie-breaker — §4.5 step 1).
    for segment in segments {
        for (key, entry) in segment.raw_entries() {
            merged.insert(key.clone(), entry.clone());
        }
    }

    let before = merged.len();
    merged.retain(|_, entry| !entry.is_tombstone() && !entry.is_expired(now));
    debug!(
        input_segments = segments.len(),
        before, after = merged.len(), "compaction dropped tombstones and expired entries"
    );

    let mut new_segment = Segment::seal(merged.into_iter().collect(), seq);
    new_segment.persist(dir)?;

    info!(
        new_segment_id = new_segment.id(),
        entries = new_segment.entry_count(),
        "compaction produced new segment"
    );

    Ok(Some(new_segment))
}
