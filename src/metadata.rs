//! # Metadata File
//!
//! Persists the subset of engine configuration that must survive a
//! restart: currently just `default_ttl_ms`. Written on `shutdown` and
//! read back during recovery (§4.7, §6).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entry::now_ms;
use crate::wal::write_atomic;

/// Errors returned by metadata operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("metadata deserialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    #[serde(rename = "defaultTTL")]
    default_ttl: u64,
    #[serde(rename = "lastUpdated")]
    last_updated: u64,
}

/// Engine configuration state persisted alongside the WAL and Segments.
pub struct Metadata {
    path: PathBuf,
}

impl Metadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads `default_ttl_ms` from the metadata file, if present.
    pub fn load_default_ttl(&self) -> Result<Option<u64>, MetadataError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let parsed: MetadataFile = serde_json::from_slice(&bytes)?;
        Ok(Some(parsed.default_ttl))
    }

    /// Persists `default_ttl_ms`, stamped with the current time.
    pub fn persist(&self, default_ttl_ms: u64) -> Result<(), MetadataError> {
        let file = MetadataFile {
            default_ttl: default_ttl_ms,
            last_updated: now_ms(),
        };
        let bytes = serde_json::to_vec(&file)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
