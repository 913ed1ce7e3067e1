//! # driftkv
//!
//! An embeddable key-value store organized as a Log-Structured Merge
//! (LSM) tree with TTL semantics and crash-recoverable durability.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                     Engine                     │
//! │  ┌────────────┐        ┌─────────────────────┐ │
//! │  │  MemTable  │        │  Segments (on disk) │ │
//! │  │  + WAL     │──flush▶│  newest shadows old │ │
//! │  └────────────┘        └──────────┬──────────┘ │
//! │                                   │ compact     │
//! │                                   ▼             │
//! │                         single merged Segment    │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`entry`] | The value tuple stored under every key |
//! | [`memtable`] | Bounded in-memory write buffer |
//! | [`wal`] | Full-rewrite write-ahead log |
//! | [`sstable`] | Immutable on-disk Segment format |
//! | [`metadata`] | Persisted engine configuration state |
//! | [`compaction`] | Merges all Segments into one |
//! | [`engine`] | Public façade — open, put, get, delete, list, stats, shutdown |
//!
//! ## Key Features
//!
//! - **Write-ahead logging** — every mutation is persisted before it
//!   acknowledges, guaranteeing crash recovery.
//! - **TTL expiry** — entries may carry an expiry; expired entries are
//!   swept lazily on lookup and dropped permanently on compaction.
//! - **Tombstone deletes** — deletions propagate through flush to
//!   Segments as tombstone entries, not physical removal.
//! - **Atomic durability** — every on-disk write goes through
//!   write-to-temp-then-rename.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use driftkv::engine::{Engine, EngineConfig};
//!
//! let config = EngineConfig {
//!     data_dir: "/tmp/my_db".into(),
//!     ..EngineConfig::default()
//! };
//!
//! let engine = Engine::open(config).unwrap();
//!
//! engine.put(b"hello", b"world".to_vec(), None).unwrap();
//! assert_eq!(engine.get(b"hello").unwrap().unwrap().value, Some(b"world".to_vec()));
//!
//! engine.delete(b"hello").unwrap();
//! assert!(engine.get(b"hello").unwrap().is_none());
//!
//! engine.shutdown();
//! ```

#![allow(dead_code)]

pub mod compaction;
pub mod engine;
pub mod entry;
pub mod memtable;
pub mod metadata;
pub mod sstable;
pub mod wal;

pub use engine::{Engine, EngineConfig, EngineError, EngineStats};
pub use entry::Entry;
