use super::*;
use tempfile::TempDir;

fn config(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        memtable_max_size: 4,
        max_segments: 2,
        default_ttl_ms: 60_000,
        data_dir: dir.path().to_path_buf(),
    }
}

#[test]
fn basic_round_trip() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();

    engine.put(b"a", b"1".to_vec(), None).unwrap();
    engine.put(b"b", b"2".to_vec(), None).unwrap();

    assert_eq!(engine.get(b"a").unwrap().unwrap().value, Some(b"1".to_vec()));
    assert!(engine.get(b"c").unwrap().is_none());

    let list = engine.list().unwrap();
    assert_eq!(list.len(), 2);
}

#[test]
fn flush_at_capacity() {
    let dir = TempDir::new().unwrap();
    let cfg = EngineConfig {
        memtable_max_size: 2,
        ..config(&dir)
    };
    let engine = Engine::open(cfg).unwrap();

    engine.put(b"k1", b"v1".to_vec(), None).unwrap();
    engine.put(b"k2", b"v2".to_vec(), None).unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.memtable_size, 0);
    assert_eq!(stats.segments_count, 1);
    assert_eq!(stats.on_disk_segment_files, 1);
    assert_eq!(engine.get(b"k1").unwrap().unwrap().value, Some(b"v1".to_vec()));
}

#[test]
fn tombstone_shadowing() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();

    engine.put(b"k", b"old".to_vec(), None).unwrap();
    engine.shutdown();
    drop(engine);

    let engine = Engine::open(config(&dir)).unwrap();
    engine.delete(b"k").unwrap();

    assert!(engine.get(b"k").unwrap().is_none());
    assert!(engine.list().unwrap().iter().all(|(k, _)| k != b"k"));
}

#[test]
fn ttl_expiry() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();

    engine.put(b"e", b"x".to_vec(), Some(50)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(100));

    assert!(engine.get(b"e").unwrap().is_none());
    assert!(engine.list().unwrap().iter().all(|(k, _)| k != b"e"));
}

#[test]
fn crash_recovery_replays_wal() {
    let dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&dir)).unwrap();
        engine.put(b"p", b"q".to_vec(), None).unwrap();
        // No shutdown(): simulates a crash, engine drops and flushes on Drop
        // only if try_write succeeds; here it's the sole owner so it will.
        // To truly simulate a crash (no flush), forget the engine instead.
        std::mem::forget(engine);
    }

    let engine = Engine::open(config(&dir)).unwrap();
    assert_eq!(engine.get(b"p").unwrap().unwrap().value, Some(b"q".to_vec()));
    assert_eq!(engine.stats().unwrap().memtable_size, 1);
}

#[test]
fn compaction_trigger_collapses_segments() {
    let dir = TempDir::new().unwrap();
    let cfg = EngineConfig {
        memtable_max_size: 1,
        max_segments: 2,
        ..config(&dir)
    };
    let engine = Engine::open(cfg).unwrap();

    engine.put(b"a", b"1".to_vec(), None).unwrap();
    engine.put(b"b", b"2".to_vec(), None).unwrap();
    engine.put(b"c", b"3".to_vec(), None).unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.segments_count, 1);
    assert_eq!(stats.on_disk_segment_files, 1);
    assert_eq!(engine.list().unwrap().len(), 3);
}

#[test]
fn open_rejects_zero_memtable_size() {
    let dir = TempDir::new().unwrap();
    let cfg = EngineConfig {
        memtable_max_size: 0,
        ..config(&dir)
    };
    assert!(matches!(
        Engine::open(cfg),
        Err(EngineError::InvalidArgument(_))
    ));
}

#[test]
fn put_rejects_empty_key() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    assert!(matches!(
        engine.put(b"", b"v".to_vec(), None),
        Err(EngineError::InvalidArgument(_))
    ));
}

#[test]
fn shutdown_leaves_memtable_empty_on_disk() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    engine.put(b"a", b"1".to_vec(), None).unwrap();
    engine.shutdown();

    let wal_bytes = std::fs::read(dir.path().join("wal.json")).unwrap();
    let wal_text = String::from_utf8(wal_bytes).unwrap();
    assert!(wal_text.contains("\"memTable\":[]"));
}

#[test]
fn get_and_list_agree_when_memtable_entry_expires_over_a_live_segment() {
    let dir = TempDir::new().unwrap();
    let cfg = EngineConfig {
        memtable_max_size: 2,
        ..config(&dir)
    };
    let engine = Engine::open(cfg).unwrap();

    // Seal "k" (long TTL) and a filler key into a Segment via flush.
    engine.put(b"x", b"v0".to_vec(), Some(60_000)).unwrap();
    engine.put(b"k", b"old".to_vec(), Some(60_000)).unwrap();

    // Overwrite "k" in the fresh MemTable with a short TTL.
    engine.put(b"k", b"new".to_vec(), Some(50)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(100));

    // The MemTable's own (now-expired) write for "k" is the last put;
    // it must shadow the Segment's still-live "old" value as a miss.
    assert!(engine.get(b"k").unwrap().is_none());
    assert!(engine.list().unwrap().iter().all(|(key, _)| key != b"k"));
}

#[test]
fn corrupt_segment_is_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("sstable_bad.json"), b"not json").unwrap();

    let engine = Engine::open(config(&dir)).unwrap();
    assert_eq!(engine.stats().unwrap().segments_count, 0);
    assert!(dir.path().join("sstable_bad.json").exists());
}
