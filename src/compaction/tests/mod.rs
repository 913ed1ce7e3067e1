use super::compact;
use crate::entry::Entry;
use crate::sstable::Segment;
use tempfile::TempDir;

#[test]
fn zero_or_one_segment_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    assert!(compact(&[], dir.path(), 0).unwrap().is_none());

    let one = Segment::seal(vec![(b"a".to_vec(), Entry::new(b"1".to_vec(), 0, None))], 0);
    assert!(compact(&[one], dir.path(), 1).unwrap().is_none());
}

#[test]
fn later_segment_wins_on_overwrite() {
    let dir = TempDir::new().unwrap();
    let old = Segment::seal(vec![(b"k".to_vec(), Entry::new(b"old".to_vec(), 0, None))], 0);
    std::thread::sleep(std::time::Duration::from_millis(2));
    let new = Segment::seal(vec![(b"k".to_vec(), Entry::new(b"new".to_vec(), 0, None))], 1);

    let merged = compact(&[old, new], dir.path(), 2).unwrap().unwrap();
    assert_eq!(merged.lookup(b"k").unwrap().value, Some(b"new".to_vec()));
}

#[test]
fn tombstones_and_expired_entries_are_dropped() {
    let dir = TempDir::new().unwrap();
    let a = Segment::seal(
        vec![
            (b"live".to_vec(), Entry::new(b"1".to_vec(), 0, None)),
            (b"dead".to_vec(), Entry::tombstone(0)),
            (b"gone".to_vec(), Entry::new(b"x".to_vec(), 0, Some(1))),
        ],
        0,
    );
    std::thread::sleep(std::time::Duration::from_millis(5));
    let b = Segment::seal(vec![(b"other".to_vec(), Entry::new(b"2".to_vec(), 0, None))], 1);

    let merged = compact(&[a, b], dir.path(), 2).unwrap().unwrap();
    assert_eq!(merged.entry_count(), 2);
    assert!(merged.lookup(b"live").is_some());
    assert!(merged.lookup(b"other").is_some());
    assert!(merged.lookup(b"dead").is_none());
    assert!(merged.lookup(b"gone").is_none());
}

#[test]
fn compaction_result_is_persisted() {
    let dir = TempDir::new().unwrap();
    let a = Segment::seal(vec![(b"a".to_vec(), Entry::new(b"1".to_vec(), 0, None))], 0);
    let b = Segment::seal(vec![(b"b".to_vec(), Entry::new(b"2".to_vec(), 0, None))], 1);

    let merged = compact(&[a, b], dir.path(), 2).unwrap().unwrap();
    assert!(merged.path().unwrap().exists());
}
