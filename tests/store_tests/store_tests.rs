//! Tests for the store layer
//!
//! These tests verify:
//! - MemStore point operations and ordered range iteration
//! - PrefixStore namespacing and key stripping
//! - CacheStore overlay, commit and discard
//! - Snapshot save/load and corruption detection

use std::fs;

use atlasorm::{CacheStore, KVStore, MemStore, OrmError, PrefixStore};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn keys(
    store: &dyn KVStore,
    start: Option<&[u8]>,
    end: Option<&[u8]>,
    reverse: bool,
) -> Vec<Vec<u8>> {
    let it = if reverse {
        store.reverse_iterator(start, end).unwrap()
    } else {
        store.iterator(start, end).unwrap()
    };
    it.map(|item| item.unwrap().0).collect()
}

fn populated() -> MemStore {
    let store = MemStore::new();
    for key in [&b"a"[..], b"ab", b"b", b"ba", b"c"] {
        store.set(key, key).unwrap();
    }
    store
}

// =============================================================================
// MemStore Tests
// =============================================================================

#[test]
fn test_memstore_point_operations() {
    let store = MemStore::new();
    assert!(store.is_empty());

    store.set(b"k", b"v1").unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(b"v1".to_vec()));
    assert!(store.has(b"k").unwrap());

    store.set(b"k", b"v2").unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()));
    assert_eq!(store.len(), 1);

    store.delete(b"k").unwrap();
    assert_eq!(store.get(b"k").unwrap(), None);
    assert!(!store.has(b"k").unwrap());

    // deleting a missing key is a no-op
    store.delete(b"missing").unwrap();
}

#[test]
fn test_memstore_iteration_is_ordered_and_half_open() {
    let store = populated();

    assert_eq!(
        keys(&store, None, None, false),
        vec![b"a".to_vec(), b"ab".to_vec(), b"b".to_vec(), b"ba".to_vec(), b"c".to_vec()]
    );
    assert_eq!(
        keys(&store, Some(&b"ab"[..]), Some(&b"ba"[..]), false),
        vec![b"ab".to_vec(), b"b".to_vec()]
    );
    assert_eq!(
        keys(&store, Some(&b"ab"[..]), Some(&b"ba"[..]), true),
        vec![b"b".to_vec(), b"ab".to_vec()]
    );
    assert_eq!(
        keys(&store, Some(&b"b"[..]), None, false),
        vec![b"b".to_vec(), b"ba".to_vec(), b"c".to_vec()]
    );
}

#[test]
fn test_memstore_inverted_range_is_empty() {
    let store = populated();
    assert!(keys(&store, Some(&b"c"[..]), Some(&b"a"[..]), false).is_empty());
    assert!(keys(&store, Some(&b"b"[..]), Some(&b"b"[..]), true).is_empty());
}

#[test]
fn test_memstore_mutation_during_iteration() {
    let store = populated();
    for item in store.iterator(None, None).unwrap() {
        let (key, _) = item.unwrap();
        store.delete(&key).unwrap();
    }
    assert!(store.is_empty());
}

// =============================================================================
// PrefixStore Tests
// =============================================================================

#[test]
fn test_prefix_store_namespaces_keys() {
    let store = MemStore::new();
    let left = PrefixStore::new(&store, [0x01]);
    let right = PrefixStore::new(&store, [0x02]);

    left.set(b"x", b"left").unwrap();
    right.set(b"x", b"right").unwrap();

    assert_eq!(left.get(b"x").unwrap(), Some(b"left".to_vec()));
    assert_eq!(right.get(b"x").unwrap(), Some(b"right".to_vec()));
    assert_eq!(store.get(&[0x01, b'x']).unwrap(), Some(b"left".to_vec()));

    left.delete(b"x").unwrap();
    assert!(!left.has(b"x").unwrap());
    assert!(right.has(b"x").unwrap());
}

#[test]
fn test_prefix_store_scan_strips_prefix() {
    let store = MemStore::new();
    store.set(&[0x00, 9], b"before").unwrap();
    store.set(&[0x01, 1], b"one").unwrap();
    store.set(&[0x01, 2], b"two").unwrap();
    store.set(&[0x01, 3], b"three").unwrap();
    store.set(&[0x02, 0], b"after").unwrap();

    let scoped = PrefixStore::new(&store, [0x01]);
    assert_eq!(keys(&scoped, None, None, false), vec![vec![1u8], vec![2], vec![3]]);
    assert_eq!(keys(&scoped, None, None, true), vec![vec![3u8], vec![2], vec![1]]);
    assert_eq!(keys(&scoped, Some(&[2u8][..]), None, false), vec![vec![2u8], vec![3]]);
    assert_eq!(keys(&scoped, None, Some(&[3u8][..]), true), vec![vec![2u8], vec![1]]);
}

#[test]
fn test_prefix_store_high_prefix() {
    let store = MemStore::new();
    store.set(&[0xFF, 0xFF, 1], b"v").unwrap();
    store.set(&[0xFF, 0xFE], b"other").unwrap();

    let scoped = PrefixStore::new(&store, [0xFF, 0xFF]);
    assert_eq!(keys(&scoped, None, None, false), vec![vec![1u8]]);
}

// =============================================================================
// CacheStore Tests
// =============================================================================

#[test]
fn test_cache_store_overlays_parent() {
    let parent = populated();
    let cache = CacheStore::new(&parent);

    cache.set(b"aa", b"new").unwrap();
    cache.delete(b"b").unwrap();

    assert_eq!(cache.get(b"aa").unwrap(), Some(b"new".to_vec()));
    assert_eq!(cache.get(b"b").unwrap(), None);
    assert_eq!(cache.get(b"c").unwrap(), Some(b"c".to_vec()));

    assert_eq!(
        keys(&cache, Some(&b"a"[..]), Some(&b"c"[..]), false),
        vec![b"a".to_vec(), b"aa".to_vec(), b"ab".to_vec(), b"ba".to_vec()]
    );
    assert_eq!(
        keys(&cache, Some(&b"a"[..]), Some(&b"c"[..]), true),
        vec![b"ba".to_vec(), b"ab".to_vec(), b"aa".to_vec(), b"a".to_vec()]
    );

    // parent untouched until commit
    assert!(!parent.has(b"aa").unwrap());
    assert!(parent.has(b"b").unwrap());
}

#[test]
fn test_cache_store_write_and_discard() {
    let parent = MemStore::new();

    let cache = CacheStore::new(&parent);
    cache.set(b"kept", b"1").unwrap();
    assert_eq!(cache.pending_writes(), 1);
    cache.write().unwrap();
    assert_eq!(parent.get(b"kept").unwrap(), Some(b"1".to_vec()));

    let cache = CacheStore::new(&parent);
    cache.set(b"dropped", b"2").unwrap();
    cache.delete(b"kept").unwrap();
    cache.discard();
    assert!(!parent.has(b"dropped").unwrap());
    assert!(parent.has(b"kept").unwrap());
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.snapshot");

    let store = populated();
    store.set(&[0x10, 0, 0xFF], &[]).unwrap();
    assert_eq!(store.save_snapshot(&path).unwrap(), 6);

    let loaded = MemStore::load_snapshot(&path).unwrap();
    assert_eq!(loaded.entries(), store.entries());
}

#[test]
fn test_snapshot_empty_store() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.snapshot");

    MemStore::new().save_snapshot(&path).unwrap();
    assert!(MemStore::load_snapshot(&path).unwrap().is_empty());
}

#[test]
fn test_snapshot_detects_corruption() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.snapshot");
    populated().save_snapshot(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(MemStore::load_snapshot(&path), Err(OrmError::Storage(_))));
}

#[test]
fn test_snapshot_rejects_bad_magic_and_short_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.snapshot");

    fs::write(&path, b"NOPE").unwrap();
    assert!(matches!(MemStore::load_snapshot(&path), Err(OrmError::Storage(_))));

    let mut bytes = b"XXXX".to_vec();
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(MemStore::load_snapshot(&path), Err(OrmError::Storage(_))));
}

#[test]
fn test_snapshot_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let result = MemStore::load_snapshot(&temp.path().join("nope"));
    assert!(matches!(result, Err(OrmError::Io(_))));
}
