//! Object Registry Tests
//!
//! Tests verify:
//! - Create / append / read / stat / delete behavior on a single thread
//! - Range clipping
//! - Object id validation and file layout
//! - Idle handle sweeping

use atlasblob::registry::ObjectRegistry;
use atlasblob::{BlobError, ByteRange};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, ObjectRegistry) {
    let dir = TempDir::new().unwrap();
    let registry = ObjectRegistry::open(dir.path(), false).unwrap();
    (dir, registry)
}

fn read_range(registry: &ObjectRegistry, id: &[u8], range: ByteRange) -> Vec<u8> {
    let mut out = Vec::new();
    let copied = registry.read(id, range, &mut out).unwrap();
    assert_eq!(copied, out.len() as u64);
    out
}

fn read_all(registry: &ObjectRegistry, id: &[u8]) -> Vec<u8> {
    read_range(registry, id, ByteRange::full())
}

// =============================================================================
// Missing Object Tests
// =============================================================================

#[test]
fn test_read_missing_object() {
    let (_dir, registry) = setup();

    let mut out = Vec::new();
    let result = registry.read(b"nothing", ByteRange::full(), &mut out);

    assert!(matches!(result, Err(BlobError::NotFound)));
    assert!(out.is_empty());
}

#[test]
fn test_stat_missing_object() {
    let (_dir, registry) = setup();
    assert!(matches!(registry.stat(b"nothing"), Err(BlobError::NotFound)));
}

#[test]
fn test_delete_missing_object() {
    let (_dir, registry) = setup();
    assert!(matches!(registry.delete(b"nothing"), Err(BlobError::NotFound)));

    // The failed delete must not leave a tombstone behind
    registry.create(b"nothing", b"now").unwrap();
    assert_eq!(read_all(&registry, b"nothing"), b"now");
}

#[test]
fn test_failed_read_leaves_no_handle() {
    let (_dir, registry) = setup();

    let mut out = Vec::new();
    let _ = registry.read(b"nothing", ByteRange::full(), &mut out);

    assert_eq!(registry.live_count(), 0);
    assert!(!registry.path_for(b"nothing").unwrap().exists());
}

// =============================================================================
// Create / Append Tests
// =============================================================================

#[test]
fn test_create_and_read() {
    let (_dir, registry) = setup();

    registry.create(b"doc", b"contents").unwrap();

    assert_eq!(read_all(&registry, b"doc"), b"contents");
    assert_eq!(registry.stat(b"doc").unwrap(), 8);
}

#[test]
fn test_create_empty_object() {
    let (_dir, registry) = setup();

    registry.create(b"empty", b"").unwrap();

    assert_eq!(registry.stat(b"empty").unwrap(), 0);
    assert!(read_all(&registry, b"empty").is_empty());
}

#[test]
fn test_append_creates_and_extends() {
    let (_dir, registry) = setup();

    let first = registry.append(b"log", b"hello").unwrap();
    let second = registry.append(b"log", b"world").unwrap();

    assert_eq!(first, ByteRange::new(0, Some(5)));
    assert_eq!(second, ByteRange::new(5, Some(5)));
    assert_eq!(read_all(&registry, b"log"), b"helloworld");
    assert_eq!(read_range(&registry, b"log", second), b"world");
}

#[test]
fn test_append_ranges_are_contiguous() {
    let (_dir, registry) = setup();

    let mut expected_offset = 0;
    let mut expected = Vec::new();
    for i in 0..20 {
        let chunk = format!("chunk-{}|", i);
        let range = registry.append(b"log", chunk.as_bytes()).unwrap();

        assert_eq!(range.offset, expected_offset);
        assert_eq!(range.length, Some(chunk.len() as u64));

        expected_offset += chunk.len() as u64;
        expected.extend_from_slice(chunk.as_bytes());
    }

    assert_eq!(registry.stat(b"log").unwrap(), expected_offset);
    assert_eq!(read_all(&registry, b"log"), expected);
}

#[test]
fn test_create_twice_keeps_first_content() {
    let (_dir, registry) = setup();

    registry.create(b"doc", b"first").unwrap();
    let result = registry.create(b"doc", b"second");

    assert!(matches!(result, Err(BlobError::AlreadyExists)));
    assert_eq!(read_all(&registry, b"doc"), b"first");
}

#[test]
fn test_create_after_append_fails() {
    let (_dir, registry) = setup();

    registry.append(b"doc", b"appended").unwrap();

    assert!(matches!(
        registry.create(b"doc", b"created"),
        Err(BlobError::AlreadyExists)
    ));
    assert_eq!(read_all(&registry, b"doc"), b"appended");
}

#[test]
fn test_create_over_existing_file_without_handle() {
    let dir = TempDir::new().unwrap();

    {
        let registry = ObjectRegistry::open(dir.path(), false).unwrap();
        registry.create(b"doc", b"persisted").unwrap();
    }

    let registry = ObjectRegistry::open(dir.path(), false).unwrap();
    assert_eq!(registry.live_count(), 0);

    assert!(matches!(
        registry.create(b"doc", b"again"),
        Err(BlobError::AlreadyExists)
    ));
    assert_eq!(read_all(&registry, b"doc"), b"persisted");
}

#[test]
fn test_append_to_existing_file_without_handle() {
    let dir = TempDir::new().unwrap();

    {
        let registry = ObjectRegistry::open(dir.path(), false).unwrap();
        registry.append(b"log", b"abc").unwrap();
    }

    let registry = ObjectRegistry::open(dir.path(), false).unwrap();
    let range = registry.append(b"log", b"def").unwrap();

    assert_eq!(range, ByteRange::new(3, Some(3)));
    assert_eq!(read_all(&registry, b"log"), b"abcdef");
}

// =============================================================================
// Range Tests
// =============================================================================

#[test]
fn test_read_ranges_are_clipped() {
    let (_dir, registry) = setup();
    registry.create(b"digits", b"0123456789").unwrap();

    assert_eq!(read_range(&registry, b"digits", ByteRange::new(2, Some(3))), b"234");
    assert_eq!(read_range(&registry, b"digits", ByteRange::from_offset(7)), b"789");
    assert_eq!(read_range(&registry, b"digits", ByteRange::new(8, Some(100))), b"89");
    assert!(read_range(&registry, b"digits", ByteRange::from_offset(10)).is_empty());
    assert!(read_range(&registry, b"digits", ByteRange::new(50, Some(5))).is_empty());
    assert!(read_range(&registry, b"digits", ByteRange::new(3, Some(0))).is_empty());
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_removes_object() {
    let (_dir, registry) = setup();
    registry.create(b"doc", b"contents").unwrap();
    let path = registry.path_for(b"doc").unwrap();
    assert!(path.exists());

    registry.delete(b"doc").unwrap();

    assert!(!path.exists());
    assert_eq!(registry.live_count(), 0);
    assert!(matches!(registry.stat(b"doc"), Err(BlobError::NotFound)));
    assert!(matches!(registry.delete(b"doc"), Err(BlobError::NotFound)));
}

#[test]
fn test_delete_unopened_object() {
    let dir = TempDir::new().unwrap();

    {
        let registry = ObjectRegistry::open(dir.path(), false).unwrap();
        registry.create(b"doc", b"contents").unwrap();
    }

    let registry = ObjectRegistry::open(dir.path(), false).unwrap();
    registry.delete(b"doc").unwrap();

    assert!(matches!(registry.stat(b"doc"), Err(BlobError::NotFound)));
}

#[test]
fn test_create_after_delete_starts_fresh() {
    let (_dir, registry) = setup();
    registry.append(b"doc", b"old content").unwrap();

    registry.delete(b"doc").unwrap();
    registry.create(b"doc", b"new").unwrap();

    assert_eq!(read_all(&registry, b"doc"), b"new");
    assert_eq!(registry.append(b"doc", b"!").unwrap(), ByteRange::new(3, Some(1)));
}

// =============================================================================
// Object Id Tests
// =============================================================================

#[test]
fn test_invalid_object_ids_rejected() {
    let (_dir, registry) = setup();
    let too_long = vec![b'a'; 201];

    let bad_ids: [&[u8]; 7] = [
        b"",
        b"../escape",
        b"dir/file",
        b"with space",
        b"null\0byte",
        "caf\u{e9}".as_bytes(),
        &too_long,
    ];

    for id in bad_ids {
        assert!(matches!(
            registry.create(id, b"x"),
            Err(BlobError::InvalidObjectId(_))
        ));
        assert!(matches!(
            registry.append(id, b"x"),
            Err(BlobError::InvalidObjectId(_))
        ));
        assert!(matches!(
            registry.delete(id),
            Err(BlobError::InvalidObjectId(_))
        ));
    }

    assert_eq!(registry.live_count(), 0);
}

#[test]
fn test_longest_valid_object_id() {
    let (_dir, registry) = setup();
    let id = vec![b'z'; 200];

    registry.create(&id, b"ok").unwrap();
    assert_eq!(read_all(&registry, &id), b"ok");
}

#[test]
fn test_object_file_layout() {
    let (dir, registry) = setup();

    registry.create(b"my-object_1.v2", b"data").unwrap();

    let path = dir.path().join("obj-my-object_1.v2.bin");
    assert_eq!(registry.path_for(b"my-object_1.v2").unwrap(), path);
    assert_eq!(std::fs::read(&path).unwrap(), b"data");
}

#[test]
fn test_open_creates_data_dir() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");

    let registry = ObjectRegistry::open(&nested, false).unwrap();
    registry.create(b"doc", b"x").unwrap();

    assert!(nested.join("obj-doc.bin").exists());
    assert_eq!(registry.data_dir(), nested.as_path());
}

#[test]
fn test_sync_writes_mode() {
    let dir = TempDir::new().unwrap();
    let registry = ObjectRegistry::open(dir.path(), true).unwrap();

    registry.create(b"doc", b"durable").unwrap();
    registry.append(b"doc", b"!").unwrap();

    assert_eq!(read_all(&registry, b"doc"), b"durable!");
}

// =============================================================================
// Sweep Tests
// =============================================================================

#[test]
fn test_sweep_closes_idle_handles() {
    let (_dir, registry) = setup();
    registry.append(b"a", b"1").unwrap();
    registry.append(b"b", b"22").unwrap();
    registry.append(b"c", b"333").unwrap();
    assert_eq!(registry.live_count(), 3);

    assert_eq!(registry.sweep_idle(), 3);
    assert_eq!(registry.live_count(), 0);

    // Objects reopen on demand
    assert_eq!(read_all(&registry, b"b"), b"22");
    assert_eq!(registry.live_count(), 1);
    assert_eq!(registry.append(b"c", b"4").unwrap(), ByteRange::new(3, Some(1)));
}

#[test]
fn test_sweep_on_empty_registry() {
    let (_dir, registry) = setup();
    assert_eq!(registry.sweep_idle(), 0);
}

#[test]
fn test_sweep_then_delete() {
    let (_dir, registry) = setup();
    registry.create(b"doc", b"x").unwrap();
    registry.sweep_idle();

    registry.delete(b"doc").unwrap();

    assert!(matches!(registry.stat(b"doc"), Err(BlobError::NotFound)));
}
