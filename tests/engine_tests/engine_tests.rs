//! Engine Tests
//!
//! Tests verify:
//! - Object operations through the engine facade
//! - Command routing and reply payloads
//! - Configuration plumbing

use std::sync::Arc;
use std::thread;

use atlasblob::protocol::{decode_length_reply, decode_range_reply, Command};
use atlasblob::{BlobError, ByteRange, Config, Engine, ErrorKind};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open_path(dir.path()).unwrap();
    (dir, engine)
}

fn id(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

// =============================================================================
// Facade Tests
// =============================================================================

#[test]
fn test_put_append_read_info_delete() {
    let (_dir, engine) = setup();

    engine.put_obj(b"doc", b"hello").unwrap();
    let range = engine.append(b"doc", b"world").unwrap();
    assert_eq!(range, ByteRange::new(5, Some(5)));

    let mut body = Vec::new();
    let copied = engine.read_obj(b"doc", ByteRange::full(), &mut body).unwrap();
    assert_eq!(copied, 10);
    assert_eq!(body, b"helloworld");

    assert_eq!(engine.info(b"doc").unwrap(), 10);
    assert_eq!(engine.open_handle_count(), 1);

    engine.delete_obj(b"doc").unwrap();
    assert_eq!(engine.open_handle_count(), 0);
    assert!(matches!(engine.info(b"doc"), Err(BlobError::NotFound)));
}

#[test]
fn test_error_kinds_surface() {
    let (_dir, engine) = setup();

    engine.put_obj(b"doc", b"x").unwrap();

    let exists = engine.put_obj(b"doc", b"y").unwrap_err();
    assert_eq!(exists.kind(), ErrorKind::AlreadyExists);

    let missing = engine.info(b"ghost").unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let invalid = engine.append(b"bad/id", b"z").unwrap_err();
    assert_eq!(invalid.kind(), ErrorKind::BadRequest);
}

#[test]
fn test_sweep_idle_through_engine() {
    let (_dir, engine) = setup();
    engine.append(b"a", b"1").unwrap();
    engine.append(b"b", b"2").unwrap();

    assert_eq!(engine.sweep_idle(), 2);
    assert_eq!(engine.open_handle_count(), 0);
    assert_eq!(engine.info(b"a").unwrap(), 1);
}

#[test]
fn test_engine_shared_across_threads() {
    let (_dir, engine) = setup();
    let engine = Arc::new(engine);

    let mut handles = vec![];
    for t in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let name = format!("obj-{}", t);
            engine.put_obj(name.as_bytes(), name.as_bytes()).unwrap();
            for _ in 0..10 {
                engine.append(name.as_bytes(), b".").unwrap();
            }
            engine.info(name.as_bytes()).unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5 + 10);
    }
    assert_eq!(engine.open_handle_count(), 4);
}

// =============================================================================
// Command Routing Tests
// =============================================================================

#[test]
fn test_execute_put_and_read() {
    let (_dir, engine) = setup();

    let reply = engine
        .execute(Command::Put {
            id: id("doc"),
            data: b"0123456789".to_vec(),
        })
        .unwrap();
    assert_eq!(reply, None);

    let reply = engine
        .execute(Command::Read {
            id: id("doc"),
            range: ByteRange::new(3, Some(4)),
        })
        .unwrap();
    assert_eq!(reply, Some(b"3456".to_vec()));
}

#[test]
fn test_execute_append_returns_range() {
    let (_dir, engine) = setup();

    engine
        .execute(Command::Append {
            id: id("log"),
            data: b"abc".to_vec(),
        })
        .unwrap();
    let reply = engine
        .execute(Command::Append {
            id: id("log"),
            data: b"defg".to_vec(),
        })
        .unwrap()
        .unwrap();

    assert_eq!(decode_range_reply(&reply).unwrap(), ByteRange::new(3, Some(4)));
}

#[test]
fn test_execute_info_returns_length() {
    let (_dir, engine) = setup();
    engine.put_obj(b"doc", b"twelve bytes").unwrap();

    let reply = engine.execute(Command::Info { id: id("doc") }).unwrap().unwrap();

    assert_eq!(decode_length_reply(&reply).unwrap(), 12);
}

#[test]
fn test_execute_delete() {
    let (_dir, engine) = setup();
    engine.put_obj(b"doc", b"x").unwrap();

    assert_eq!(engine.execute(Command::Delete { id: id("doc") }).unwrap(), None);
    assert!(matches!(
        engine.execute(Command::Delete { id: id("doc") }),
        Err(BlobError::NotFound)
    ));
}

#[test]
fn test_execute_ping() {
    let (_dir, engine) = setup();

    assert_eq!(engine.execute(Command::Ping).unwrap(), Some(b"PONG".to_vec()));
}

#[test]
fn test_execute_read_missing() {
    let (_dir, engine) = setup();

    let result = engine.execute(Command::Read {
        id: id("ghost"),
        range: ByteRange::full(),
    });

    assert!(matches!(result, Err(BlobError::NotFound)));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_open_with_config() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("blobs");
    let config = Config::builder()
        .data_dir(&data_dir)
        .sync_writes(true)
        .sweep_interval_ms(0)
        .build();

    let engine = Engine::open(config).unwrap();
    engine.put_obj(b"doc", b"synced").unwrap();

    assert_eq!(engine.data_dir(), data_dir.as_path());
    assert!(engine.config().sync_writes);
    assert_eq!(engine.config().sweep_interval_ms, 0);
    assert!(data_dir.join("obj-doc.bin").exists());
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert!(!config.sync_writes);
    assert_eq!(config.sweep_interval_ms, 60_000);
    assert_eq!(config.listen_addr, "127.0.0.1:7070");
    assert_eq!(config.worker_threads, 16);
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let engine = Engine::open_path(dir.path()).unwrap();
        engine.put_obj(b"doc", b"kept").unwrap();
        engine.append(b"doc", b"!").unwrap();
    }

    let engine = Engine::open_path(dir.path()).unwrap();
    let mut body = Vec::new();
    engine.read_obj(b"doc", ByteRange::full(), &mut body).unwrap();
    assert_eq!(body, b"kept!");
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();

    let no_workers = Config::builder()
        .data_dir(dir.path())
        .worker_threads(0)
        .build();
    assert!(matches!(Engine::open(no_workers), Err(BlobError::Config(_))));

    let no_dir = Config::builder().data_dir("").build();
    assert!(matches!(Engine::open(no_dir), Err(BlobError::Config(_))));
}

#[test]
fn test_sweep_interval_secs_saturates() {
    let config = Config::builder().sweep_interval_secs(30).build();
    assert_eq!(config.sweep_interval_ms, 30_000);

    let config = Config::builder().sweep_interval_secs(u64::MAX).build();
    assert_eq!(config.sweep_interval_ms, u64::MAX);

    let config = Config::builder().sweep_interval_secs(0).build();
    assert_eq!(config.sweep_interval_ms, 0);
}
