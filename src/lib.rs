//! # AtlasBlob
//!
//! A concurrent object-blob store with:
//! - One backing file per object, created, appended, read by range, deleted
//! - Lock-free lookup of already open objects
//! - Per-object append ordering with non-overlapping ranges
//! - Deletes that wait out every in-flight operation before closing
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Worker Thread Pool)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │          (put / append / read / delete / info)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Object Registry                            │
//! │      (Borrow protocol, tombstones, delete barrier)           │
//! └──────────┬───────────────────────────────┬──────────────────┘
//!            │                               │
//!            ▼                               ▼
//!   ┌─────────────────┐             ┌─────────────────┐
//!   │ ConcurrentPool  │             │ FairLock, Gate  │
//!   │ (id → handle)   │             │ (sweep, delete) │
//!   └────────┬────────┘             └─────────────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │  ObjectHandle   │
//!   │ (obj-{id}.bin)  │
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod range;

pub mod sync;
pub mod registry;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BlobError, ErrorKind, Result};
pub use config::Config;
pub use range::ByteRange;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasBlob
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
