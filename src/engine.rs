//! Engine Module
//!
//! The object service facade consumed by transports.
//!
//! ## Responsibilities
//! - Expose `put_obj`, `append`, `read_obj`, `delete_obj` and `info`
//! - Delegate every operation to the object registry
//! - Route protocol commands and encode their replies

use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{encode_length_reply, encode_range_reply, Command};
use crate::range::ByteRange;
use crate::registry::ObjectRegistry;

/// The object service
///
/// ## Concurrency Model
///
/// All methods take `&self` and may be called from any number of threads.
/// Operations on different objects never contend. On one object:
/// - appends are serialized by the object's own append lock
/// - reads run in parallel with each other and with appends
/// - a delete waits for every operation already holding the object
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Open handles, tombstones, and the delete/sweep coordination
    registry: ObjectRegistry,
}

impl Engine {
    /// Open or create an engine with the given config
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let registry = ObjectRegistry::open(&config.data_dir, config.sync_writes)?;

        tracing::debug!("Engine opened at {}", config.data_dir.display());

        Ok(Self { config, registry })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers and returns the reply payload
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Put { id, data } => {
                self.put_obj(&id, &data)?;
                Ok(None)
            }
            Command::Append { id, data } => {
                let range = self.append(&id, &data)?;
                Ok(Some(encode_range_reply(&range)))
            }
            Command::Read { id, range } => {
                let mut body = Vec::new();
                self.read_obj(&id, range, &mut body)?;
                Ok(Some(body))
            }
            Command::Delete { id } => {
                self.delete_obj(&id)?;
                Ok(None)
            }
            Command::Info { id } => {
                let length = self.info(&id)?;
                Ok(Some(encode_length_reply(length)))
            }
            Command::Ping => Ok(Some(b"PONG".to_vec())),
        }
    }

    /// Create an object; fails with `AlreadyExists` if it is live or on disk
    pub fn put_obj(&self, id: &[u8], data: &[u8]) -> Result<()> {
        self.registry.create(id, data)
    }

    /// Append to an object, creating it if absent
    pub fn append(&self, id: &[u8], data: &[u8]) -> Result<ByteRange> {
        self.registry.append(id, data)
    }

    /// Copy a byte range of an object into `sink`
    pub fn read_obj<W: Write + ?Sized>(&self, id: &[u8], range: ByteRange, sink: &mut W) -> Result<u64> {
        self.registry.read(id, range, sink)
    }

    /// Delete an object
    pub fn delete_obj(&self, id: &[u8]) -> Result<()> {
        self.registry.delete(id)
    }

    /// Length of an object
    pub fn info(&self, id: &[u8]) -> Result<u64> {
        self.registry.stat(id)
    }

    /// Close handles no operation is using
    pub fn sweep_idle(&self) -> usize {
        self.registry.sweep_idle()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Number of currently open object handles
    pub fn open_handle_count(&self) -> usize {
        self.registry.live_count()
    }

    /// Get the underlying registry
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
