//! Configuration for AtlasBlob
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{BlobError, Result};

/// Main configuration for an AtlasBlob instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding one backing file per object
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── obj-{id}.bin
    ///     └── ...
    pub data_dir: PathBuf,

    /// fsync object data after every create/append
    pub sync_writes: bool,

    /// How often the server closes idle handles (milliseconds, 0 = never)
    pub sweep_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max queued client connections waiting for a worker
    pub max_connections: usize,

    /// Number of connection worker threads
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./atlasblob_data"),
            sync_writes: false,
            sweep_interval_ms: 60_000,
            listen_addr: "127.0.0.1:7070".to_string(),
            max_connections: 1024,
            worker_threads: 16,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings no instance can run with
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(BlobError::Config("data_dir must not be empty".to_string()));
        }
        if self.worker_threads == 0 {
            return Err(BlobError::Config("worker_threads must be at least 1".to_string()));
        }
        if self.max_connections == 0 {
            return Err(BlobError::Config("max_connections must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all objects)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Enable or disable fsync after writes
    pub fn sync_writes(mut self, enabled: bool) -> Self {
        self.config.sync_writes = enabled;
        self
    }

    /// Set the idle sweep interval (in milliseconds, 0 disables)
    pub fn sweep_interval_ms(mut self, ms: u64) -> Self {
        self.config.sweep_interval_ms = ms;
        self
    }

    /// Set the idle sweep interval in whole seconds, saturating on overflow
    pub fn sweep_interval_secs(self, secs: u64) -> Self {
        self.sweep_interval_ms(secs.saturating_mul(1000))
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of queued connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the number of worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
