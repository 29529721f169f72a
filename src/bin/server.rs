//! AtlasBlob Server Binary
//!
//! Starts the TCP server for AtlasBlob.

use std::sync::Arc;

use atlasblob::network::Server;
use atlasblob::{Config, Engine};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasBlob Server
#[derive(Parser, Debug)]
#[command(name = "atlasblob-server")]
#[command(about = "Concurrent object-blob store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./atlasblob_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Maximum queued connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Number of worker threads
    #[arg(short, long, default_value = "16")]
    workers: usize,

    /// Idle handle sweep interval in seconds (0 disables)
    #[arg(long, default_value = "60")]
    sweep_secs: u64,

    /// fsync object data after every write
    #[arg(long)]
    sync_writes: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atlasblob=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("AtlasBlob Server v{}", atlasblob::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .sweep_interval_secs(args.sweep_secs)
        .sync_writes(args.sync_writes)
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
