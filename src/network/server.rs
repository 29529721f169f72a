//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, select, Receiver, TrySendError};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{BlobError, Result};
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cloneable handle that stops a running [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting and drain its workers
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for AtlasBlob
///
/// ## Threads
/// - the caller of [`Server::run`] accepts connections
/// - `worker_threads` workers each serve one connection at a time
/// - an optional sweeper closes idle handles every `sweep_interval_ms`
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            BlobError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&self) -> Result<()> {
        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            self.config.worker_threads
        );

        let (queue_tx, queue_rx) = channel::bounded::<TcpStream>(self.config.max_connections.max(1));
        let workers = (0..self.config.worker_threads.max(1))
            .map(|i| self.spawn_worker(i, queue_rx.clone()))
            .collect::<Result<Vec<_>>>()?;
        drop(queue_rx);

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let sweeper = self.spawn_sweeper(stop_rx)?;

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    tracing::trace!("Accepted connection from {}", peer);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Failed to configure stream from {}: {}", peer, e);
                        continue;
                    }
                    match queue_tx.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(stream)) => {
                            tracing::warn!("Connection queue full, refusing {}", peer);
                            refuse(stream);
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down, draining workers");
        drop(queue_tx);
        drop(stop_tx);

        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
        if let Some(sweeper) = sweeper {
            if sweeper.join().is_err() {
                tracing::error!("Sweeper thread panicked");
            }
        }

        Ok(())
    }

    fn spawn_worker(&self, index: usize, queue: Receiver<TcpStream>) -> Result<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("atlasblob-worker-{}", index))
            .spawn(move || {
                for stream in queue.iter() {
                    let mut connection = match Connection::new(stream, Arc::clone(&engine)) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!("Failed to set up connection: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
                        continue;
                    }
                    if let Err(e) = connection.handle() {
                        tracing::debug!("Connection {} closed with error: {}", connection.peer_addr(), e);
                    }
                }
            })?;
        Ok(handle)
    }

    fn spawn_sweeper(&self, stop: Receiver<()>) -> Result<Option<JoinHandle<()>>> {
        if self.config.sweep_interval_ms == 0 {
            return Ok(None);
        }

        let engine = Arc::clone(&self.engine);
        let ticker = channel::tick(Duration::from_millis(self.config.sweep_interval_ms));

        let handle = thread::Builder::new()
            .name("atlasblob-sweeper".to_string())
            .spawn(move || loop {
                select! {
                    recv(ticker) -> _ => {
                        let closed = engine.sweep_idle();
                        tracing::trace!("Idle sweep closed {} handles", closed);
                    }
                    recv(stop) -> _ => break,
                }
            })?;
        Ok(Some(handle))
    }
}

/// Tell a client we cannot serve it, ignoring failures
fn refuse(mut stream: TcpStream) {
    let _ = write_response(&mut stream, &Response::error("unknown_error: server busy"));
}
