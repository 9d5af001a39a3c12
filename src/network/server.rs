//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Result, ShelfError};
use crate::protocol::{write_response, Response};
use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for the catalog
///
/// A non-blocking accept loop polls the shutdown flag and queues accepted
/// connections on a bounded channel; `worker_threads` workers each serve one
/// connection at a time.
pub struct Server {
    config: Config,
    catalog: Arc<Catalog>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listen address
    pub fn bind(config: Config, catalog: Arc<Catalog>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            ShelfError::Network(format!("could not listen on {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            catalog,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops `run` once set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Serve until shutdown is signalled (blocking)
    ///
    /// Workers finish the connections they already hold; an idle connection
    /// ends at its read timeout.
    pub fn run(&self) -> Result<()> {
        let (tx, rx) = channel::bounded::<TcpStream>(self.config.max_connections);

        let mut workers = Vec::with_capacity(self.config.worker_threads);
        for i in 0..self.config.worker_threads {
            match self.spawn_worker(i, rx.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    drop(tx);
                    join_workers(workers);
                    return Err(e);
                }
            }
        }
        drop(rx);

        let outcome = self.accept_loop(&tx);

        tracing::info!("Shutting down, waiting for workers");
        drop(tx);
        join_workers(workers);

        outcome
    }

    /// Accept connections and queue them until shutdown is signalled
    fn accept_loop(&self, tx: &Sender<TcpStream>) -> Result<()> {
        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            self.config.worker_threads
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    // Some platforms hand out sockets that inherit non-blocking mode
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }

                    match tx.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(mut stream)) => {
                            tracing::warn!("Connection queue full, rejecting {}", peer);
                            let _ = write_response(&mut stream, &Response::error("server busy"));
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            return Err(ShelfError::Network(
                                "all connection workers have exited".to_string(),
                            ));
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        Ok(())
    }

    fn spawn_worker(&self, index: usize, rx: Receiver<TcpStream>) -> Result<JoinHandle<()>> {
        let catalog = Arc::clone(&self.catalog);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("bookshelf-worker-{}", index))
            .spawn(move || {
                // Ends once the sender is dropped and the queue is drained
                for stream in rx.iter() {
                    let mut connection = match Connection::new(stream, Arc::clone(&catalog)) {
                        Ok(c) => c,
                        Err(e) => {
                            tracing::warn!("Failed to set up connection: {}", e);
                            continue;
                        }
                    };

                    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
                    }
                    if let Err(e) = connection.handle() {
                        tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
                    }
                }
            })?;

        Ok(handle)
    }
}

fn join_workers(workers: Vec<JoinHandle<()>>) {
    for worker in workers {
        if worker.join().is_err() {
            tracing::error!("Connection worker panicked");
        }
    }
}
