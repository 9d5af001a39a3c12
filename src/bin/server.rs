//! Bookshelf Server Binary
//!
//! Opens the catalog and serves it over TCP.

use std::sync::Arc;

use bookshelf::network::Server;
use bookshelf::{Catalog, Config, IsbnPolicy};
use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing_subscriber::{fmt, EnvFilter};

/// Bookshelf Server
#[derive(Parser, Debug)]
#[command(name = "bookshelf-server")]
#[command(about = "Book catalog service backed by an embedded key-value store")]
#[command(version)]
struct Args {
    /// Store file
    #[arg(short, long, default_value = "books.db")]
    data: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Maximum queued connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// How to treat empty or duplicate ISBNs: "reject" or "last-write-wins"
    #[arg(long, default_value = "reject")]
    isbn_policy: IsbnPolicy,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bookshelf=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Bookshelf Server v{}", bookshelf::VERSION);
    tracing::info!("Store file: {}", args.data);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .data_path(&args.data)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .isbn_policy(args.isbn_policy)
        .build();

    let catalog = match Catalog::open(&config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("Failed to open catalog: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Catalog initialized successfully");

    let server = match Server::bind(config, Arc::clone(&catalog)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, server.shutdown_handle()) {
            tracing::warn!("Could not install handler for signal {}: {}", signal, e);
        }
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
    drop(server);

    match Arc::try_unwrap(catalog) {
        Ok(catalog) => {
            if let Err(e) = catalog.close() {
                tracing::error!("Failed to close catalog: {}", e);
                std::process::exit(1);
            }
        }
        Err(_) => tracing::warn!("Catalog still shared at exit; skipping close"),
    }

    tracing::info!("Server stopped");
}
