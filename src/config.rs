//! Configuration for Bookshelf
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, ShelfError};

/// Main configuration for a Bookshelf instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// The single store file. Every committed transaction is appended to it
    /// as one log entry; checkpoints rewrite it in place.
    pub data_path: PathBuf,

    /// Sync strategy: how often to fsync the log
    pub wal_sync_strategy: WalSyncStrategy,

    /// Log size (in bytes) after which the store file is compacted
    pub checkpoint_threshold: u64,

    // -------------------------------------------------------------------------
    // Catalog Configuration
    // -------------------------------------------------------------------------
    /// How `create` treats empty and already-indexed ISBNs
    pub isbn_policy: IsbnPolicy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max queued client connections waiting for a worker
    pub max_connections: usize,

    /// Number of worker threads serving connections
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every commit (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced commits (balanced durability/performance)
    EveryNEntries { count: usize },
}

/// Policy applied to the ISBN of a book being created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsbnPolicy {
    /// Empty ISBNs and ISBNs already in the index are refused
    #[default]
    Reject,

    /// Any ISBN is accepted; the index points at the most recent book
    LastWriteWins,
}

impl std::str::FromStr for IsbnPolicy {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reject" => Ok(IsbnPolicy::Reject),
            "last-write-wins" => Ok(IsbnPolicy::LastWriteWins),
            other => Err(ShelfError::Config(format!(
                "unknown ISBN policy {:?} (expected \"reject\" or \"last-write-wins\")",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./books.db"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            checkpoint_threshold: 4 * 1024 * 1024, // 4 MB
            isbn_policy: IsbnPolicy::Reject,
            listen_addr: "0.0.0.0:8080".to_string(),
            max_connections: 1024,
            worker_threads: 8,
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

    /// Check values that would make the store or server unusable
    pub fn validate(&self) -> Result<()> {
        if self.data_path.as_os_str().is_empty() {
            return Err(ShelfError::Config("data path must not be empty".to_string()));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(ShelfError::Config(
                "sync interval must be at least one entry".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ShelfError::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(ShelfError::Config(
                "worker_threads must be greater than zero".to_string(),
            ));
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
    /// Set the store file path
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_path = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the checkpoint threshold (in bytes)
    pub fn checkpoint_threshold(mut self, bytes: u64) -> Self {
        self.config.checkpoint_threshold = bytes;
        self
    }

    /// Set the ISBN policy
    pub fn isbn_policy(mut self, policy: IsbnPolicy) -> Self {
        self.config.isbn_policy = policy;
        self
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
