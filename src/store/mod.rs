//! Store Module
//!
//! Embedded, ordered key-value store with named tables and atomic
//! multi-table transactions, persisted in a single log-structured file.
//!
//! ## Responsibilities
//! - Recover committed state from the store file on open
//! - Serve read transactions from a consistent snapshot
//! - Serialize write transactions and commit each as one WAL entry
//! - Compact the store file once it grows past the checkpoint threshold
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
//!
//! - **Writes** (`update`): serialized by the WAL mutex, held for the whole
//!   transaction. The batch is logged first, then applied under the state
//!   write lock in one step.
//! - **Reads** (`view`): hold the state read lock for the whole
//!   transaction. They run concurrently with each other and with the
//!   staging phase of a writer, but never with the apply step.
//!
//! `update` must not be called from inside another `update` closure on the
//! same thread: the WAL mutex is not reentrant.

mod table;
mod txn;

pub use table::{Table, Tables};
pub use txn::{ReadTxn, WriteTxn};

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, WalSyncStrategy};
use crate::error::{Result, ShelfError};
use crate::wal::{Operation, WalEntry, WalRecovery, WalWriter};

/// Puts per log entry when a checkpoint rewrites a table
const CHECKPOINT_BATCH: usize = 1024;

/// The embedded store
pub struct Store {
    /// The single store file
    path: PathBuf,

    sync_strategy: WalSyncStrategy,
    checkpoint_threshold: u64,

    /// Committed state of every table
    state: RwLock<Tables>,

    /// Log writer; also the writer lock
    wal: Mutex<WalWriter>,
}

impl Store {
    /// Open or create the store file named by `config.data_path`
    ///
    /// On startup:
    /// 1. Create the parent directory if needed
    /// 2. Recover committed entries, cutting off a torn or corrupted tail
    /// 3. Replay them into memory
    /// 4. Resume appending after the last valid LSN
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let path = config.data_path.clone();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| unavailable(&path, e))?;
            }
        }

        let mut tables = Tables::default();
        let mut last_lsn = 0;

        if path.exists() {
            let (entries, recovery) =
                WalRecovery::recover(&path).map_err(|e| unavailable(&path, e))?;

            for entry in &entries {
                for op in &entry.ops {
                    tables.apply(op);
                }
            }
            last_lsn = recovery.last_lsn;

            tracing::info!(
                "Store {}: recovered {} entries (last LSN {}, {} corrupted, truncated: {})",
                path.display(),
                recovery.entries_recovered,
                recovery.last_lsn,
                recovery.entries_corrupted,
                recovery.was_truncated
            );
        } else {
            tracing::info!("Store {}: creating new store file", path.display());
        }

        let wal = WalWriter::resume(&path, config.wal_sync_strategy, last_lsn)
            .map_err(|e| unavailable(&path, e))?;

        Ok(Self {
            path,
            sync_strategy: config.wal_sync_strategy,
            checkpoint_threshold: config.checkpoint_threshold,
            state: RwLock::new(tables),
            wal: Mutex::new(wal),
        })
    }

    /// Run `f` inside a read-only transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T>,
    {
        let state = self.state.read();
        let txn = ReadTxn::new(&state);
        f(&txn)
    }

    /// Run `f` inside a write transaction
    ///
    /// If `f` returns `Ok`, its staged operations are logged as one entry
    /// and applied together. If `f` returns `Err`, nothing is applied and the
    /// error is returned unchanged. If logging fails, nothing is applied and
    /// `StorageUnavailable` is returned.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T>,
    {
        let mut wal = self.wal.lock();

        let mut txn = WriteTxn::new(&self.state);
        let output = f(&mut txn)?;

        let ops = txn.into_ops();
        if ops.is_empty() {
            return Ok(output);
        }

        let entry = WalEntry::new(wal.current_lsn() + 1, ops);
        wal.append_entry(&entry).map_err(|e| unavailable(&self.path, e))?;

        {
            let mut state = self.state.write();
            for op in &entry.ops {
                state.apply(op);
            }
        }

        tracing::trace!("Committed LSN {} ({} ops)", entry.lsn, entry.ops.len());

        // Compact once past the threshold and at least double the size the
        // file had after the last checkpoint.
        if wal.size() >= self.checkpoint_threshold.max(wal.base_size() * 2) {
            // The transaction is already durable; a failed compaction only
            // leaves a longer log behind.
            if let Err(e) = self.checkpoint_locked(&mut wal) {
                tracing::warn!("Checkpoint of {} failed: {}", self.path.display(), e);
            }
        }

        Ok(output)
    }

    /// Compact the store file down to the live state
    pub fn checkpoint(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.checkpoint_locked(&mut wal)
    }

    /// Sync the store file and release it
    pub fn close(self) -> Result<()> {
        self.wal.lock().sync()?;
        tracing::debug!("Store {} closed", self.path.display());
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the store file in bytes
    pub fn log_size(&self) -> u64 {
        self.wal.lock().size()
    }

    /// Names of all tables
    pub fn table_names(&self) -> Vec<String> {
        self.state.read().names()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Rewrite the live state into a side file and rename it over the store
    /// file. Called with the writer lock held, so the state cannot change.
    fn checkpoint_locked(&self, wal: &mut WalWriter) -> Result<()> {
        let tmp = checkpoint_path(&self.path);
        if tmp.exists() {
            fs::remove_file(&tmp)?;
        }

        let before = wal.size();
        let mut writer = WalWriter::resume(
            &tmp,
            WalSyncStrategy::EveryNEntries { count: usize::MAX },
            0,
        )?;

        {
            let state = self.state.read();
            for (name, table) in state.iter() {
                writer.append(vec![
                    Operation::CreateTable { table: name.clone() },
                    Operation::SetSequence {
                        table: name.clone(),
                        value: table.sequence(),
                    },
                ])?;

                let mut batch = Vec::with_capacity(CHECKPOINT_BATCH);
                for (key, value) in table.iter() {
                    batch.push(Operation::Put {
                        table: name.clone(),
                        key: key.clone(),
                        value: value.clone(),
                    });
                    if batch.len() == CHECKPOINT_BATCH {
                        writer.append(std::mem::take(&mut batch))?;
                    }
                }
                if !batch.is_empty() {
                    writer.append(batch)?;
                }
            }
        }
        writer.sync()?;

        // The open handle follows the file through the rename, so nothing
        // can fail between replacing the store file and adopting the writer.
        wal.sync()?;
        fs::rename(&tmp, &self.path)?;
        writer.relocate(&self.path, self.sync_strategy);
        *wal = writer;

        tracing::info!(
            "Checkpointed {}: {} -> {} bytes",
            self.path.display(),
            before,
            wal.size()
        );
        Ok(())
    }
}

/// `<store file>.checkpoint`
fn checkpoint_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".checkpoint");
    PathBuf::from(name)
}

fn unavailable(path: &Path, err: impl std::fmt::Display) -> ShelfError {
    ShelfError::StorageUnavailable(format!("{}: {}", path.display(), err))
}
