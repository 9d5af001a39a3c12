//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, ShelfError};
use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
pub struct WalWriter {
    file: File,
    path: PathBuf,
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,

    /// Entries appended since the last fsync
    unsynced: usize,

    /// Current file length in bytes
    size: u64,

    /// File length when this writer was opened or relocated
    base_size: u64,

    /// Set when a failed append could not be undone; the file may hold a
    /// frame the caller was told did not commit
    poisoned: bool,

    #[cfg(test)]
    fail_next_sync: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing file is scanned (without modification) so that new
    /// entries continue after its last valid LSN.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let last_lsn = if path.exists() {
            WalRecovery::verify(path)?.last_lsn
        } else {
            0
        };
        Self::resume(path, sync_strategy, last_lsn)
    }

    /// Open or create a WAL file whose last valid LSN is already known
    pub fn resume(path: &Path, sync_strategy: WalSyncStrategy, last_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            file,
            path: path.to_path_buf(),
            current_lsn: last_lsn,
            sync_strategy,
            unsynced: 0,
            size,
            base_size: size,
            poisoned: false,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Append the operations as one entry, returning its LSN
    pub fn append(&mut self, ops: Vec<Operation>) -> Result<u64> {
        let entry = WalEntry::new(self.current_lsn + 1, ops);
        self.append_entry(&entry)?;
        Ok(entry.lsn)
    }

    /// Append a pre-built entry; its LSN must follow the current one
    ///
    /// An entry is only committed once its frame is written and, when the
    /// sync strategy calls for it, synced. On any failure the frame is cut
    /// back off the file and the writer is left as it was.
    pub fn append_entry(&mut self, entry: &WalEntry) -> Result<()> {
        if self.poisoned {
            return Err(ShelfError::WalWrite(format!(
                "WAL {} holds an entry that could not be discarded; reopen the store",
                self.path.display()
            )));
        }
        if entry.lsn <= self.current_lsn {
            return Err(ShelfError::WalWrite(format!(
                "LSN {} does not follow current LSN {}",
                entry.lsn, self.current_lsn
            )));
        }

        let bytes = entry.serialize()?;

        // Single write call for the entire frame
        if let Err(e) = self.file.write_all(&bytes).and_then(|_| self.file.flush()) {
            self.discard_tail();
            return Err(ShelfError::WalWrite(format!("LSN {}: {}", entry.lsn, e)));
        }

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count,
        };
        if should_sync {
            if let Err(e) = self.sync_file() {
                self.discard_tail();
                return Err(ShelfError::WalWrite(format!(
                    "LSN {}: sync failed: {}",
                    entry.lsn, e
                )));
            }
            self.unsynced = 0;
        } else {
            self.unsynced += 1;
        }

        self.size += bytes.len() as u64;
        self.current_lsn = entry.lsn;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.sync_file()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Discard every entry; LSNs keep counting from the current one
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.size = 0;
        self.base_size = 0;
        self.unsynced = 0;
        self.poisoned = false;
        Ok(())
    }

    /// Adopt a new path and sync strategy after the file was renamed
    pub(crate) fn relocate(&mut self, path: &Path, sync_strategy: WalSyncStrategy) {
        self.path = path.to_path_buf();
        self.sync_strategy = sync_strategy;
        self.base_size = self.size;
    }

    /// Get the current LSN
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Entries appended since the last fsync
    pub fn unsynced_count(&self) -> usize {
        self.unsynced
    }

    /// Current file length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// File length when this writer was opened or relocated
    pub fn base_size(&self) -> u64 {
        self.base_size
    }

    /// Path of the file being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a failed append left an unremovable frame behind
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Make the next sync fail
    #[cfg(test)]
    pub(crate) fn fail_next_sync(&mut self) {
        self.fail_next_sync = true;
    }

    fn sync_file(&mut self) -> std::io::Result<()> {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected sync failure",
            ));
        }

        self.file.flush()?;
        self.file.sync_all()
    }

    /// Cut the file back to the last committed entry
    fn discard_tail(&mut self) {
        let restored = self
            .file
            .set_len(self.size)
            .and_then(|_| self.file.sync_all());

        if let Err(e) = restored {
            tracing::error!(
                "WAL {}: failed to discard uncommitted entry: {}",
                self.path.display(),
                e
            );
            self.poisoned = true;
        }
    }
}
