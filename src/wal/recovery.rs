//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;
use super::reader::Frame;
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of complete entries that failed validation
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether bytes past the last valid entry were (or, for `verify`,
    /// would be) cut off
    pub was_truncated: bool,
}

/// Scan output shared by `recover` and `verify`
struct Scan {
    entries: Vec<WalEntry>,
    result: RecoveryResult,
    valid_len: u64,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first torn or corrupted entry
    /// 3. Truncate the file after the last valid entry
    /// 4. Return all valid entries in order
    ///
    /// Nothing after a bad entry is trusted: a later entry may depend on the
    /// transaction that was lost.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let scan = Self::scan(path)?;

        if scan.result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(scan.valid_len)?;
            file.sync_all()?;

            tracing::warn!(
                "WAL {}: truncated to {} bytes after LSN {} ({} corrupted entries)",
                path.display(),
                scan.valid_len,
                scan.result.last_lsn,
                scan.result.entries_corrupted
            );
        }

        Ok((scan.entries, scan.result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Ok(Self::scan(path)?.result)
    }

    fn scan(path: &Path) -> Result<Scan> {
        let file_len = std::fs::metadata(path)?.len();
        let mut reader = WalReader::open(path)?;

        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut valid_len = 0;

        loop {
            match reader.next_frame()? {
                Frame::Entry(entry) => {
                    if entry.lsn <= result.last_lsn {
                        tracing::warn!(
                            "WAL {}: LSN {} does not follow {}",
                            path.display(),
                            entry.lsn,
                            result.last_lsn
                        );
                        result.entries_corrupted += 1;
                        break;
                    }
                    valid_len = reader.position();
                    result.last_lsn = entry.lsn;
                    result.entries_recovered += 1;
                    entries.push(entry);
                }
                Frame::End => break,
                Frame::Torn => {
                    tracing::debug!("WAL {}: torn entry at tail", path.display());
                    break;
                }
                Frame::Corrupt(reason) => {
                    tracing::warn!("WAL {}: {}", path.display(), reason);
                    result.entries_corrupted += 1;
                    break;
                }
            }
        }

        result.was_truncated = valid_len < file_len;

        Ok(Scan {
            entries,
            result,
            valid_len,
        })
    }
}
