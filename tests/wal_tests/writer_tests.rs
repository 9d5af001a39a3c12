//! Tests for WAL Writer
//!
//! These tests verify:
//! - Writing entries to WAL
//! - LSN generation and sequencing, including across reopen
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Truncation
//! - Integration with reader

use std::path::PathBuf;

use bookshelf::config::WalSyncStrategy;
use bookshelf::wal::{Operation, WalEntry, WalReader, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(key: &str, value: &str) -> Vec<Operation> {
    vec![Operation::Put {
        table: "T".to_string(),
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }]
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert!(wal_path.exists());
    assert_eq!(writer.current_lsn(), 0);
    assert_eq!(writer.size(), 0);
}

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(put("key1", "value1")).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 1);
    assert_eq!(writer.size(), std::fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    for i in 0..50u64 {
        let lsn = writer.append(put(&format!("key{}", i), "v")).unwrap();
        assert_eq!(lsn, i + 1);
    }
}

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
        writer.append(put("b", "2")).unwrap();
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.current_lsn(), 2);
    assert_eq!(writer.append(put("c", "3")).unwrap(), 3);
}

#[test]
fn test_append_entry_rejects_stale_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(put("a", "1")).unwrap();

    let stale = WalEntry::new(1, put("b", "2"));
    assert!(writer.append_entry(&stale).is_err());

    // Nothing was written for the rejected entry
    assert_eq!(writer.current_lsn(), 1);
    let entries: Vec<_> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(entries.len(), 1);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_sync_every_write() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    writer.append(put("k1", "v1")).unwrap();
    assert_eq!(writer.unsynced_count(), 0);

    writer.append(put("k2", "v2")).unwrap();
    assert_eq!(writer.unsynced_count(), 0);
}

#[test]
fn test_sync_every_n_entries() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 5 }).unwrap();

    for i in 0..4 {
        writer.append(put(&format!("k{}", i), "v")).unwrap();
    }
    assert_eq!(writer.unsynced_count(), 4);

    // 5th entry triggers sync
    writer.append(put("k5", "v")).unwrap();
    assert_eq!(writer.unsynced_count(), 0);

    writer.append(put("k6", "v")).unwrap();
    assert_eq!(writer.unsynced_count(), 1);

    writer.sync().unwrap();
    assert_eq!(writer.unsynced_count(), 0);
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncate_empties_file_and_keeps_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(put("a", "1")).unwrap();
    writer.append(put("b", "2")).unwrap();

    writer.truncate().unwrap();

    assert_eq!(writer.size(), 0);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);
    assert_eq!(writer.append(put("c", "3")).unwrap(), 3);
}

// =============================================================================
// Reader Integration Tests
// =============================================================================

#[test]
fn test_reader_reads_back_entries() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
        writer
            .append(vec![
                Operation::CreateTable { table: "U".to_string() },
                Operation::Delete {
                    table: "T".to_string(),
                    key: b"a".to_vec(),
                },
            ])
            .unwrap();
    }

    let mut reader = WalReader::open(&wal_path).unwrap();

    let first = reader.next_entry().unwrap().unwrap();
    assert_eq!(first.lsn, 1);
    assert_eq!(first.ops, put("a", "1"));

    let second = reader.next_entry().unwrap().unwrap();
    assert_eq!(second.lsn, 2);
    assert_eq!(second.ops.len(), 2);

    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), std::fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_reader_iterator_stops_at_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
    }
    {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(&wal_path).unwrap();
        file.write_all(&[0u8; 7]).unwrap();
    }

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}
