//! Tests for WAL Entry serialization and deserialization
//!
//! These tests verify:
//! - Round-trip serialization of multi-operation entries
//! - CRC32 corruption detection
//! - Edge cases (truncation, mismatched LSN, empty batches)

use bookshelf::wal::{Operation, WalEntry, HEADER_SIZE};
use bookshelf::ShelfError;

// =============================================================================
// Helper Functions
// =============================================================================

fn put(table: &str, key: &[u8], value: &[u8]) -> Operation {
    Operation::Put {
        table: table.to_string(),
        key: key.to_vec(),
        value: value.to_vec(),
    }
}

fn sample_entry(lsn: u64) -> WalEntry {
    WalEntry::new(
        lsn,
        vec![
            put("BOOK", &1u64.to_be_bytes(), b"record"),
            put("ISBN", b"978-2221110829", &1u64.to_be_bytes()),
            Operation::SetSequence {
                table: "BOOK".to_string(),
                value: 1,
            },
        ],
    )
}

// =============================================================================
// Serialization Round-Trip Tests
// =============================================================================

#[test]
fn test_serialize_deserialize_batch() {
    let entry = sample_entry(7);

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(recovered, entry);
    assert_eq!(recovered.ops.len(), 3);
}

#[test]
fn test_serialize_deserialize_empty_batch() {
    let entry = WalEntry::new(1, vec![]);

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(recovered, entry);
}

#[test]
fn test_serialize_deserialize_empty_key_and_value() {
    let entry = WalEntry::new(
        3,
        vec![
            put("ISBN", b"", b""),
            Operation::Delete {
                table: "BOOK".to_string(),
                key: vec![],
            },
        ],
    );

    let bytes = entry.serialize().unwrap();
    assert_eq!(WalEntry::deserialize(&bytes).unwrap(), entry);
}

#[test]
fn test_header_layout() {
    let entry = sample_entry(0x0102_0304_0506_0708);
    let bytes = entry.serialize().unwrap();

    // LSN is the first 8 bytes, big-endian
    assert_eq!(&bytes[0..8], &[1, 2, 3, 4, 5, 6, 7, 8]);

    // Length field covers exactly the body
    let len = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + len);

    // CRC covers the body
    let crc = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    assert_eq!(crc, WalEntry::compute_crc(&bytes[HEADER_SIZE..]));
}

#[test]
fn test_operation_table_name() {
    assert_eq!(put("BOOK", b"k", b"v").table(), "BOOK");
    assert_eq!(
        Operation::CreateTable { table: "ISBN".to_string() }.table(),
        "ISBN"
    );
}

// =============================================================================
// CRC Corruption Detection Tests
// =============================================================================

#[test]
fn test_crc_corruption_detected() {
    let mut bytes = sample_entry(1).serialize().unwrap();

    // Flip a bit in the body
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(ShelfError::WalCorruption(_))));
}

#[test]
fn test_corrupted_crc_field_detected() {
    let mut bytes = sample_entry(1).serialize().unwrap();
    bytes[8] ^= 0xFF;

    let err = WalEntry::deserialize(&bytes).unwrap_err();
    assert!(err.to_string().contains("CRC mismatch"));
}

#[test]
fn test_header_lsn_mismatch_detected() {
    let mut bytes = sample_entry(5).serialize().unwrap();

    // Rewrite the header LSN; the body still says 5
    bytes[0..8].copy_from_slice(&6u64.to_be_bytes());

    let err = WalEntry::deserialize(&bytes).unwrap_err();
    assert!(err.to_string().contains("does not match"));
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncated_header() {
    let bytes = sample_entry(1).serialize().unwrap();

    let result = WalEntry::deserialize(&bytes[..HEADER_SIZE - 1]);
    assert!(matches!(result, Err(ShelfError::WalCorruption(_))));
}

#[test]
fn test_truncated_body() {
    let bytes = sample_entry(1).serialize().unwrap();

    let result = WalEntry::deserialize(&bytes[..bytes.len() - 3]);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("incomplete entry"));
}

#[test]
fn test_oversized_length_rejected() {
    let mut bytes = sample_entry(1).serialize().unwrap();
    bytes[12..16].copy_from_slice(&u32::MAX.to_be_bytes());

    let err = WalEntry::deserialize(&bytes).unwrap_err();
    assert!(err.to_string().contains("exceeds maximum"));
}
