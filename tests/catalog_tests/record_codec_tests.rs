//! Tests for the stored book record format
//!
//! These tests verify:
//! - Every book decodes back to itself
//! - Encoding is deterministic
//! - Damaged bytes are reported as CorruptRecord

use bookshelf::catalog::record;
use bookshelf::{Book, ShelfError};
use proptest::prelude::*;

// =============================================================================
// Property Tests
// =============================================================================

fn arb_book() -> impl Strategy<Value = Book> {
    (any::<u64>(), ".{0,40}", ".{0,80}", "[0-9-]{0,17}").prop_map(|(id, author, title, isbn13)| {
        Book {
            id,
            author,
            title,
            isbn13,
        }
    })
}

proptest! {
    #[test]
    fn test_record_roundtrip(book in arb_book()) {
        let bytes = record::encode(&book).unwrap();
        prop_assert_eq!(record::decode(&bytes).unwrap(), book);
    }

    #[test]
    fn test_encoding_is_deterministic(book in arb_book()) {
        prop_assert_eq!(record::encode(&book).unwrap(), record::encode(&book.clone()).unwrap());
    }

    #[test]
    fn test_truncated_record_rejected(book in arb_book(), cut in 1usize..8) {
        let bytes = record::encode(&book).unwrap();
        let cut = cut.min(bytes.len());
        let result = record::decode(&bytes[..bytes.len() - cut]);
        prop_assert!(matches!(result, Err(ShelfError::CorruptRecord(_))));
    }
}

// =============================================================================
// Edge Case Tests
// =============================================================================

#[test]
fn test_empty_fields_roundtrip() {
    let book = Book::default();

    let bytes = record::encode(&book).unwrap();
    assert_eq!(record::decode(&bytes).unwrap(), book);
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = record::encode(&Book::draft("A", "T", "I").with_id(3)).unwrap();
    bytes.push(0);

    assert!(matches!(
        record::decode(&bytes),
        Err(ShelfError::CorruptRecord(_))
    ));
}

#[test]
fn test_garbage_rejected() {
    assert!(matches!(
        record::decode(b"not a book"),
        Err(ShelfError::CorruptRecord(_))
    ));
    assert!(matches!(record::decode(&[]), Err(ShelfError::CorruptRecord(_))));
}

#[test]
fn test_invalid_utf8_rejected() {
    let mut bytes = record::encode(&Book::draft("A", "T", "I").with_id(1)).unwrap();

    // The author's single byte follows the id and its 8-byte length
    assert_eq!(bytes[16], b'A');
    bytes[16] = 0xFF;

    assert!(matches!(
        record::decode(&bytes),
        Err(ShelfError::CorruptRecord(_))
    ));
}

#[test]
fn test_oversized_length_prefix_rejected() {
    let mut bytes = record::encode(&Book::draft("A", "T", "I").with_id(1)).unwrap();
    bytes[8..16].copy_from_slice(&u64::MAX.to_be_bytes());

    assert!(matches!(
        record::decode(&bytes),
        Err(ShelfError::CorruptRecord(_))
    ));
}
