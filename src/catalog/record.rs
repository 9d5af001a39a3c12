//! Record codec
//!
//! Converts a [`Book`] to and from the bytes stored in the primary table.
//! The stored form is bincode with fixed-width integers, so equal books
//! always encode to equal bytes.

use bincode::Options;

use crate::error::{Result, ShelfError};
use super::Book;

/// Largest stored record accepted on decode (16 MB)
pub const MAX_RECORD_SIZE: u64 = 16 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit(MAX_RECORD_SIZE)
        .reject_trailing_bytes()
}

/// Encode a book for storage
pub fn encode(book: &Book) -> Result<Vec<u8>> {
    options()
        .serialize(book)
        .map_err(|e| ShelfError::Serialization(format!("book {}: {}", book.id, e)))
}

/// Decode a stored book
///
/// Any bytes that do not form exactly one book are a `CorruptRecord`.
pub fn decode(bytes: &[u8]) -> Result<Book> {
    options()
        .deserialize(bytes)
        .map_err(|e| ShelfError::CorruptRecord(format!("undecodable book record: {}", e)))
}
