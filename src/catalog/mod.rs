//! Catalog Module
//!
//! The book catalog, built on two tables of the embedded store.
//!
//! ## Tables
//! - `BOOK`: big-endian `u64` id → encoded [`Book`]
//! - `ISBN`: raw ISBN-13 bytes → big-endian `u64` id
//!
//! Every index entry points at a stored book carrying that ISBN. Create and
//! delete touch both tables inside one write transaction, so the pair is
//! either updated together or not at all.

mod book;
pub mod record;

pub use book::{Book, Criterion};

use crate::config::{Config, IsbnPolicy};
use crate::error::{Result, ShelfError};
use crate::protocol::Command;
use crate::store::{ReadTxn, Store};

/// Primary table name
pub const BOOK_TABLE: &str = "BOOK";

/// Secondary index table name
pub const ISBN_TABLE: &str = "ISBN";

/// The book catalog
///
/// All operations take `&self`; share it between request handlers with an
/// `Arc`.
pub struct Catalog {
    store: Store,
    isbn_policy: IsbnPolicy,
}

impl Catalog {
    /// Open the store and make sure both tables exist
    pub fn open(config: &Config) -> Result<Self> {
        let store = Store::open(config)?;

        let created = store.update(|txn| {
            let book = txn.create_table_if_absent(BOOK_TABLE);
            let isbn = txn.create_table_if_absent(ISBN_TABLE);
            Ok(book || isbn)
        })?;

        if created {
            tracing::debug!("Initialized catalog tables in {}", store.path().display());
        }

        Ok(Self {
            store,
            isbn_policy: config.isbn_policy,
        })
    }

    /// Execute a command
    ///
    /// Routes requests to the matching operation. Every successful result is
    /// a list of zero or more books.
    pub fn execute(&self, command: Command) -> Result<Vec<Book>> {
        match command {
            Command::CreateBook { book } => Ok(vec![self.create(book)?]),
            Command::GetBook { criterion } => self.lookup(criterion),
            Command::DeleteBook { id } => {
                self.delete(id)?;
                Ok(Vec::new())
            }
            Command::Ping => Ok(Vec::new()),
        }
    }

    /// Look up by criterion, returning zero or one book
    pub fn lookup(&self, criterion: Criterion) -> Result<Vec<Book>> {
        let found = match criterion {
            Criterion::Id(id) => self.lookup_by_id(id)?,
            Criterion::Isbn(isbn) => self.lookup_by_isbn(&isbn)?,
        };
        Ok(found.into_iter().collect())
    }

    /// Store a new book and return it with its assigned id
    ///
    /// Ids come from a persistent per-table sequence: each is greater than
    /// every id handed out before, including ids of deleted books.
    pub fn create(&self, draft: Book) -> Result<Book> {
        if self.isbn_policy == IsbnPolicy::Reject && draft.isbn13.is_empty() {
            return Err(ShelfError::InvalidBook("isbn13 must not be empty".to_string()));
        }

        let book = self.store.update(|txn| {
            let existing = txn.get(ISBN_TABLE, draft.isbn13.as_bytes())?;
            if let Some(previous) = existing {
                match self.isbn_policy {
                    IsbnPolicy::Reject => {
                        return Err(ShelfError::DuplicateIsbn(draft.isbn13.clone()));
                    }
                    IsbnPolicy::LastWriteWins => {
                        tracing::debug!(
                            "ISBN {:?} moves from book {} to a new book",
                            draft.isbn13,
                            decode_id(&previous)?
                        );
                    }
                }
            }

            let id = txn.next_sequence(BOOK_TABLE)?;
            let book = Book { id, ..draft };
            let key = id_key(id);

            txn.put(BOOK_TABLE, &key, record::encode(&book)?)?;
            txn.put(ISBN_TABLE, book.isbn13.as_bytes(), key.to_vec())?;
            Ok(book)
        })?;

        tracing::debug!("Created book {} (isbn {:?})", book.id, book.isbn13);
        Ok(book)
    }

    /// Get a book by id
    pub fn lookup_by_id(&self, id: u64) -> Result<Option<Book>> {
        self.store.view(|txn| read_book(txn, id))
    }

    /// Get a book by ISBN
    ///
    /// The index read and the record read share one snapshot.
    pub fn lookup_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        self.store.view(|txn| {
            let id = match txn.get(ISBN_TABLE, isbn.as_bytes())? {
                Some(raw) => decode_id(raw)?,
                None => return Ok(None),
            };

            let book = read_book(txn, id)?;
            if let Some(book) = &book {
                if book.isbn13 != isbn {
                    return Err(ShelfError::CorruptRecord(format!(
                        "index entry {:?} points at book {} with isbn {:?}",
                        isbn, id, book.isbn13
                    )));
                }
            }
            Ok(book)
        })
    }

    /// Remove a book and its index entry
    ///
    /// Deleting an id that is not stored succeeds and changes nothing. The
    /// index entry is removed only while it still points at `id`; under
    /// [`IsbnPolicy::LastWriteWins`] it may already belong to a newer book.
    pub fn delete(&self, id: u64) -> Result<()> {
        let removed = self.store.update(|txn| {
            let key = id_key(id);
            let book = match txn.get(BOOK_TABLE, &key)? {
                Some(raw) => record::decode(&raw)?,
                None => return Ok(None),
            };

            let isbn = book.isbn13.as_bytes();
            if let Some(indexed) = txn.get(ISBN_TABLE, isbn)? {
                if decode_id(&indexed)? == id {
                    txn.delete(ISBN_TABLE, isbn)?;
                }
            }
            txn.delete(BOOK_TABLE, &key)?;
            Ok(Some(book))
        })?;

        match removed {
            Some(book) => tracing::debug!("Deleted book {} (isbn {:?})", id, book.isbn13),
            None => tracing::debug!("Delete of absent book {} ignored", id),
        }
        Ok(())
    }

    /// Number of stored books
    pub fn len(&self) -> Result<usize> {
        self.store.view(|txn| txn.len(BOOK_TABLE))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Close the catalog, syncing the store file
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}

/// Primary key for `id`: 8 bytes, big-endian, so key order is id order
pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Inverse of [`id_key`]; anything but 8 bytes is a corrupt index value
pub fn decode_id(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        ShelfError::CorruptRecord(format!("expected 8-byte id, found {} bytes", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(raw))
}

fn read_book(txn: &ReadTxn<'_>, id: u64) -> Result<Option<Book>> {
    let book = match txn.get(BOOK_TABLE, &id_key(id))? {
        Some(raw) => record::decode(raw)?,
        None => return Ok(None),
    };

    if book.id != id {
        return Err(ShelfError::CorruptRecord(format!(
            "record stored under id {} carries id {}",
            id, book.id
        )));
    }
    Ok(Some(book))
}
