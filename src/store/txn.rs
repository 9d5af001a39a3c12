//! Read and write transactions
//!
//! A [`ReadTxn`] borrows the committed state under a shared lock, so every
//! read inside one transaction observes the same snapshot.
//!
//! A [`WriteTxn`] never touches the committed state. It stages operations in
//! an overlay that its own reads see through, and hands the staged batch to
//! the store on commit.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::error::{Result, ShelfError};
use crate::wal::Operation;
use super::table::{Table, Tables};

/// Read-only view of the committed state
pub struct ReadTxn<'a> {
    tables: &'a Tables,
}

impl<'a> ReadTxn<'a> {
    pub(crate) fn new(tables: &'a Tables) -> Self {
        Self { tables }
    }

    /// Whether a table exists
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    /// Get the value stored under `key`
    pub fn get(&self, table: &str, key: &[u8]) -> Result<Option<&'a [u8]>> {
        Ok(self.table(table)?.get(key))
    }

    /// Number of entries in a table
    pub fn len(&self, table: &str) -> Result<usize> {
        Ok(self.table(table)?.len())
    }

    /// Last sequence number handed out for a table
    pub fn sequence(&self, table: &str) -> Result<u64> {
        Ok(self.table(table)?.sequence())
    }

    fn table(&self, name: &str) -> Result<&'a Table> {
        self.tables
            .get(name)
            .ok_or_else(|| ShelfError::TableNotFound(name.to_string()))
    }
}

/// Staged mutations of one write transaction
pub struct WriteTxn<'a> {
    committed: &'a RwLock<Tables>,
    created: BTreeSet<String>,

    /// `None` marks a staged delete
    writes: BTreeMap<String, BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    sequences: BTreeMap<String, u64>,
    ops: Vec<Operation>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(committed: &'a RwLock<Tables>) -> Self {
        Self {
            committed,
            created: BTreeSet::new(),
            writes: BTreeMap::new(),
            sequences: BTreeMap::new(),
            ops: Vec::new(),
        }
    }

    /// Whether a table exists, counting tables created in this transaction
    pub fn has_table(&self, name: &str) -> bool {
        self.created.contains(name) || self.committed.read().contains(name)
    }

    /// Create a table unless it already exists; returns true if created
    pub fn create_table_if_absent(&mut self, name: &str) -> bool {
        if self.has_table(name) {
            return false;
        }
        self.created.insert(name.to_string());
        self.ops.push(Operation::CreateTable {
            table: name.to_string(),
        });
        true
    }

    /// Get the value under `key`, including this transaction's own writes
    pub fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_table(table)?;

        if let Some(staged) = self.writes.get(table).and_then(|w| w.get(key)) {
            return Ok(staged.clone());
        }

        Ok(self
            .committed
            .read()
            .get(table)
            .and_then(|t| t.get(key))
            .map(<[u8]>::to_vec))
    }

    /// Put a key-value pair
    pub fn put(&mut self, table: &str, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.ensure_table(table)?;

        self.writes
            .entry(table.to_string())
            .or_default()
            .insert(key.to_vec(), Some(value.clone()));
        self.ops.push(Operation::Put {
            table: table.to_string(),
            key: key.to_vec(),
            value,
        });
        Ok(())
    }

    /// Delete a key; returns whether a value was present
    pub fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool> {
        if self.get(table, key)?.is_none() {
            return Ok(false);
        }

        self.writes
            .entry(table.to_string())
            .or_default()
            .insert(key.to_vec(), None);
        self.ops.push(Operation::Delete {
            table: table.to_string(),
            key: key.to_vec(),
        });
        Ok(true)
    }

    /// Last sequence number handed out for a table
    pub fn sequence(&self, table: &str) -> Result<u64> {
        self.ensure_table(table)?;

        if let Some(&value) = self.sequences.get(table) {
            return Ok(value);
        }
        Ok(self
            .committed
            .read()
            .get(table)
            .map(Table::sequence)
            .unwrap_or(0))
    }

    /// Hand out the next sequence number for a table
    ///
    /// The counter is persisted with the transaction and never reused, even
    /// when the records that consumed earlier values are deleted.
    pub fn next_sequence(&mut self, table: &str) -> Result<u64> {
        let next = self.sequence(table)?.checked_add(1).ok_or_else(|| {
            ShelfError::StorageUnavailable(format!("sequence exhausted for table {}", table))
        })?;

        self.sequences.insert(table.to_string(), next);
        self.ops.push(Operation::SetSequence {
            table: table.to_string(),
            value: next,
        });
        Ok(next)
    }

    pub(crate) fn into_ops(self) -> Vec<Operation> {
        self.ops
    }

    fn ensure_table(&self, name: &str) -> Result<()> {
        if self.has_table(name) {
            Ok(())
        } else {
            Err(ShelfError::TableNotFound(name.to_string()))
        }
    }
}
