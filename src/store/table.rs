//! Table implementation
//!
//! BTreeMap-based ordered tables. Keys iterate in byte order, so fixed-width
//! big-endian integer keys iterate in numeric order.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::wal::Operation;

/// One named, ordered key-value table
#[derive(Debug, Default, Clone)]
pub struct Table {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Last sequence number handed out; never decreases
    sequence: u64,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Vec<u8>> {
        self.entries.iter()
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn set_sequence(&mut self, value: u64) {
        // A replayed log may carry an older value after a newer one only if
        // it is damaged; keep the highest seen so ids are never reissued.
        self.sequence = self.sequence.max(value);
    }
}

/// The committed state of every table in a store
#[derive(Debug, Default)]
pub struct Tables {
    tables: BTreeMap<String, Table>,
}

impl Tables {
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Table> {
        self.tables.iter()
    }

    /// Apply one logged operation
    ///
    /// Infallible: write transactions check table existence while staging,
    /// so a committed batch always applies in full.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::CreateTable { table } => {
                self.tables.entry(table.clone()).or_default();
            }
            Operation::Put { table, key, value } => {
                self.tables
                    .entry(table.clone())
                    .or_default()
                    .put(key.clone(), value.clone());
            }
            Operation::Delete { table, key } => {
                if let Some(t) = self.tables.get_mut(table) {
                    t.delete(key);
                }
            }
            Operation::SetSequence { table, value } => {
                self.tables
                    .entry(table.clone())
                    .or_default()
                    .set_sequence(*value);
            }
        }
    }
}
