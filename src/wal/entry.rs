//! WAL Entry definitions
//!
//! Defines the structure of individual log entries. One entry holds every
//! operation of one committed transaction, so a torn or corrupted entry is
//! discarded as a whole.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShelfError};

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest body accepted when reading a frame (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - strictly increasing within a file
    pub lsn: u64,

    /// Operations committed together
    pub ops: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create an empty named table
    CreateTable { table: String },

    /// Put a key-value pair into a table
    Put {
        table: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Delete a key from a table
    Delete { table: String, key: Vec<u8> },

    /// Record the last sequence number handed out for a table
    SetSequence { table: String, value: u64 },
}

impl Operation {
    /// Name of the table this operation touches
    pub fn table(&self) -> &str {
        match self {
            Operation::CreateTable { table }
            | Operation::Put { table, .. }
            | Operation::Delete { table, .. }
            | Operation::SetSequence { table, .. } => table,
        }
    }
}

/// Decoded frame header
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl FrameHeader {
    pub(crate) fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[12..16]);

        Self {
            lsn: u64::from_be_bytes(lsn),
            crc: u32::from_be_bytes(crc),
            len: u32::from_be_bytes(len),
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, ops: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self { lsn, ops, timestamp }
    }

    /// Serialize into a framed record: header followed by the bincode body
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)
            .map_err(|e| ShelfError::Serialization(format!("WAL entry {}: {}", self.lsn, e)))?;

        if body.len() > MAX_ENTRY_SIZE as usize {
            return Err(ShelfError::WalWrite(format!(
                "entry {} is {} bytes (max {})",
                self.lsn,
                body.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let crc = Self::compute_crc(&body);

        let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
        frame.extend_from_slice(&self.lsn.to_be_bytes());
        frame.extend_from_slice(&crc.to_be_bytes());
        frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
        frame.extend_from_slice(&body);

        Ok(frame)
    }

    /// Deserialize one complete frame, verifying length, CRC and LSN
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ShelfError::WalCorruption(format!(
                "frame too short: {} bytes (header is {})",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&bytes[..HEADER_SIZE]);
        let header = FrameHeader::parse(&raw);

        if header.len > MAX_ENTRY_SIZE {
            return Err(ShelfError::WalCorruption(format!(
                "entry length {} exceeds maximum {}",
                header.len, MAX_ENTRY_SIZE
            )));
        }

        let end = HEADER_SIZE + header.len as usize;
        if bytes.len() < end {
            return Err(ShelfError::WalCorruption(format!(
                "incomplete entry: expected {} bytes, got {}",
                end,
                bytes.len()
            )));
        }

        let body = &bytes[HEADER_SIZE..end];
        let actual = Self::compute_crc(body);
        if actual != header.crc {
            return Err(ShelfError::WalCorruption(format!(
                "CRC mismatch for LSN {}: stored {:08x}, computed {:08x}",
                header.lsn, header.crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(body)
            .map_err(|e| ShelfError::WalCorruption(format!("LSN {}: {}", header.lsn, e)))?;

        if entry.lsn != header.lsn {
            return Err(ShelfError::WalCorruption(format!(
                "header LSN {} does not match body LSN {}",
                header.lsn, entry.lsn
            )));
        }

        Ok(entry)
    }

    /// CRC32 over an encoded body
    pub fn compute_crc(body: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(body);
        hasher.finalize()
    }
}
