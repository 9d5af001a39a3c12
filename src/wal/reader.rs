//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, ShelfError};
use super::entry::FrameHeader;
use super::{WalEntry, HEADER_SIZE, MAX_ENTRY_SIZE};

/// What the reader found at its current position
#[derive(Debug)]
pub(crate) enum Frame {
    /// A complete, verified entry
    Entry(WalEntry),

    /// Clean end of file
    End,

    /// The file ends partway through a frame (crash mid-append)
    Torn,

    /// A complete frame that failed validation
    Corrupt(String),
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Byte offset just past the last complete entry returned
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file. Torn and corrupted frames
    /// are reported as `WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.next_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Torn => Err(ShelfError::WalCorruption(format!(
                "truncated entry at offset {}",
                self.position
            ))),
            Frame::Corrupt(reason) => Err(ShelfError::WalCorruption(format!(
                "offset {}: {}",
                self.position, reason
            ))),
        }
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last complete entry
    pub fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        let read = self.read_full(&mut header)?;
        if read == 0 {
            return Ok(Frame::End);
        }
        if read < HEADER_SIZE {
            return Ok(Frame::Torn);
        }

        let parsed = FrameHeader::parse(&header);
        if parsed.len > MAX_ENTRY_SIZE {
            return Ok(Frame::Corrupt(format!(
                "entry length {} exceeds maximum {}",
                parsed.len, MAX_ENTRY_SIZE
            )));
        }

        let mut frame = vec![0u8; HEADER_SIZE + parsed.len as usize];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        let body_read = self.read_full(&mut frame[HEADER_SIZE..])?;
        if body_read < parsed.len as usize {
            return Ok(Frame::Torn);
        }

        match WalEntry::deserialize(&frame) {
            Ok(entry) => {
                self.position += frame.len() as u64;
                Ok(Frame::Entry(entry))
            }
            Err(ShelfError::WalCorruption(reason)) => Ok(Frame::Corrupt(reason)),
            Err(e) => Err(e),
        }
    }

    /// Fill `buf` as far as the file allows, returning the bytes read
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

/// Iterator over WAL entries
///
/// Yields every valid entry, then at most one error if the log ends in a
/// torn or corrupted frame.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
