//! Command definitions
//!
//! Represents requests from clients.

use crate::catalog::{Book, Criterion};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    CreateBook = 0x01,
    GetBook = 0x02,
    DeleteBook = 0x03,
    Ping = 0x04,
}

/// Criterion tags inside a GET_BOOK payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CriterionTag {
    Id = 0x01,
    Isbn = 0x02,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a new book; any id on the draft is ignored
    CreateBook { book: Book },

    /// Look a book up by id or ISBN
    GetBook { criterion: Criterion },

    /// Delete a book by id
    DeleteBook { id: u64 },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::CreateBook { .. } => CommandType::CreateBook,
            Command::GetBook { .. } => CommandType::GetBook,
            Command::DeleteBook { .. } => CommandType::DeleteBook,
            Command::Ping => CommandType::Ping,
        }
    }
}

impl Criterion {
    /// Wire tag for this criterion
    pub fn tag(&self) -> CriterionTag {
        match self {
            Criterion::Id(_) => CriterionTag::Id,
            Criterion::Isbn(_) => CriterionTag::Isbn,
        }
    }
}
