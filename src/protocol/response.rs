//! Response definitions
//!
//! Represents responses to clients.

use crate::catalog::Book;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Error = 0x01,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Zero or more books (empty for errors, deletes and pings)
    pub books: Vec<Book>,

    /// Error message, set only for `Status::Error`
    pub message: Option<String>,
}

impl Response {
    /// Create an OK response carrying `books`
    pub fn ok(books: Vec<Book>) -> Self {
        Self {
            status: Status::Ok,
            books,
            message: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            books: Vec::new(),
            message: Some(message.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}
