//! Book and lookup criterion definitions

use serde::{Deserialize, Serialize};

/// A catalog entry
///
/// `id` is assigned by the catalog on create; `0` means "not yet assigned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub author: String,
    pub title: String,
    pub isbn13: String,
}

impl Book {
    /// A book that has not been stored yet
    pub fn draft(
        author: impl Into<String>,
        title: impl Into<String>,
        isbn13: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            author: author.into(),
            title: title.into(),
            isbn13: isbn13.into(),
        }
    }

    /// The same book carrying `id`
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn is_draft(&self) -> bool {
        self.id == 0
    }
}

/// How a lookup selects its book
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// By catalog-assigned id
    Id(u64),

    /// By ISBN-13, compared byte for byte
    Isbn(String),
}
