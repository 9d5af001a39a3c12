//! # Bookshelf
//!
//! A book catalog served over TCP, with:
//! - An embedded, ordered key-value store with named tables
//! - Atomic multi-table transactions logged to a single WAL file
//! - Crash recovery with partial write handling
//! - A secondary ISBN index kept consistent with the primary table
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Worker Thread Pool)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Catalog                                 │
//! │        create / lookup by id / lookup by ISBN / delete       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Store                                  │
//! │     BOOK table (id → record)   ISBN table (isbn → id)        │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!                ┌─────────────┐
//!                │     WAL     │
//!                │ (store file)│
//!                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod store;
pub mod catalog;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ShelfError, Result};
pub use config::{Config, IsbnPolicy};
pub use catalog::{Book, Catalog, Criterion};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Bookshelf
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
