//! CareHero Storage Layer
//!
//! Implements the `SessionStore` trait and the per-session JSON archive.
//!
//! # Architecture
//!
//! - `InMemorySessionStore`: process-wide map with TTL and capacity eviction
//! - `SqliteSessionStore`: SQLite table holding one JSON-encoded record per session
//! - `JsonArchive`: newline-free JSON files for snapshot history and discovery output
//!
//! Malformed persisted data is logged and treated as absent, never fatal.
//!
//! # Examples
//!
//! ```
//! use carehero_domain::{PatientRecord, SessionStore};
//! use carehero_store::InMemorySessionStore;
//!
//! let mut store = InMemorySessionStore::new();
//! store.put(PatientRecord::new("s-1")).unwrap();
//! assert!(store.get("s-1").unwrap().is_some());
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod memory;
pub mod sqlite;

use thiserror::Error;

pub use archive::JsonArchive;
pub use memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
