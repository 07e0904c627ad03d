//! Sparkmill Storage Layer
//!
//! Implements the `JobTracker` and `ArtifactSink` traits on SQLite, plus
//! in-memory equivalents for tests and dry runs.
//!
//! # Architecture
//!
//! - SQLite for job records and persisted ideas
//! - An idea is stored with its trend summary, monetization plan and
//!   scoring as separate rows, written in one transaction
//! - The complete artifact is also kept as JSON for lossless reloads
//!
//! # Examples
//!
//! ```no_run
//! use sparkmill_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for job and idea operations
//! ```

#![warn(missing_docs)]

mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::{MemoryArtifactStore, MemoryJobStore};
pub use sqlite::SqliteStore;
