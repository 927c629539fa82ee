//! Storage layer: the repository contract and its SQLite implementation.

pub mod error;
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteRepository;
