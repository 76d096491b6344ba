#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{InMemoryUserStore, StorageError, UserRecordRepository};
pub use sqlite::{SqliteInitError, SqliteUserStore};
