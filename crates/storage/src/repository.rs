use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use trace_core::model::{UserId, UserRecord};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Mutation applied to a record inside `update_with`.
///
/// The closure may run more than once (adapters with optimistic concurrency
/// re-apply it to a freshly loaded record), so it must be a pure function of
/// the record and its captured values.
pub type RecordMutation<'a> = &'a (dyn Fn(&mut UserRecord) + Send + Sync);

/// Contract for the durable keyed user-record store.
///
/// `update_with` is the conditional/serializable per-record update the streak
/// aggregator relies on: concurrent updates to the same user id must not lose
/// writes, while different user ids need no coordination.
#[async_trait]
pub trait UserRecordRepository: Send + Sync {
    /// Fetch a record by user id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached or the record
    /// cannot be decoded. A missing record is `Ok(None)`, not an error.
    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError>;

    /// Create a record for a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already exists.
    async fn insert_new(&self, id: &UserId, record: &UserRecord) -> Result<(), StorageError>;

    /// Atomically read, mutate, and persist one record, returning the new
    /// state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist, and
    /// `StorageError::Conflict` if the update cannot be serialized against
    /// concurrent writers.
    async fn update_with(
        &self,
        id: &UserId,
        apply: RecordMutation<'_>,
    ) -> Result<UserRecord, StorageError>;
}

/// Simple in-memory store for testing and prototyping.
///
/// The whole-map mutex makes every `update_with` trivially serializable.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    records: Arc<Mutex<HashMap<UserId, UserRecord>>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<UserId, UserRecord>>, StorageError> {
        self.records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRecordRepository for InMemoryUserStore {
    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn insert_new(&self, id: &UserId, record: &UserRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.contains_key(id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(id.clone(), record.clone());
        Ok(())
    }

    async fn update_with(
        &self,
        id: &UserId,
        apply: RecordMutation<'_>,
    ) -> Result<UserRecord, StorageError> {
        let mut guard = self.lock()?;
        let record = guard.get_mut(id).ok_or(StorageError::NotFound)?;
        apply(record);
        Ok(record.clone())
    }
}
