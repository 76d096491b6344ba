use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use storage::repository::{StorageError, UserRecordRepository};
use trace_core::model::{TaskId, TaskOutcome, UserId, UserRecord};
use trace_core::time::Clock;

use crate::error::StreakError;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// Transport-facing view of a user's streak state.
///
/// The task set is normalized to an ordered sequence here; internally it is a
/// true set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub streak: u32,
    pub last_streak_date: Option<NaiveDate>,
    pub last_task_date: Option<NaiveDate>,
    pub completed_tasks: Vec<TaskId>,
}

impl UserStats {
    fn from_record(record: &UserRecord) -> Self {
        Self {
            streak: record.streak,
            last_streak_date: record.last_streak_date,
            last_task_date: record.last_task_date,
            completed_tasks: record.tasks_sorted(),
        }
    }
}

/// Result of recording one task submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProgress {
    pub outcome: TaskOutcome,
    pub streak: u32,
    pub completed_tasks: Vec<TaskId>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Daily task and streak aggregation over the durable store.
///
/// Pure function of "now" and the persisted record: every operation re-reads
/// the record through the store's serializable update and holds no cache
/// across requests. Streak decay is evaluated lazily on read rather than by a
/// background sweep, so correctness never depends on another process being
/// alive.
pub struct StreakService {
    clock: Clock,
    users: Arc<dyn UserRecordRepository>,
}

impl StreakService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRecordRepository>) -> Self {
        Self {
            clock: Clock::default(),
            users,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Today's calendar date according to the service's clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn not_found(err: StorageError) -> StreakError {
        match err {
            StorageError::NotFound => StreakError::UserNotFound,
            other => StreakError::Storage(other),
        }
    }

    /// Create a fresh record for a new user.
    ///
    /// # Errors
    ///
    /// Returns `StreakError::AlreadyExists` if the user already has a record.
    pub async fn create_user(&self, user: &UserId) -> Result<UserStats, StreakError> {
        let record = UserRecord::new();
        match self.users.insert_new(user, &record).await {
            Ok(()) => Ok(UserStats::from_record(&record)),
            Err(StorageError::Conflict) => Err(StreakError::AlreadyExists),
            Err(err) => Err(err.into()),
        }
    }

    /// Record one task submission for today, crediting the streak when the
    /// daily threshold is reached.
    ///
    /// Idempotent per `(user, task, day)`.
    ///
    /// # Errors
    ///
    /// Returns `StreakError::UserNotFound` for an unknown user; store
    /// failures pass through untouched.
    pub async fn record_task(
        &self,
        user: &UserId,
        task: TaskId,
    ) -> Result<TaskProgress, StreakError> {
        let today = self.clock.today();

        // The mutation may be re-applied by adapters with optimistic
        // concurrency; the cell keeps the outcome of the attempt that stuck.
        let outcome = Mutex::new(None);
        let apply = |record: &mut UserRecord| {
            // a broken chain must never be read back at its old value
            record.expire_stale_streak(today);
            let verdict = record.record_task(task.clone(), today);
            *outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(verdict);
        };
        let record = self
            .users
            .update_with(user, &apply)
            .await
            .map_err(Self::not_found)?;

        let outcome = outcome
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .expect("a successful update ran the mutation");
        Ok(TaskProgress {
            outcome,
            streak: record.streak,
            completed_tasks: record.tasks_sorted(),
        })
    }

    /// Fetch a user's stats, lazily expiring a stale streak.
    ///
    /// If the last credited day is strictly older than yesterday the streak
    /// is corrected to 0 and persisted before anything is returned; fresh
    /// records are served from the read alone.
    ///
    /// # Errors
    ///
    /// Returns `StreakError::UserNotFound` for an unknown user.
    pub async fn stats(&self, user: &UserId) -> Result<UserStats, StreakError> {
        let today = self.clock.today();
        let record = self
            .users
            .get(user)
            .await?
            .ok_or(StreakError::UserNotFound)?;

        if !record.is_streak_stale(today) {
            return Ok(UserStats::from_record(&record));
        }

        let apply = move |record: &mut UserRecord| {
            record.expire_stale_streak(today);
        };
        let corrected = self
            .users
            .update_with(user, &apply)
            .await
            .map_err(Self::not_found)?;
        Ok(UserStats::from_record(&corrected))
    }

    /// Unconditionally zero out streak state and today's task set.
    ///
    /// # Errors
    ///
    /// Returns `StreakError::UserNotFound` for an unknown user.
    pub async fn reset_streak(&self, user: &UserId) -> Result<UserStats, StreakError> {
        let record = self
            .users
            .update_with(user, &UserRecord::reset_streak)
            .await
            .map_err(Self::not_found)?;
        Ok(UserStats::from_record(&record))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
