use trace_core::model::{UserId, UserRecord};

use super::SqliteUserStore;
use super::mapping::{date_to_text, record_from_row, tasks_to_json};
use crate::repository::{RecordMutation, StorageError, UserRecordRepository};

/// Attempts before an optimistic update gives up with `Conflict`.
const MAX_UPDATE_ATTEMPTS: u32 = 5;

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}

impl SqliteUserStore {
    async fn fetch_versioned(
        &self,
        id: &UserId,
    ) -> Result<Option<(UserRecord, i64)>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT version, streak, last_streak_date, last_task_date, completed_tasks
            FROM users WHERE user_id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        match row {
            Some(row) => record_from_row(&row).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl UserRecordRepository for SqliteUserStore {
    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.fetch_versioned(id).await?.map(|(record, _)| record))
    }

    async fn insert_new(&self, id: &UserId, record: &UserRecord) -> Result<(), StorageError> {
        let tasks = tasks_to_json(&record.completed_tasks)?;

        sqlx::query(
            r"
            INSERT INTO users (user_id, version, streak, last_streak_date, last_task_date, completed_tasks)
            VALUES (?1, 0, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id.as_str())
        .bind(i64::from(record.streak))
        .bind(date_to_text(record.last_streak_date))
        .bind(date_to_text(record.last_task_date))
        .bind(tasks)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                conn_err(e)
            }
        })?;

        Ok(())
    }

    async fn update_with(
        &self,
        id: &UserId,
        apply: RecordMutation<'_>,
    ) -> Result<UserRecord, StorageError> {
        // Optimistic conditional update: re-read, mutate, and write back
        // guarded on the version column. A lost race re-reads fresh state.
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let (mut record, version) = self
                .fetch_versioned(id)
                .await?
                .ok_or(StorageError::NotFound)?;

            apply(&mut record);
            let tasks = tasks_to_json(&record.completed_tasks)?;

            let result = sqlx::query(
                r"
                UPDATE users
                SET version = ?1,
                    streak = ?2,
                    last_streak_date = ?3,
                    last_task_date = ?4,
                    completed_tasks = ?5
                WHERE user_id = ?6 AND version = ?7
                ",
            )
            .bind(version + 1)
            .bind(i64::from(record.streak))
            .bind(date_to_text(record.last_streak_date))
            .bind(date_to_text(record.last_task_date))
            .bind(tasks)
            .bind(id.as_str())
            .bind(version)
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

            if result.rows_affected() == 1 {
                return Ok(record);
            }
        }

        Err(StorageError::Conflict)
    }
}
