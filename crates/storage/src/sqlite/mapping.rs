use chrono::NaiveDate;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::collections::BTreeSet;

use crate::repository::StorageError;
use trace_core::model::{TaskId, UserRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn date_to_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

pub(crate) fn date_from_text(text: Option<String>) -> Result<Option<NaiveDate>, StorageError> {
    text.map(|s| s.parse::<NaiveDate>().map_err(ser)).transpose()
}

pub(crate) fn tasks_to_json(tasks: &BTreeSet<TaskId>) -> Result<String, StorageError> {
    let ordered: Vec<&TaskId> = tasks.iter().collect();
    serde_json::to_string(&ordered).map_err(ser)
}

pub(crate) fn tasks_from_json(json: &str) -> Result<BTreeSet<TaskId>, StorageError> {
    let ordered: Vec<TaskId> = serde_json::from_str(json).map_err(ser)?;
    Ok(ordered.into_iter().collect())
}

pub(crate) fn record_from_row(row: &SqliteRow) -> Result<(UserRecord, i64), StorageError> {
    let version = row.try_get::<i64, _>("version").map_err(ser)?;
    let streak = u32::try_from(row.try_get::<i64, _>("streak").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("streak overflow".into()))?;

    let record = UserRecord {
        streak,
        last_streak_date: date_from_text(
            row.try_get::<Option<String>, _>("last_streak_date")
                .map_err(ser)?,
        )?,
        last_task_date: date_from_text(
            row.try_get::<Option<String>, _>("last_task_date")
                .map_err(ser)?,
        )?,
        completed_tasks: tasks_from_json(&row.try_get::<String, _>("completed_tasks").map_err(ser)?)?,
    };

    Ok((record, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_round_trip_as_plain_text() {
        let date: NaiveDate = "2024-03-10".parse().unwrap();
        let text = date_to_text(Some(date));
        assert_eq!(text.as_deref(), Some("2024-03-10"));
        assert_eq!(date_from_text(text).unwrap(), Some(date));
        assert_eq!(date_from_text(None).unwrap(), None);
    }

    #[test]
    fn malformed_date_is_a_serialization_error() {
        let err = date_from_text(Some("10/03/2024".into())).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn task_sets_round_trip_in_sorted_order() {
        let tasks: BTreeSet<TaskId> = ["zeta", "alpha", "mid"]
            .into_iter()
            .map(|s| TaskId::new(s).unwrap())
            .collect();

        let json = tasks_to_json(&tasks).unwrap();
        assert_eq!(json, r#"["alpha","mid","zeta"]"#);
        assert_eq!(tasks_from_json(&json).unwrap(), tasks);
    }
}
