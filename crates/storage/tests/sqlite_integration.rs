use std::collections::BTreeSet;

use chrono::NaiveDate;
use sqlx::Row;
use storage::repository::{StorageError, UserRecordRepository};
use storage::sqlite::SqliteUserStore;
use trace_core::model::{TaskId, UserId, UserRecord};

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn task(id: &str) -> TaskId {
    TaskId::new(id).unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

async fn connect(db: &str) -> SqliteUserStore {
    let url = format!("sqlite:file:{db}?mode=memory&cache=shared");
    let store = SqliteUserStore::connect(&url).await.expect("connect");
    store.migrate().await.expect("migrate");
    store
}

#[tokio::test]
async fn sqlite_round_trips_dates_and_task_set() {
    let store = connect("memdb_roundtrip").await;
    let id = user("alice");

    let record = UserRecord {
        streak: 3,
        last_streak_date: Some(date("2024-03-09")),
        last_task_date: Some(date("2024-03-09")),
        completed_tasks: BTreeSet::from([task("parietal"), task("cerebellum")]),
    };
    store.insert_new(&id, &record).await.unwrap();

    let fetched = store.get(&id).await.unwrap().expect("record");
    assert_eq!(fetched, record);
}

#[tokio::test]
async fn sqlite_missing_user_reads_as_none_and_fails_update() {
    let store = connect("memdb_missing").await;
    let id = user("ghost");

    assert!(store.get(&id).await.unwrap().is_none());

    let err = store.update_with(&id, &|_| {}).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_duplicate_insert_conflicts() {
    let store = connect("memdb_conflict").await;
    let id = user("alice");
    store.insert_new(&id, &UserRecord::new()).await.unwrap();

    let err = store.insert_new(&id, &UserRecord::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_update_applies_mutation_and_bumps_version() {
    let store = connect("memdb_update").await;
    let id = user("alice");
    store.insert_new(&id, &UserRecord::new()).await.unwrap();

    let today = date("2024-03-10");
    for i in 0..5 {
        let t = task(&format!("task-{i}"));
        store
            .update_with(&id, &move |record| {
                record.record_task(t.clone(), today);
            })
            .await
            .unwrap();
    }

    let fetched = store.get(&id).await.unwrap().unwrap();
    assert_eq!(fetched.streak, 1);
    assert_eq!(fetched.completed_tasks.len(), 5);
    assert_eq!(fetched.last_streak_date, Some(today));

    let row = sqlx::query("SELECT version FROM users WHERE user_id = ?1")
        .bind(id.as_str())
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(row.try_get::<i64, _>("version").unwrap(), 5);
}

#[tokio::test]
async fn sqlite_interleaved_updates_from_two_handles_keep_every_write() {
    let store = connect("memdb_interleaved").await;
    let id = user("alice");
    store.insert_new(&id, &UserRecord::new()).await.unwrap();

    // Two clones of the store alternating updates against the same record;
    // each write must see the other's, never a stale snapshot.
    let other = store.clone();
    let today = date("2024-03-10");
    for i in 0..6 {
        let handle = if i % 2 == 0 { &store } else { &other };
        let t = task(&format!("task-{i}"));
        handle
            .update_with(&id, &move |record| {
                record.record_task(t.clone(), today);
            })
            .await
            .unwrap();
    }

    let fetched = store.get(&id).await.unwrap().unwrap();
    assert_eq!(fetched.completed_tasks.len(), 6);
    assert_eq!(fetched.streak, 1);
}
