use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::TaskId;

/// Number of distinct daily tasks required to credit a streak day.
pub const TASK_THRESHOLD: usize = 5;

//
// ─── TASK OUTCOME ──────────────────────────────────────────────────────────────
//

/// Verdict for a single task submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Task counted (or already counted) but today's threshold is not met.
    Pending { remaining: usize },
    /// Threshold is met and the streak was already credited today.
    AlreadyCredited,
    /// Threshold reached with the streak last credited yesterday.
    Extended,
    /// Threshold reached after a gap (or for the first time); streak restarts at 1.
    Started,
}

//
// ─── USER RECORD ───────────────────────────────────────────────────────────────
//

/// Durable per-user streak state.
///
/// The record itself is a plain value; all persistence is owned by the store.
/// `completed_tasks` is a true set internally and only becomes an ordered
/// sequence at the store/transport boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub streak: u32,
    pub last_streak_date: Option<NaiveDate>,
    pub last_task_date: Option<NaiveDate>,
    pub completed_tasks: BTreeSet<TaskId>,
}

impl UserRecord {
    /// A fresh record for a newly registered user.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks completed today, as an ordered sequence for transport.
    #[must_use]
    pub fn tasks_sorted(&self) -> Vec<TaskId> {
        self.completed_tasks.iter().cloned().collect()
    }

    /// Record one task submission for `today`, crediting the streak when the
    /// daily threshold is reached.
    ///
    /// Idempotent per `(task, day)`: resubmitting a task on the same day
    /// changes nothing. A new calendar day clears the previous day's task set
    /// before the submission is counted.
    pub fn record_task(&mut self, task: TaskId, today: NaiveDate) -> TaskOutcome {
        if self.last_task_date != Some(today) {
            self.completed_tasks.clear();
            self.last_task_date = Some(today);
        }
        self.completed_tasks.insert(task);

        if self.completed_tasks.len() < TASK_THRESHOLD {
            return TaskOutcome::Pending {
                remaining: TASK_THRESHOLD - self.completed_tasks.len(),
            };
        }
        if self.last_streak_date == Some(today) {
            return TaskOutcome::AlreadyCredited;
        }

        let outcome = if self.last_streak_date.is_some()
            && self.last_streak_date == today.pred_opt()
        {
            self.streak += 1;
            TaskOutcome::Extended
        } else {
            self.streak = 1;
            TaskOutcome::Started
        };
        self.last_streak_date = Some(today);
        outcome
    }

    /// True when the last credited day is strictly older than yesterday, i.e.
    /// the streak chain is broken and must read as 0.
    ///
    /// A streak credited yesterday is still alive today (the one-day grace
    /// window); it only expires once a full calendar day has been missed.
    #[must_use]
    pub fn is_streak_stale(&self, today: NaiveDate) -> bool {
        match (self.last_streak_date, today.pred_opt()) {
            (Some(last), Some(yesterday)) => last < yesterday,
            _ => false,
        }
    }

    /// Zero out a stale streak. Returns true if a correction was applied.
    pub fn expire_stale_streak(&mut self, today: NaiveDate) -> bool {
        if self.is_streak_stale(today) && self.streak != 0 {
            self.streak = 0;
            return true;
        }
        false
    }

    /// Unconditionally clear streak state and today's task set.
    pub fn reset_streak(&mut self) {
        self.streak = 0;
        self.last_streak_date = None;
        self.completed_tasks.clear();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
