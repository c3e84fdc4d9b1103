//! Next wake-up computation for the deadline timer.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::{Task, TaskId};

/// Why the scheduler will wake up next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WakeReason {
    /// A pending task reaches its deadline.
    Deadline { task_id: TaskId },
    /// Nothing is left today; re-evaluate when the UTC date changes.
    DayRollover,
}

/// A single armed wake-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WakePlan {
    pub at: DateTime<Utc>,
    pub reason: WakeReason,
}

impl WakePlan {
    /// Time left until the wake-up, clamped to zero.
    pub fn delay_from(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.at - now).to_std().unwrap_or_default()
    }
}

/// Soonest upcoming deadline among tasks that are still pending today.
///
/// Tasks already overdue are skipped (blocking is in effect or will be
/// confirmed by the next evaluation). With no future deadline left, the plan
/// falls back to the next UTC midnight.
pub fn next_wake(now: DateTime<Utc>, tasks: &[Task]) -> WakePlan {
    tasks
        .iter()
        .filter(|task| task.is_pending_on(now))
        .filter_map(|task| {
            task.deadline_on(now)
                .filter(|deadline| *deadline > now)
                .map(|deadline| (deadline, &task.id))
        })
        .min()
        .map(|(at, task_id)| WakePlan {
            at,
            reason: WakeReason::Deadline {
                task_id: task_id.clone(),
            },
        })
        .unwrap_or_else(|| WakePlan {
            at: next_midnight(now),
            reason: WakeReason::DayRollover,
        })
}

/// Start of the next UTC day.
pub fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now + Duration::days(1))
}
