//! Decide which domains should be blocked right now.
//!
//! Blocking is all-or-nothing: if any task is overdue, every configured
//! domain is blocked. Completion is looked up by UTC date only, so a task
//! finished after its deadline still lifts blocking on the next evaluation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::types::{normalize_domains, BlockingState, Task, TaskId};

/// Whether `task` is overdue at `now`.
///
/// Overdue means: has a deadline, is active on today's UTC weekday, the
/// deadline-of-day is at or before the current time-of-day, and there is no
/// done/skipped record for today's UTC date.
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    if !task.is_pending_on(now) {
        return false;
    }
    task.deadline
        .map(|deadline| deadline <= now.time())
        .unwrap_or(false)
}

/// Ids of every overdue task.
pub fn overdue_task_ids(now: DateTime<Utc>, tasks: &[Task]) -> BTreeSet<TaskId> {
    tasks
        .iter()
        .filter(|task| is_overdue(task, now))
        .map(|task| task.id.clone())
        .collect()
}

/// Compute the desired blocking state.
pub fn evaluate<S: AsRef<str>>(
    now: DateTime<Utc>,
    tasks: &[Task],
    blocked_websites: &[S],
) -> BlockingState {
    let active_task_ids = overdue_task_ids(now, tasks);
    let blocked_domains = if active_task_ids.is_empty() {
        BTreeSet::new()
    } else {
        normalize_domains(blocked_websites)
    };

    BlockingState {
        blocked_domains,
        active_task_ids,
        last_evaluated_at: Some(now),
    }
}

/// Minimal change between what the hosts file holds and what is desired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockingDiff {
    pub to_block: BTreeSet<String>,
    pub to_unblock: BTreeSet<String>,
}

impl BlockingDiff {
    pub fn is_empty(&self) -> bool {
        self.to_block.is_empty() && self.to_unblock.is_empty()
    }
}

pub fn diff(current: &BTreeSet<String>, desired: &BlockingState) -> BlockingDiff {
    BlockingDiff {
        to_block: desired
            .blocked_domains
            .difference(current)
            .cloned()
            .collect(),
        to_unblock: current
            .difference(&desired.blocked_domains)
            .cloned()
            .collect(),
    }
}
