//! `habitguard status`: evaluate tasks locally and show what would be blocked.
//!
//! Nothing is written; the hosts file is only read to compare against.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use habitguard_core::{
    evaluate, is_overdue, next_wake, RecordStatus, Task, TaskId, WakePlan, WakeReason,
};

/// Arguments for `habitguard status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let config = super::load_config(&home)?;
        let snapshot = super::fetch_snapshot(&config)?;
        let editor = super::hosts_editor(&home, &config);
        let in_hosts = editor
            .read_managed_block()
            .with_context(|| format!("failed to read {}", config.hosts_path.display()))?;

        let now = Utc::now();
        let desired = evaluate(now, &snapshot.tasks, &snapshot.blocked_websites);
        let report = StatusReport {
            evaluated_at: now,
            blocking: desired.is_blocking(),
            desired_domains: desired.blocked_domains,
            hosts_domains: in_hosts,
            active_task_ids: desired.active_task_ids,
            next_wake: next_wake(now, &snapshot.tasks),
            tasks: snapshot
                .tasks
                .iter()
                .map(|task| TaskRow {
                    id: task.id.0.clone(),
                    name: task.name.clone(),
                    deadline: task.deadline.map(|d| d.format("%H:%M").to_string()),
                    state: task_state(task, now),
                })
                .collect(),
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report)
                    .context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(&report, &config.hosts_path.display().to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum TaskState {
    Overdue,
    Pending,
    Done,
    Skipped,
    OffToday,
    NoDeadline,
}

#[derive(Serialize)]
struct TaskRow {
    id: String,
    name: String,
    deadline: Option<String>,
    state: TaskState,
}

#[derive(Serialize)]
struct StatusReport {
    evaluated_at: DateTime<Utc>,
    blocking: bool,
    desired_domains: BTreeSet<String>,
    hosts_domains: BTreeSet<String>,
    active_task_ids: BTreeSet<TaskId>,
    next_wake: WakePlan,
    tasks: Vec<TaskRow>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "task")]
    name: String,
    #[tabled(rename = "deadline")]
    deadline: String,
    #[tabled(rename = "today")]
    state: &'static str,
}

fn task_state(task: &Task, now: DateTime<Utc>) -> TaskState {
    let today = now.date_naive();
    if let Some(record) = task.records.iter().find(|record| record.date == today) {
        return match record.status {
            RecordStatus::Done => TaskState::Done,
            RecordStatus::Skipped => TaskState::Skipped,
        };
    }
    if task.deadline.is_none() {
        return TaskState::NoDeadline;
    }
    if !task.is_active_on(now.weekday()) {
        return TaskState::OffToday;
    }
    if is_overdue(task, now) {
        TaskState::Overdue
    } else {
        TaskState::Pending
    }
}

fn state_label(state: TaskState) -> &'static str {
    match state {
        TaskState::Overdue => "OVERDUE",
        TaskState::Pending => "PENDING",
        TaskState::Done => "DONE",
        TaskState::Skipped => "SKIPPED",
        TaskState::OffToday => "OFF TODAY",
        TaskState::NoDeadline => "NO DEADLINE",
    }
}

fn print_table(report: &StatusReport, hosts_path: &str) {
    let overdue = report
        .tasks
        .iter()
        .filter(|row| row.state == TaskState::Overdue)
        .count();
    println!(
        "HabitGuard v{} | {} tasks | {} overdue | {}",
        env!("CARGO_PKG_VERSION"),
        report.tasks.len(),
        overdue,
        report.evaluated_at.format("%Y-%m-%d %H:%M UTC"),
    );

    if report.tasks.is_empty() {
        println!("No tasks returned by the task source.");
    } else {
        let rows: Vec<StatusTableRow> = report
            .tasks
            .iter()
            .map(|row| StatusTableRow {
                id: row.id.clone(),
                name: row.name.clone(),
                deadline: row.deadline.clone().unwrap_or_else(|| "-".to_string()),
                state: state_label(row.state),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    if report.blocking {
        println!(
            "{} {}",
            "■".red().bold(),
            format!("should block: {}", join(&report.desired_domains)).bold()
        );
    } else {
        println!("{} nothing should be blocked", "■".green().bold());
    }
    if report.hosts_domains.is_empty() {
        println!("{hosts_path}: no managed block");
    } else {
        println!("{hosts_path}: blocks {}", join(&report.hosts_domains));
    }
    println!("next wake-up: {}", describe_wake(&report.next_wake));

    if report.desired_domains != report.hosts_domains {
        println!(
            "{}",
            "hosts file differs; run 'habitguard daemon refresh' to apply.".yellow()
        );
    }
}

fn describe_wake(plan: &WakePlan) -> String {
    let at = plan.at.format("%Y-%m-%d %H:%M UTC");
    match &plan.reason {
        WakeReason::Deadline { task_id } => format!("{at} (deadline of task {})", task_id.0),
        WakeReason::DayRollover => format!("{at} (day rollover)"),
    }
}

fn join(domains: &BTreeSet<String>) -> String {
    domains.iter().cloned().collect::<Vec<_>>().join(", ")
}
