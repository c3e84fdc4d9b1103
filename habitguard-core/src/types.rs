//! Domain types shared by the evaluator, the hosts editor and the daemon.
//!
//! Task data is owned by the external habit API; everything here is an
//! ephemeral snapshot that is refreshed on demand and never persisted.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a habit task.
///
/// The API may send ids as strings or integers; both deserialize into the
/// same string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawTaskId")]
pub struct TaskId(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTaskId {
    Text(String),
    Number(i64),
}

impl From<RawTaskId> for TaskId {
    fn from(raw: RawTaskId) -> Self {
        match raw {
            RawTaskId::Text(s) => Self(s),
            RawTaskId::Number(n) => Self(n.to_string()),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Seven-bit weekday mask: bit 0 = Monday … bit 6 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveDays(pub u8);

impl ActiveDays {
    pub const EVERY_DAY: ActiveDays = ActiveDays(0b0111_1111);
    pub const WEEKDAYS: ActiveDays = ActiveDays(0b0001_1111);

    pub fn from_days(days: &[Weekday]) -> Self {
        Self(
            days.iter()
                .fold(0u8, |mask, day| mask | (1 << day.num_days_from_monday())),
        )
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }
}

impl Default for ActiveDays {
    fn default() -> Self {
        Self::EVERY_DAY
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a task was settled on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Done,
    Skipped,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Done => write!(f, "done"),
            RecordStatus::Skipped => write!(f, "skipped"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One completion or skip record for a UTC calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub date: NaiveDate,
    pub status: RecordStatus,
}

/// A habit as exposed by the task source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub name: String,
    /// Deadline-of-day in UTC. `None` marks a checklist-only item.
    #[serde(
        default,
        with = "deadline_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<NaiveTime>,
    /// `None` means active every day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_days: Option<ActiveDays>,
    #[serde(default)]
    pub records: Vec<TaskRecord>,
}

impl Task {
    /// Whether the task is scheduled on `day`.
    pub fn is_active_on(&self, day: Weekday) -> bool {
        self.active_days.unwrap_or_default().contains(day)
    }

    /// Whether a done or skipped record exists for `date`.
    pub fn is_settled_on(&self, date: NaiveDate) -> bool {
        self.records.iter().any(|record| record.date == date)
    }

    /// Deadline on the same UTC date as `now`, if the task has one.
    pub fn deadline_on(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.deadline
            .map(|deadline| now.date_naive().and_time(deadline).and_utc())
    }

    /// Whether the task takes part in enforcement on the UTC day of `now`.
    pub fn is_pending_on(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some()
            && self.is_active_on(now.weekday())
            && !self.is_settled_on(now.date_naive())
    }
}

/// Everything fetched from the task source in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    #[serde(default)]
    pub blocked_websites: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// The blocking state the daemon believes is rendered in the hosts file.
///
/// `blocked_domains` is the full configured set while `active_task_ids` is
/// non-empty and empty otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockingState {
    pub blocked_domains: BTreeSet<String>,
    pub active_task_ids: BTreeSet<TaskId>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl BlockingState {
    pub fn is_blocking(&self) -> bool {
        !self.blocked_domains.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

/// Normalise a configured website into a bare host name.
///
/// Strips scheme, path, port, trailing dot and a leading `www.`; returns
/// `None` when nothing usable remains.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let mut host = raw.trim().to_ascii_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = host.strip_prefix(scheme) {
            host = rest.to_string();
        }
    }
    if let Some(idx) = host.find(['/', '?', '#']) {
        host.truncate(idx);
    }
    if let Some(idx) = host.find(':') {
        host.truncate(idx);
    }
    let host = host.trim_end_matches('.');
    // A bare `www` is the prefix with its dot trimmed away, not a host.
    let host = match host.strip_prefix("www.") {
        Some(rest) => rest,
        None if host == "www" => "",
        None => host,
    };

    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some(host.to_string())
}

/// Normalise and de-duplicate a list of configured websites.
pub fn normalize_domains<I, S>(raw: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|entry| normalize_domain(entry.as_ref()))
        .collect()
}

// ---------------------------------------------------------------------------
// Deadline (de)serialization: "HH:MM" or "HH:MM:SS"
// ---------------------------------------------------------------------------

mod deadline_format {
    use super::*;
    use serde::de::Error;

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => serializer.serialize_str(&time.format("%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveTime::parse_from_str(text, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                .map(Some)
                .map_err(|err| D::Error::custom(format!("invalid deadline '{text}': {err}"))),
        }
    }
}
