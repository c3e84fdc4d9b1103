//! HabitGuard core library: domain types, configuration, evaluation and
//! scheduling.
//!
//! - [`types`]: tasks, weekday masks, blocking state, domain normalisation
//! - [`config`]: YAML config load / save / init
//! - [`evaluator`]: desired blocking state and diffing
//! - [`schedule`]: next wake-up computation
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod evaluator;
pub mod schedule;
pub mod types;

pub use config::{Config, LogFormat};
pub use error::ConfigError;
pub use evaluator::{diff, evaluate, is_overdue, BlockingDiff};
pub use schedule::{next_wake, WakePlan, WakeReason};
pub use types::{
    normalize_domain, normalize_domains, ActiveDays, BlockingState, RecordStatus, Task, TaskId,
    TaskRecord, TaskSnapshot,
};
