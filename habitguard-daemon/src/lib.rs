//! Enforcement daemon: evaluation worker, deadline scheduler, IPC socket
//! server and the matching blocking client.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;
pub mod task_source;

pub use error::{DaemonError, FetchError};
pub use protocol::{
    request_ping, request_refresh, request_reset, request_status, send_command, Command,
};
pub use runtime::{
    init_tracing, run, run_with, start_blocking, Clock, CycleReport, DaemonStatus, Phase,
    RuntimeSettings, TriggerSource,
};
pub use task_source::{FileTaskSource, HttpTaskSource, TaskSource};
