use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tokio::time::{Instant, MissedTickBehavior};

use habitguard_core::{
    config, diff, evaluate, next_wake, BlockingState, Config, LogFormat, TaskId, WakePlan,
};
use habitguard_hosts::{HostsEditor, WriteOutcome};

use crate::error::{io_err, DaemonError};
use crate::paths::{
    backups_dir, habitguard_root, socket_path, BIND_ATTEMPTS, BIND_RETRY_DELAY,
    MAX_COMMAND_BYTES, TRIGGER_QUEUE_DEPTH,
};
use crate::protocol::{error_reply, Command, REPLY_OK, REPLY_PONG};
use crate::task_source::{FileTaskSource, HttpTaskSource, TaskSource};

/// Wall-clock source used for evaluation and scheduling.
pub type Clock = fn() -> DateTime<Utc>;

pub type SharedStatus = Arc<RwLock<DaemonStatus>>;

/// Knobs the runtime needs beyond the task source and the hosts editor.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub socket_path: PathBuf,
    pub poll_interval: Duration,
    pub ipc_timeout: Duration,
    pub clock: Clock,
}

impl RuntimeSettings {
    pub fn from_config(home: &Path, config: &Config) -> Self {
        Self {
            socket_path: socket_path(home, config),
            poll_interval: config.poll_interval(),
            ipc_timeout: config.ipc_timeout(),
            clock: Utc::now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Evaluating,
    Applying,
    /// The last fetch or apply failed; the next trigger retries.
    Degraded,
}

/// Published snapshot of the daemon, served by the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub phase: Phase,
    pub blocking: BlockingState,
    pub next_wake: Option<WakePlan>,
    pub last_error: Option<String>,
    pub cycles: u64,
    pub started_at: DateTime<Utc>,
    pub hosts_path: PathBuf,
    pub task_source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Startup,
    Ipc,
    Timer,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Evaluate,
    Reset,
}

type CycleResult = Result<CycleReport, String>;

struct Trigger {
    job: Job,
    source: TriggerSource,
    respond_to: Option<oneshot::Sender<CycleResult>>,
}

impl Trigger {
    fn evaluate(source: TriggerSource) -> Self {
        Self {
            job: Job::Evaluate,
            source,
            respond_to: None,
        }
    }
}

/// Outcome of one evaluate-and-apply (or reset) cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub source: TriggerSource,
    /// Number of triggers served by this cycle.
    pub coalesced: usize,
    pub blocked: BTreeSet<String>,
    pub to_block: BTreeSet<String>,
    pub to_unblock: BTreeSet<String>,
    pub active_task_ids: BTreeSet<TaskId>,
    pub written: bool,
    pub duration_ms: u128,
}

/// Start the daemon runtime and block the current thread until it exits.
///
/// `json_logs` forces JSON log lines regardless of `log_format` in config.
pub fn start_blocking(home: &Path, json_logs: bool) -> Result<(), DaemonError> {
    let config = config::load_at(home)?;
    init_tracing(if json_logs {
        LogFormat::Json
    } else {
        config.log_format
    });
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), config))
}

/// Run the daemon against the configured task source and hosts file until a
/// signal arrives.
pub async fn run(home: PathBuf, config: Config) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let settings = RuntimeSettings::from_config(&home, &config);
    let source: Arc<dyn TaskSource> = match &config.task_file {
        Some(path) => Arc::new(FileTaskSource::new(path)),
        None => Arc::new(HttpTaskSource::new(&config.api_url, config.fetch_timeout())),
    };
    let editor = HostsEditor::new(&config.hosts_path, backups_dir(&home));

    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move { signal_task(shutdown).await })
    };

    tracing::info!(
        hosts = %config.hosts_path.display(),
        source = %source.describe(),
        socket = %settings.socket_path.display(),
        "starting habitguard daemon",
    );
    let result = run_with(settings, source, editor, shutdown_tx.clone()).await;
    let _ = shutdown_tx.send(());
    handle_join("signal_handler", signal_handle.await)?;
    if result.is_ok() {
        tracing::info!("habitguard daemon stopped; hosts file left as is");
    }
    result
}

/// Run the worker, scheduler and socket server until `shutdown` fires.
///
/// The socket is bound before anything touches the hosts file, so a fatal
/// startup error never mutates it.
pub async fn run_with(
    settings: RuntimeSettings,
    source: Arc<dyn TaskSource>,
    editor: HostsEditor,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let listener = bind_socket(&settings.socket_path).await?;

    let initial = match editor.read_managed_block() {
        Ok(domains) => BlockingState {
            blocked_domains: domains,
            ..BlockingState::default()
        },
        Err(err) => {
            tracing::warn!(error = %err, "could not read managed block at startup");
            BlockingState::default()
        }
    };
    let status: SharedStatus = Arc::new(RwLock::new(DaemonStatus {
        phase: Phase::Idle,
        blocking: initial.clone(),
        next_wake: None,
        last_error: None,
        cycles: 0,
        started_at: (settings.clock)(),
        hosts_path: editor.hosts_path().to_path_buf(),
        task_source: source.describe(),
    }));

    let (trigger_tx, trigger_rx) = mpsc::channel::<Trigger>(TRIGGER_QUEUE_DEPTH);
    let (plan_tx, plan_rx) = watch::channel::<Option<WakePlan>>(None);
    trigger_tx
        .send(Trigger::evaluate(TriggerSource::Startup))
        .await
        .map_err(|_| DaemonError::ChannelClosed("trigger queue"))?;

    let enforcer = Enforcer {
        source,
        editor: Arc::new(Mutex::new(editor)),
        state: initial,
        clock: settings.clock,
        status: status.clone(),
        plan_tx,
    };

    let worker_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let result = enforcement_task(enforcer, trigger_rx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let trigger_tx = trigger_tx.clone();
        let clock = settings.clock;
        let poll_interval = settings.poll_interval;
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let result =
                scheduler_task(clock, poll_interval, plan_rx, trigger_tx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let socket = settings.socket_path.clone();
        let ipc_timeout = settings.ipc_timeout;
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let result = socket_server_task(
                listener,
                socket,
                ipc_timeout,
                trigger_tx,
                status,
                shutdown_rx,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let (worker_result, scheduler_result, socket_result) =
        tokio::join!(worker_handle, scheduler_handle, socket_handle);

    handle_join("enforcement", worker_result)?;
    handle_join("scheduler", scheduler_result)?;
    handle_join("socket_server", socket_result)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Enforcement worker
// ---------------------------------------------------------------------------

/// Single writer of the hosts file. Owns the in-memory blocking state.
struct Enforcer {
    source: Arc<dyn TaskSource>,
    editor: Arc<Mutex<HostsEditor>>,
    state: BlockingState,
    clock: Clock,
    status: SharedStatus,
    plan_tx: watch::Sender<Option<WakePlan>>,
}

impl Enforcer {
    /// Serve a batch of triggers: each job kind runs once, in the order of
    /// its last request, and every waiter gets its job's outcome.
    async fn run_batch(&mut self, batch: Vec<Trigger>) {
        let order = job_order(batch.iter().map(|t| t.job));
        let mut evaluate_waiters = Vec::new();
        let mut reset_waiters = Vec::new();
        let mut evaluate_sources = Vec::new();
        for trigger in batch {
            match trigger.job {
                Job::Evaluate => {
                    evaluate_sources.push(trigger.source);
                    evaluate_waiters.extend(trigger.respond_to);
                }
                Job::Reset => reset_waiters.extend(trigger.respond_to),
            }
        }

        for job in order {
            let (outcome, waiters) = match job {
                Job::Evaluate => {
                    let source = evaluate_sources
                        .first()
                        .copied()
                        .unwrap_or(TriggerSource::Ipc);
                    let outcome = self.evaluate(source, evaluate_sources.len()).await;
                    (outcome, std::mem::take(&mut evaluate_waiters))
                }
                Job::Reset => {
                    let outcome = self.reset(reset_waiters.len()).await;
                    (outcome, std::mem::take(&mut reset_waiters))
                }
            };
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
    }

    async fn evaluate(&mut self, source: TriggerSource, coalesced: usize) -> CycleResult {
        let started = Instant::now();
        self.set_phase(Phase::Evaluating).await;

        let fetch_source = Arc::clone(&self.source);
        let snapshot = match tokio::task::spawn_blocking(move || fetch_source.fetch()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => return Err(self.degrade(source, err.to_string()).await),
            Err(err) => {
                return Err(self
                    .degrade(source, format!("fetch task join error: {err}"))
                    .await)
            }
        };

        let now = (self.clock)();
        let desired = evaluate(now, &snapshot.tasks, &snapshot.blocked_websites);
        self.set_phase(Phase::Applying).await;

        let editor = Arc::clone(&self.editor);
        let domains = desired.blocked_domains.clone();
        let applied = tokio::task::spawn_blocking(move || {
            let mut editor = lock_editor(&editor)?;
            let current = editor.read_managed_block()?;
            let outcome = editor.write(&domains)?;
            Ok::<_, DaemonError>((current, outcome))
        })
        .await;
        let (current, outcome) = match applied {
            Ok(Ok(applied)) => applied,
            Ok(Err(err)) => return Err(self.degrade(source, err.to_string()).await),
            Err(err) => {
                return Err(self
                    .degrade(source, format!("apply task join error: {err}"))
                    .await)
            }
        };

        let change = diff(&current, &desired);
        let plan = next_wake(now, &snapshot.tasks);
        let report = CycleReport {
            source,
            coalesced,
            blocked: desired.blocked_domains.clone(),
            to_block: change.to_block,
            to_unblock: change.to_unblock,
            active_task_ids: desired.active_task_ids.clone(),
            written: outcome.is_written(),
            duration_ms: started.elapsed().as_millis(),
        };
        self.state = desired;
        let _ = self.plan_tx.send(Some(plan.clone()));

        {
            let mut status = self.status.write().await;
            status.phase = Phase::Idle;
            status.blocking = self.state.clone();
            status.next_wake = Some(plan);
            status.last_error = None;
            status.cycles += 1;
        }

        tracing::info!(
            source = ?report.source,
            coalesced = report.coalesced,
            blocked = report.blocked.len(),
            to_block = ?report.to_block,
            to_unblock = ?report.to_unblock,
            written = report.written,
            duration_ms = report.duration_ms as u64,
            "evaluation cycle completed",
        );
        Ok(report)
    }

    async fn reset(&mut self, coalesced: usize) -> CycleResult {
        let started = Instant::now();
        let editor = Arc::clone(&self.editor);
        let restored = tokio::task::spawn_blocking(move || {
            let mut editor = lock_editor(&editor)?;
            let current = editor.read_managed_block()?;
            let outcome = editor.restore()?;
            Ok::<_, DaemonError>((current, outcome))
        })
        .await;
        let (current, outcome): (BTreeSet<String>, WriteOutcome) = match restored {
            Ok(Ok(restored)) => restored,
            Ok(Err(err)) => return Err(self.degrade(TriggerSource::Ipc, err.to_string()).await),
            Err(err) => {
                return Err(self
                    .degrade(TriggerSource::Ipc, format!("reset task join error: {err}"))
                    .await)
            }
        };

        self.state = BlockingState {
            last_evaluated_at: self.state.last_evaluated_at,
            ..BlockingState::default()
        };
        {
            let mut status = self.status.write().await;
            status.blocking = self.state.clone();
            status.cycles += 1;
        }

        let report = CycleReport {
            source: TriggerSource::Ipc,
            coalesced,
            blocked: BTreeSet::new(),
            to_block: BTreeSet::new(),
            to_unblock: current,
            active_task_ids: BTreeSet::new(),
            written: outcome.is_written(),
            duration_ms: started.elapsed().as_millis(),
        };
        tracing::info!(
            unblocked = ?report.to_unblock,
            written = report.written,
            "managed block reset",
        );
        Ok(report)
    }

    async fn set_phase(&self, phase: Phase) {
        self.status.write().await.phase = phase;
    }

    /// Record a failed cycle. Blocking state is left exactly as it was.
    async fn degrade(&self, source: TriggerSource, message: String) -> String {
        tracing::warn!(source = ?source, error = %message, "cycle failed; daemon degraded");
        let mut status = self.status.write().await;
        status.phase = Phase::Degraded;
        status.last_error = Some(message.clone());
        message
    }
}

fn lock_editor(
    editor: &Mutex<HostsEditor>,
) -> Result<std::sync::MutexGuard<'_, HostsEditor>, DaemonError> {
    editor
        .lock()
        .map_err(|_| DaemonError::Protocol("hosts editor lock poisoned".to_string()))
}

/// Distinct jobs ordered by their last occurrence in the batch.
fn job_order(jobs: impl IntoIterator<Item = Job>) -> Vec<Job> {
    let mut order = Vec::new();
    for job in jobs {
        order.retain(|seen| *seen != job);
        order.push(job);
    }
    order
}

async fn enforcement_task(
    mut enforcer: Enforcer,
    mut trigger_rx: mpsc::Receiver<Trigger>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        let first = tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_trigger = trigger_rx.recv() => match maybe_trigger {
                Some(trigger) => trigger,
                None => break,
            },
        };

        // Everything queued while idle or during the previous cycle is served
        // by this one.
        let mut batch = vec![first];
        while let Ok(trigger) = trigger_rx.try_recv() {
            batch.push(trigger);
        }
        enforcer.run_batch(batch).await;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

async fn scheduler_task(
    clock: Clock,
    poll_interval: Duration,
    mut plan_rx: watch::Receiver<Option<WakePlan>>,
    trigger_tx: mpsc::Sender<Trigger>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let timer = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(timer);
    let mut armed = false;

    let mut poll = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            changed = plan_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let plan = plan_rx.borrow_and_update().clone();
                match plan {
                    Some(plan) => {
                        let delay = plan.delay_from(clock());
                        timer.as_mut().reset(Instant::now() + delay);
                        armed = true;
                        tracing::debug!(
                            at = %plan.at,
                            reason = ?plan.reason,
                            delay_secs = delay.as_secs(),
                            "armed wake-up timer",
                        );
                    }
                    None => armed = false,
                }
                poll.reset();
            }
            () = &mut timer, if armed => {
                armed = false;
                enqueue(&trigger_tx, TriggerSource::Timer);
            }
            _ = poll.tick() => enqueue(&trigger_tx, TriggerSource::Poll),
        }
    }
    Ok(())
}

fn enqueue(trigger_tx: &mpsc::Sender<Trigger>, source: TriggerSource) {
    match trigger_tx.try_send(Trigger::evaluate(source)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            tracing::debug!(source = ?source, "trigger queue full; a cycle is already pending");
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(source = ?source, "trigger queue closed");
        }
    }
}

// ---------------------------------------------------------------------------
// Socket server
// ---------------------------------------------------------------------------

async fn socket_server_task(
    listener: UnixListener,
    socket: PathBuf,
    ipc_timeout: Duration,
    trigger_tx: mpsc::Sender<Trigger>,
    status: SharedStatus,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        if let Err(err) =
                            handle_socket_client(stream, ipc_timeout, &trigger_tx, &status).await
                        {
                            tracing::warn!(error = %err, "socket client error");
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "socket accept failed"),
                }
            }
        }
    }

    drop(listener);
    match fs::remove_file(&socket) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(socket = %socket.display(), error = %err, "could not remove socket"),
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    ipc_timeout: Duration,
    trigger_tx: &mpsc::Sender<Trigger>,
    status: &SharedStatus,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader.take(MAX_COMMAND_BYTES));
    let mut raw = Vec::new();

    let reply = match tokio::time::timeout(ipc_timeout, reader.read_until(b'\n', &mut raw)).await {
        Ok(Ok(_)) => match std::str::from_utf8(&raw) {
            Ok(line) => dispatch(line, trigger_tx, status).await,
            Err(_) => error_reply("invalid UTF-8 in command"),
        },
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "failed to read ipc command");
            error_reply(format!("failed to read command: {err}"))
        }
        Err(_) => error_reply("timed out waiting for command"),
    };

    write_reply(&mut writer, &reply, ipc_timeout).await
}

async fn dispatch(
    line: &str,
    trigger_tx: &mpsc::Sender<Trigger>,
    status: &SharedStatus,
) -> String {
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(message) => return error_reply(message),
    };
    tracing::debug!(command = %command, "ipc command");

    match command {
        Command::Ping => REPLY_PONG.to_string(),
        Command::Refresh => reply_for(submit(trigger_tx, Job::Evaluate).await),
        Command::Reset => reply_for(submit(trigger_tx, Job::Reset).await),
        Command::Status => {
            let snapshot = status.read().await.clone();
            serde_json::to_string(&snapshot).unwrap_or_else(|err| error_reply(err))
        }
    }
}

fn reply_for(outcome: Result<CycleReport, DaemonError>) -> String {
    match outcome {
        Ok(_) => REPLY_OK.to_string(),
        Err(DaemonError::Protocol(message)) => error_reply(message),
        Err(err) => error_reply(err),
    }
}

async fn submit(
    trigger_tx: &mpsc::Sender<Trigger>,
    job: Job,
) -> Result<CycleReport, DaemonError> {
    let (tx, rx) = oneshot::channel();
    trigger_tx
        .send(Trigger {
            job,
            source: TriggerSource::Ipc,
            respond_to: Some(tx),
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("trigger queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("cycle response"))?;
    outcome.map_err(DaemonError::Protocol)
}

async fn write_reply(
    writer: &mut OwnedWriteHalf,
    reply: &str,
    timeout: Duration,
) -> Result<(), DaemonError> {
    let payload = format!("{reply}\n");
    let write = async {
        writer.write_all(payload.as_bytes()).await?;
        writer.flush().await?;
        Ok::<(), std::io::Error>(())
    };
    tokio::time::timeout(timeout, write)
        .await
        .map_err(|_| DaemonError::Protocol("timed out writing reply".to_string()))?
        .map_err(|e| io_err("daemon socket write", e))
}

async fn bind_socket(socket: &Path) -> Result<UnixListener, DaemonError> {
    if let Some(parent) = socket.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    let mut attempt = 1;
    loop {
        let bound = prepare_socket_for_bind(socket)
            .and_then(|()| UnixListener::bind(socket).map_err(|e| io_err(socket, e)));
        match bound {
            Ok(listener) => {
                set_socket_permissions(socket)?;
                return Ok(listener);
            }
            Err(err) if attempt < BIND_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "failed to bind daemon socket; retrying");
                attempt += 1;
                tokio::time::sleep(BIND_RETRY_DELAY).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::SocketInUse {
                socket: socket.to_path_buf(),
            });
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

// ---------------------------------------------------------------------------
// Process plumbing
// ---------------------------------------------------------------------------

async fn signal_task(shutdown: broadcast::Sender<()>) -> Result<(), DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut shutdown_rx = shutdown.subscribe();
    let mut terminate =
        signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM handler", e))?;

    tokio::select! {
        _ = shutdown_rx.recv() => {}
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| io_err("ctrl-c handler", e))?;
            tracing::info!("received ctrl-c, shutting down daemon");
            let _ = shutdown.send(());
        }
        _ = terminate.recv() => {
            tracing::info!("received SIGTERM, shutting down daemon");
            let _ = shutdown.send(());
        }
    }
    Ok(())
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    for dir in [habitguard_root(home), backups_dir(home)] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}
