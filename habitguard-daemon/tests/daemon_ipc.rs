//! In-process daemon driven over its Unix socket, with a file-backed task
//! source and a fixed clock of 2026-10-18 13:01 UTC.

use std::os::unix::net::UnixListener as StdUnixListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use habitguard_daemon::{
    run_with, send_command, Command, DaemonError, FileTaskSource, RuntimeSettings,
};
use habitguard_hosts::{BackupStore, HostsEditor, BEGIN_MARKER, END_MARKER};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const BASE: &str = "127.0.0.1 localhost\n::1 ip6-localhost\n10.0.0.5 nas.local\n";

const OVERDUE: &str = r#"{
  "blocked_websites": ["youtube.com", "reddit.com"],
  "tasks": [{"id": 1, "name": "Exercise", "deadline": "13:00", "active_days": 127, "records": []}]
}"#;

const COMPLETED: &str = r#"{
  "blocked_websites": ["youtube.com", "reddit.com"],
  "tasks": [{"id": 1, "name": "Exercise", "deadline": "13:00", "active_days": 127,
             "records": [{"date": "2026-10-18", "status": "done"}]}]
}"#;

const TIMEOUT: Duration = Duration::from_secs(2);

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 13, 1, 0).unwrap()
}

struct Harness {
    tmp: TempDir,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<Result<(), DaemonError>>,
}

impl Harness {
    fn hosts(&self) -> PathBuf {
        self.tmp.path().join("hosts")
    }

    fn tasks(&self) -> PathBuf {
        self.tmp.path().join("tasks.json")
    }

    fn socket(&self) -> PathBuf {
        socket_in(self.tmp.path())
    }

    fn backups(&self) -> BackupStore {
        BackupStore::new(self.tmp.path().join("backups"))
    }

    fn hosts_content(&self) -> String {
        std::fs::read_to_string(self.hosts()).expect("read hosts")
    }

    fn set_tasks(&self, snapshot: &str) {
        std::fs::write(self.tasks(), snapshot).expect("write tasks");
    }

    async fn send(&self, command: Command) -> String {
        let socket = self.socket();
        tokio::task::spawn_blocking(move || send_command(&socket, command, TIMEOUT))
            .await
            .expect("join")
            .expect("send command")
    }

    async fn status(&self) -> serde_json::Value {
        serde_json::from_str(&self.send(Command::Status).await).expect("status json")
    }

    async fn stop(self) -> (TempDir, Result<(), DaemonError>) {
        let _ = self.shutdown_tx.send(());
        let result = self.handle.await.expect("join daemon");
        (self.tmp, result)
    }
}

fn socket_in(dir: &Path) -> PathBuf {
    dir.join("daemon.sock")
}

fn spawn_daemon(tmp: TempDir) -> Harness {
    let settings = RuntimeSettings {
        socket_path: socket_in(tmp.path()),
        poll_interval: Duration::from_secs(3600),
        ipc_timeout: TIMEOUT,
        clock: fixed_clock,
    };
    let source = Arc::new(FileTaskSource::new(tmp.path().join("tasks.json")));
    let editor = HostsEditor::new(tmp.path().join("hosts"), tmp.path().join("backups"));
    let (shutdown_tx, _) = broadcast::channel(4);
    let handle = tokio::spawn(run_with(settings, source, editor, shutdown_tx.clone()));
    Harness {
        tmp,
        shutdown_tx,
        handle,
    }
}

async fn start(hosts: &str, snapshot: &str) -> Harness {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::write(tmp.path().join("hosts"), hosts).expect("write hosts");
    std::fs::write(tmp.path().join("tasks.json"), snapshot).expect("write tasks");
    let harness = spawn_daemon(tmp);
    wait_ready(&harness.socket()).await;
    harness
}

async fn wait_ready(socket: &Path) {
    for _ in 0..100 {
        let socket = socket.to_path_buf();
        let ping = tokio::task::spawn_blocking(move || {
            send_command(&socket, Command::Ping, Duration::from_millis(200))
        })
        .await
        .expect("join");
        if matches!(ping.as_deref(), Ok("pong")) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("daemon did not answer ping at {}", socket.display());
}

fn raw_request(socket: &Path, payload: &[u8]) -> String {
    use std::io::{Read, Write};
    let mut stream = std::os::unix::net::UnixStream::connect(socket).expect("connect");
    stream.set_read_timeout(Some(TIMEOUT)).expect("timeout");
    stream.write_all(payload).expect("write");
    let mut reply = String::new();
    stream.read_to_string(&mut reply).expect("read");
    reply
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exercise_blocks_when_overdue_and_unblocks_after_completion() {
    let daemon = start(BASE, OVERDUE).await;

    assert_eq!(daemon.send(Command::Refresh).await, "ok");
    let blocked = daemon.hosts_content();
    assert!(blocked.starts_with(BASE));
    for line in [
        BEGIN_MARKER,
        "127.0.0.1 youtube.com",
        "127.0.0.1 www.youtube.com",
        "127.0.0.1 reddit.com",
        "127.0.0.1 www.reddit.com",
        END_MARKER,
    ] {
        assert!(blocked.contains(line), "missing {line:?} in:\n{blocked}");
    }

    let status = daemon.status().await;
    assert_eq!(status["phase"], "idle");
    assert_eq!(status["blocking"]["active_task_ids"], serde_json::json!(["1"]));

    daemon.set_tasks(COMPLETED);
    assert_eq!(daemon.send(Command::Refresh).await, "ok");
    assert_eq!(daemon.hosts_content(), BASE);

    let status = daemon.status().await;
    assert_eq!(status["blocking"]["blocked_domains"], serde_json::json!([]));
    assert_eq!(status["next_wake"]["reason"]["kind"], "day_rollover");

    let (_tmp, result) = daemon.stop().await;
    tokio_test::assert_ok!(result);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_while_blocked_strips_block_and_keeps_backups() {
    let daemon = start(BASE, OVERDUE).await;
    assert_eq!(daemon.send(Command::Refresh).await, "ok");
    assert!(daemon.hosts_content().contains(BEGIN_MARKER));
    let backups_before = daemon.backups().list().expect("list backups");
    assert_eq!(backups_before.len(), 1);

    assert_eq!(daemon.send(Command::Reset).await, "ok");
    assert_eq!(daemon.hosts_content(), BASE);
    assert_eq!(daemon.backups().list().expect("list backups"), backups_before);
    assert_eq!(
        std::fs::read_to_string(&backups_before[0]).expect("read backup"),
        BASE
    );

    let status = daemon.status().await;
    assert_eq!(status["blocking"]["blocked_domains"], serde_json::json!([]));

    let (_tmp, result) = daemon.stop().await;
    tokio_test::assert_ok!(result);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_failure_degrades_then_converges() {
    let daemon = start(BASE, OVERDUE).await;
    assert_eq!(daemon.send(Command::Refresh).await, "ok");
    let blocked = daemon.hosts_content();

    daemon.set_tasks("{ this is not json");
    let reply = daemon.send(Command::Refresh).await;
    assert!(reply.starts_with("error: "), "got {reply}");
    assert_eq!(daemon.hosts_content(), blocked);

    let status = daemon.status().await;
    assert_eq!(status["phase"], "degraded");
    assert!(status["last_error"].is_string());
    assert_eq!(
        status["blocking"]["blocked_domains"],
        serde_json::json!(["reddit.com", "youtube.com"])
    );

    daemon.set_tasks(COMPLETED);
    assert_eq!(daemon.send(Command::Refresh).await, "ok");
    assert_eq!(daemon.hosts_content(), BASE);
    let status = daemon.status().await;
    assert_eq!(status["phase"], "idle");
    assert!(status["last_error"].is_null());

    let (_tmp, result) = daemon.stop().await;
    tokio_test::assert_ok!(result);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ping_and_malformed_commands() {
    let daemon = start(BASE, COMPLETED).await;
    assert_eq!(daemon.send(Command::Ping).await, "pong");

    let socket = daemon.socket();
    let reply = tokio::task::spawn_blocking(move || raw_request(&socket, b"bogus\n"))
        .await
        .expect("join");
    assert_eq!(reply, "error: unknown command 'bogus'\n");

    let socket = daemon.socket();
    let reply = tokio::task::spawn_blocking(move || raw_request(&socket, b"\n"))
        .await
        .expect("join");
    assert!(reply.starts_with("error: unknown command"));

    let socket = daemon.socket();
    let reply = tokio::task::spawn_blocking(move || raw_request(&socket, b"\xff\xfe\n"))
        .await
        .expect("join");
    assert_eq!(reply, "error: invalid UTF-8 in command\n");

    // Daemon keeps serving after bad input.
    assert_eq!(daemon.send(Command::Ping).await, "pong");
    assert_eq!(daemon.hosts_content(), BASE);

    let (_tmp, result) = daemon.stop().await;
    tokio_test::assert_ok!(result);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_socket_file_is_replaced() {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::write(tmp.path().join("hosts"), BASE).expect("write hosts");
    std::fs::write(tmp.path().join("tasks.json"), COMPLETED).expect("write tasks");
    drop(StdUnixListener::bind(socket_in(tmp.path())).expect("bind stale"));
    assert!(socket_in(tmp.path()).exists());

    let daemon = spawn_daemon(tmp);
    wait_ready(&daemon.socket()).await;
    assert_eq!(daemon.send(Command::Ping).await, "pong");

    let (_tmp, result) = daemon.stop().await;
    tokio_test::assert_ok!(result);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn live_socket_is_fatal_and_hosts_untouched() {
    let tmp = TempDir::new().expect("tempdir");
    std::fs::write(tmp.path().join("hosts"), BASE).expect("write hosts");
    std::fs::write(tmp.path().join("tasks.json"), OVERDUE).expect("write tasks");
    let _other = StdUnixListener::bind(socket_in(tmp.path())).expect("bind live");

    let daemon = spawn_daemon(tmp);
    let result = daemon.handle.await.expect("join daemon");
    assert!(
        matches!(result, Err(DaemonError::SocketInUse { .. })),
        "got {result:?}"
    );
    assert_eq!(
        std::fs::read_to_string(daemon.tmp.path().join("hosts")).expect("read hosts"),
        BASE
    );
    assert!(!daemon.tmp.path().join("backups").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_leaves_block_in_place_and_removes_socket() {
    let daemon = start(BASE, OVERDUE).await;
    assert_eq!(daemon.send(Command::Refresh).await, "ok");
    let socket = daemon.socket();
    let hosts = daemon.hosts();

    let (_tmp, result) = daemon.stop().await;
    tokio_test::assert_ok!(result);

    assert!(!socket.exists());
    let content = std::fs::read_to_string(hosts).expect("read hosts");
    assert!(content.contains(BEGIN_MARKER));
    assert!(content.contains("127.0.0.1 www.youtube.com"));
}
