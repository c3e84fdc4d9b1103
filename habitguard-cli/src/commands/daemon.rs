//! `habitguard daemon`: foreground runtime and socket client commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;

use habitguard_daemon::paths::socket_path;
use habitguard_daemon::{
    request_ping, request_refresh, request_reset, request_status, start_blocking, DaemonError,
};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (worker + scheduler + socket server).
    Start(StartArgs),
    /// Check that the daemon answers on its socket.
    Ping,
    /// Ask the daemon to re-evaluate now; waits for the cycle to finish.
    Refresh,
    /// Ask the daemon to strip the managed block immediately.
    Reset,
    /// Query daemon runtime status.
    Status,
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Emit JSON log lines regardless of `log_format` in config.
    #[arg(long)]
    pub json_logs: bool,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = super::home()?;

    if let DaemonCommand::Start(args) = &command {
        start_blocking(&home, args.json_logs).context("daemon exited with error")?;
        return Ok(());
    }

    let config = super::load_config(&home)?;
    let socket = socket_path(&home, &config);
    let timeout = config.ipc_timeout();

    match command {
        DaemonCommand::Start(_) => {}
        DaemonCommand::Ping => {
            request_ping(&socket, timeout).context("daemon did not answer ping")?;
            println!("pong");
        }
        DaemonCommand::Refresh => {
            request_refresh(&socket, timeout).context("daemon refresh failed")?;
            println!("ok");
        }
        DaemonCommand::Reset => {
            request_reset(&socket, timeout).context("daemon reset failed")?;
            println!("ok");
        }
        DaemonCommand::Status => {
            let payload = match request_status(&socket, timeout) {
                Ok(mut status) => {
                    if let Value::Object(map) = &mut status {
                        map.insert("running".to_string(), Value::Bool(true));
                    }
                    status
                }
                Err(DaemonError::DaemonNotRunning { .. }) => serde_json::json!({
                    "running": false,
                    "socket": socket.display().to_string(),
                }),
                Err(err) => return Err(err).context("failed to query daemon status"),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload)
                    .context("failed to render daemon status JSON")?
            );
        }
    }

    Ok(())
}
