//! Line protocol spoken over the daemon socket.
//!
//! One connection carries exactly one newline-terminated command and one
//! newline-terminated reply:
//!
//! ```text
//! ping     -> pong
//! refresh  -> ok | error: <reason>
//! reset    -> ok | error: <reason>
//! status   -> {"phase":"idle",...}
//! ```

use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;

use crate::error::{io_err, DaemonError};
use crate::paths::MAX_COMMAND_BYTES;

pub const REPLY_PONG: &str = "pong";
pub const REPLY_OK: &str = "ok";
pub const ERROR_PREFIX: &str = "error: ";

/// A command accepted by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Refresh,
    Reset,
    Status,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ping" => Ok(Command::Ping),
            "refresh" => Ok(Command::Refresh),
            "reset" => Ok(Command::Reset),
            "status" => Ok(Command::Status),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ping => write!(f, "ping"),
            Command::Refresh => write!(f, "refresh"),
            Command::Reset => write!(f, "reset"),
            Command::Status => write!(f, "status"),
        }
    }
}

/// Format an error reply token. Newlines are flattened so the reply stays
/// on one line.
pub fn error_reply(message: impl fmt::Display) -> String {
    let flat = message.to_string().replace(['\r', '\n'], " ");
    format!("{ERROR_PREFIX}{flat}")
}

/// Send one command and return the raw reply line (without terminator).
pub fn send_command(
    socket: &Path,
    command: Command,
    timeout: Duration,
) -> Result<String, DaemonError> {
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning {
            socket: socket.to_path_buf(),
        });
    }

    let mut stream = UnixStream::connect(socket).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
        ) {
            DaemonError::DaemonNotRunning {
                socket: socket.to_path_buf(),
            }
        } else {
            io_err(socket, err)
        }
    })?;

    // `refresh` waits for a full evaluation cycle, so reads get extra slack.
    let read_timeout = match command {
        Command::Refresh | Command::Reset => timeout * 4,
        Command::Ping | Command::Status => timeout,
    };
    stream
        .set_read_timeout(Some(read_timeout))
        .map_err(|e| io_err(socket, e))?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(|e| io_err(socket, e))?;

    stream
        .write_all(format!("{command}\n").as_bytes())
        .map_err(|e| io_err(socket, e))?;
    stream.flush().map_err(|e| io_err(socket, e))?;

    let mut reader = BufReader::new(stream.take(MAX_COMMAND_BYTES * 64));
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| io_err(socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "daemon closed connection before responding".to_string(),
        ));
    }
    Ok(line.trim_end().to_string())
}

pub fn request_ping(socket: &Path, timeout: Duration) -> Result<(), DaemonError> {
    expect_token(send_command(socket, Command::Ping, timeout)?, REPLY_PONG)
}

pub fn request_refresh(socket: &Path, timeout: Duration) -> Result<(), DaemonError> {
    expect_token(send_command(socket, Command::Refresh, timeout)?, REPLY_OK)
}

pub fn request_reset(socket: &Path, timeout: Duration) -> Result<(), DaemonError> {
    expect_token(send_command(socket, Command::Reset, timeout)?, REPLY_OK)
}

pub fn request_status(socket: &Path, timeout: Duration) -> Result<Value, DaemonError> {
    let reply = send_command(socket, Command::Status, timeout)?;
    if let Some(message) = reply.strip_prefix(ERROR_PREFIX) {
        return Err(DaemonError::Protocol(message.to_string()));
    }
    Ok(serde_json::from_str(&reply)?)
}

fn expect_token(reply: String, expected: &str) -> Result<(), DaemonError> {
    if reply == expected {
        return Ok(());
    }
    match reply.strip_prefix(ERROR_PREFIX) {
        Some(message) => Err(DaemonError::Protocol(message.to_string())),
        None => Err(DaemonError::Protocol(format!(
            "unexpected reply '{reply}', expected '{expected}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_surrounding_whitespace() {
        assert_eq!(" refresh\r\n".parse::<Command>(), Ok(Command::Refresh));
        assert_eq!("ping".parse::<Command>(), Ok(Command::Ping));
        assert!("REFRESH".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn commands_display_as_wire_tokens() {
        for cmd in [Command::Ping, Command::Refresh, Command::Reset, Command::Status] {
            assert_eq!(cmd.to_string().parse::<Command>(), Ok(cmd));
        }
    }

    #[test]
    fn error_reply_stays_on_one_line() {
        let reply = error_reply("bad\nthing");
        assert_eq!(reply, "error: bad thing");
    }

    #[test]
    fn expect_token_maps_error_replies() {
        assert!(expect_token("ok".to_string(), REPLY_OK).is_ok());
        let err = expect_token("error: degraded".to_string(), REPLY_OK).unwrap_err();
        assert!(matches!(err, DaemonError::Protocol(msg) if msg == "degraded"));
        assert!(expect_token("pong".to_string(), REPLY_OK).is_err());
    }

    #[test]
    fn missing_socket_reports_not_running() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = send_command(
            &tmp.path().join("daemon.sock"),
            Command::Ping,
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }));
    }
}
