use std::path::{Path, PathBuf};
use std::time::Duration;

use habitguard_core::{config, Config};

pub const DAEMON_SOCKET: &str = "daemon.sock";
pub const BACKUPS_DIR: &str = "backups";

pub const BIND_ATTEMPTS: u32 = 3;
pub const BIND_RETRY_DELAY: Duration = Duration::from_millis(200);
pub const TRIGGER_QUEUE_DEPTH: usize = 64;
pub const MAX_COMMAND_BYTES: u64 = 1024;

pub fn habitguard_root(home: &Path) -> PathBuf {
    config::root_dir_at(home)
}

pub fn default_socket_path(home: &Path) -> PathBuf {
    habitguard_root(home).join(DAEMON_SOCKET)
}

/// Socket from config, falling back to `<home>/.habitguard/daemon.sock`.
pub fn socket_path(home: &Path, config: &Config) -> PathBuf {
    config
        .socket_path
        .clone()
        .unwrap_or_else(|| default_socket_path(home))
}

pub fn backups_dir(home: &Path) -> PathBuf {
    habitguard_root(home).join(BACKUPS_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_override_wins() {
        let home = Path::new("/home/someone");
        let mut cfg = Config::default();
        assert_eq!(
            socket_path(home, &cfg),
            PathBuf::from("/home/someone/.habitguard/daemon.sock")
        );
        cfg.socket_path = Some(PathBuf::from("/run/habitguard.sock"));
        assert_eq!(socket_path(home, &cfg), PathBuf::from("/run/habitguard.sock"));
    }
}
