mod config;
pub mod kv;

pub use config::{Config, HistoryConfig, NotificationsConfig, PlayerConfig, TimerConfig};
pub use kv::{KeyValueStore, MemoryStore, SqliteStore, Storage};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `MINI25_HOME` wins when set. Otherwise `~/.config/mini25/`, or
/// `~/.config/mini25-dev/` when `MINI25_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("MINI25_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("MINI25_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("mini25-dev")
            } else {
                base_dir.join("mini25")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
