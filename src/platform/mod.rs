use std::path::{Path, PathBuf};

/// Where blogpanel keeps its files and how it locks them down on this OS.
pub trait Platform {
    /// Owner-only access to a directory holding the vault or logs.
    fn restrict_dir_permissions(path: &Path);

    /// Owner-only access to `vault.db` and the log file.
    fn restrict_file_permissions(path: &Path);

    /// Root data directory for blogpanel.
    /// Unix: `~/.blogpanel`, Windows: `%APPDATA%\blogpanel`.
    fn data_dir() -> PathBuf;
}

/// Environment variable that relocates the data directory (vault, config, logs).
pub const DATA_DIR_ENV: &str = "BLOGPANEL_DATA_DIR";

/// Honour `BLOGPANEL_DATA_DIR` when set and non-empty, else use the platform default.
pub(crate) fn resolve_data_dir(default: PathBuf) -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => default,
    }
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;
