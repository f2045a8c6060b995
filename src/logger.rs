//! Session logger. Installs a `tracing` subscriber with a console layer and a
//! file layer writing to a single file in the OS data directory.
//!
//! The file is **truncated at each launch**, so it only ever contains output
//! from the most recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\RetouchFE\retouchfe.log`
//!   Linux:    `~/.local/share/RetouchFE/retouchfe.log`
//!   macOS:    `~/Library/Application Support/RetouchFE/retouchfe.log`
//!
//! Console output goes to stderr and honours `RUST_LOG`
//! (e.g. `RUST_LOG=retouchfe::session=debug` to see skipped steps).

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Returns the path to the current session log file, once [`init`] opened it.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Initialise logging. Call once, before any work.
///
/// * Console: `RUST_LOG` if set, else `warn` (`info` with `verbose`).
/// * File: creates or truncates the session log, always at `debug`.
/// * Installs a panic hook that records the panic before the default handler runs.
///
/// Failing to open the log file is reported on stderr and otherwise ignored.
pub fn init(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = match open_session_file() {
        Ok((path, file)) => {
            let _ = LOG_PATH.set(path);
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file: {}", e);
            None
        }
    };

    // A subscriber may already be set (tests, embedding); keep that one
    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    tracing::info!("=== RetouchFE session started {} ===", human_timestamp());
    if let Some(path) = log_path() {
        tracing::info!("Log file: {}", path.display());
    }

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC: {}", info);
        prev(info);
    }));
}

fn open_session_file() -> std::io::Result<(PathBuf, File)> {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // Truncate any previous session's content
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)?;
    Ok((path, file))
}

fn log_file_path() -> PathBuf {
    data_dir().join("RetouchFE").join("retouchfe.log")
}

/// Platform data directory (without the app sub-folder).
pub fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort: current working directory
    PathBuf::from(".")
}

/// Seconds since the epoch; there is no calendar dependency.
fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_under_data_dir() {
        let path = log_file_path();
        assert!(path.starts_with(data_dir()));
        assert!(path.ends_with("RetouchFE/retouchfe.log"));
    }
}
