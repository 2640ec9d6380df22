use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "try_finder.log";

/// File-only tracing; the terminal belongs to the UI.
///
/// Returns `None` (and installs nothing) when the log directory cannot be
/// written. The guard must live until exit or buffered lines are dropped.
pub fn init_logging() -> Option<WorkerGuard> {
    let log_dir = std::env::var("LOG_DIR")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

    // rolling::daily panics if it cannot create the first file.
    if !dir_is_writable(&log_dir) {
        return None;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,try_finder=debug"));
    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .ok()?;
    Some(guard)
}

fn dir_is_writable(dir: &Path) -> bool {
    if fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".try_finder_write_test");
    let ok = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)
        .is_ok();
    let _ = fs::remove_file(&probe);
    ok
}
