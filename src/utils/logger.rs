use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE_NAME: &str = "arxiv_tracker.log";
pub const MAX_LOG_BYTES: u64 = 1024 * 1024;

/// Console output plus a debug-level plain text log under `logs_dir`.
pub fn init_cli_logger(verbose: bool, logs_dir: &Path) -> std::io::Result<()> {
    let console_filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("arxiv_monitor=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arxiv_monitor=info"))
    };

    fs::create_dir_all(logs_dir)?;
    let log_path = logs_dir.join(LOG_FILE_NAME);
    let rotated = rotate_if_oversized(&log_path, MAX_LOG_BYTES)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_filter(console_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(log_file))
                .with_filter(EnvFilter::new("arxiv_monitor=debug,warn")),
        )
        .init();

    if let Some(rotated) = rotated {
        tracing::info!("Rotated previous log to {}", rotated.display());
    }

    Ok(())
}

/// JSON lines on stdout, for running under a log collector.
pub fn init_json_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arxiv_monitor=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

/// Moves `path` aside with a timestamp suffix once it grows past `max_bytes`.
pub fn rotate_if_oversized(path: &Path, max_bytes: u64) -> std::io::Result<Option<PathBuf>> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    if size <= max_bytes {
        return Ok(None);
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("arxiv_tracker");
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let rotated = path.with_file_name(format!("{}.{}.log", stem, stamp));
    fs::rename(path, &rotated)?;
    Ok(Some(rotated))
}
