//! Tracing bootstrap: stdout plus a daily-rolling log file.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Keeps the non-blocking log writer alive; hold it until process exit.
pub struct LogGuard(#[allow(dead_code)] WorkerGuard);

pub fn init(
    log_dir: impl AsRef<Path>,
    prefix: &str,
    level: &str,
    retention_days: u64,
) -> Result<LogGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let level = match level {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        other => {
            eprintln!("invalid log level '{other}', defaulting to 'info'");
            "info"
        }
    };
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = EnvFilter::builder()
        .with_default_directive(level.parse().context("bad log level directive")?)
        .parse_lossy(&env);
    let file_filter = EnvFilter::builder()
        .with_default_directive(level.parse().context("bad log level directive")?)
        .parse_lossy(&env);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .context("failed to create log file appender")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(console_filter),
        )
        .init();

    start_cleanup_task(log_dir, prefix.to_string(), retention_days);

    Ok(LogGuard(guard))
}

fn start_cleanup_task(log_dir: PathBuf, prefix: String, retention_days: u64) {
    let max_age = Duration::from_secs(60 * 60 * 24 * retention_days);
    tokio::task::spawn(async move {
        loop {
            if let Err(e) = remove_stale_logs(&log_dir, &prefix, max_age) {
                tracing::warn!("log cleanup failed: {}", e);
            }
            tokio::time::sleep(CLEANUP_INTERVAL).await;
        }
    });
}

fn remove_stale_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<()> {
    let now = SystemTime::now();

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(prefix) || !file_name.ends_with(".log") {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        if now.duration_since(modified).unwrap_or_default() > max_age {
            fs::remove_file(&path)?;
            tracing::info!("removed stale log file {}", file_name);
        }
    }
    Ok(())
}
