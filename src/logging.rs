use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "performer.log";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Keeps the log writer flushing until dropped. Its session id is the one
/// the planning session should run under, so log lines and checkpoints
/// share it.
pub struct LoggingGuard {
    _writer: WorkerGuard,
    session_id: Uuid,
    log_file: String,
}

impl LoggingGuard {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// File name, or file name prefix for rotating layouts, under the log dir.
    pub fn log_file(&self) -> &str {
        &self.log_file
    }
}

pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    if config.filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    if config.dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }
    let filter = parse_filter(&config.filter)?;
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("failed to create logging directory {}", config.dir.display()))?;

    let session_id = Uuid::now_v7();
    let (removed, retention_warnings) =
        match expired_log_files(&config.dir, config.retention_days, SystemTime::now()) {
            Ok(expired) => remove_all(&expired),
            Err(err) => (
                0,
                vec![format!(
                    "failed to scan logging directory {}: {err}",
                    config.dir.display()
                )],
            ),
        };

    let log_file = log_file_name(&config.rotation, session_id);
    let appender = match config.rotation {
        LoggingRotation::Daily => rolling::daily(&config.dir, &log_file),
        LoggingRotation::Hourly => rolling::hourly(&config.dir, &log_file),
        LoggingRotation::PerRun => rolling::never(&config.dir, &log_file),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter);
    let stderr_layer = config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    tracing::info!(
        target: "logging",
        session_id = %session_id,
        dir = %config.dir.display(),
        log_file = %log_file,
        filter = %config.filter,
        rotation = ?config.rotation,
        retention_days = config.retention_days,
        expired_removed = removed,
        "logging_initialized"
    );
    for warning in retention_warnings {
        tracing::warn!(target: "logging", warning = %warning, "logging_retention_warning");
    }

    Ok(LoggingGuard {
        _writer: guard,
        session_id,
        log_file,
    })
}

fn parse_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", filter))
}

fn log_file_name(rotation: &LoggingRotation, session_id: Uuid) -> String {
    match rotation {
        LoggingRotation::PerRun => format!("{LOG_FILE_PREFIX}.{session_id}"),
        LoggingRotation::Daily | LoggingRotation::Hourly => LOG_FILE_PREFIX.to_string(),
    }
}

fn is_log_file(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with(LOG_FILE_PREFIX)
}

/// Log files of this crate last modified at or before the retention cutoff,
/// sorted by path.
fn expired_log_files(
    log_dir: &Path,
    retention_days: usize,
    now: SystemTime,
) -> io::Result<Vec<PathBuf>> {
    let window = Duration::from_secs((retention_days as u64).saturating_mul(SECONDS_PER_DAY));
    let cutoff = now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH);

    let mut expired = Vec::new();
    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        if !is_log_file(&entry.file_name()) {
            continue;
        }
        let metadata = entry.metadata()?;
        if metadata.is_file() && metadata.modified()? <= cutoff {
            expired.push(entry.path());
        }
    }
    expired.sort();
    Ok(expired)
}

fn remove_all(paths: &[PathBuf]) -> (usize, Vec<String>) {
    let mut removed = 0;
    let mut warnings = Vec::new();
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(err) => warnings.push(format!(
                "failed to remove expired log file {}: {err}",
                path.display()
            )),
        }
    }
    (removed, warnings)
}
