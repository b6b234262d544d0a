use std::env;
use std::path::PathBuf;
use tracing::{debug, error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::constants::{LOG_DIR_NAME, LOG_TO_FILE_ENV};

/// Initialize logging system
/// - Console logging is ONLY enabled when RUST_LOG is set (stderr, so it never
///   mixes with session output on stdout)
/// - File logging is enabled when CHAINER_LOG_TO_FILE is set; one file per session
///
/// The returned guard must be held for the lifetime of the process, otherwise
/// buffered file output is lost.
pub fn init_logging(session_id: &str) -> Option<WorkerGuard> {
    let rust_log_present = env::var("RUST_LOG").is_ok();

    let console_layer = rust_log_present.then(|| {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    });

    let (file_layer, guard) = match file_writer(session_id) {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // try_init: tests and embedders may have installed a subscriber already
    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Some(path) = log_file_path(session_id).filter(|_| guard.is_some()) {
        log_info(&format!("File logging enabled: {}", path.display()));
    }

    guard
}

fn file_writer(
    session_id: &str,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let path = log_file_path(session_id)?;
    let dir = path.parent()?.to_path_buf();
    let file_name = path.file_name()?.to_owned();

    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Warning: Failed to create log directory {}: {}", dir.display(), e);
        return None;
    }

    let appender = tracing_appender::rolling::never(dir, file_name);
    Some(tracing_appender::non_blocking(appender))
}

/// Path of the per-session log file, or `None` when file logging is disabled
pub fn log_file_path(session_id: &str) -> Option<PathBuf> {
    env::var(LOG_TO_FILE_ENV).ok()?;
    let home_dir = dirs::home_dir()?;
    Some(
        home_dir
            .join(LOG_DIR_NAME)
            .join("logs")
            .join(format!("{session_id}.log")),
    )
}

pub fn log_error(msg: &str) {
    error!("{msg}");
}

pub fn log_warn(msg: &str) {
    warn!("{msg}");
}

pub fn log_info(msg: &str) {
    info!("{msg}");
}

pub fn log_debug(msg: &str) {
    debug!("{msg}");
}

pub fn log_trace(msg: &str) {
    trace!("{msg}");
}
