//! Tracing configuration and log routing.
//!
//! The server logs to stdout and to a log file (`PDFGENIUS_LOG_FILE`, or `logs/pdfgenius.log`).
//! The CLI logs to stderr only so stdout carries nothing but answers. Both honour `RUST_LOG`.
//! Pipeline failures are logged with their full cause here while HTTP clients only see a generic
//! message.
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::MakeWriter, prelude::*, registry::LookupSpan,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_ENV: &str = "PDFGENIUS_LOG_FILE";
const LOG_DIR: &str = "logs";
const LOG_FILE_NAME: &str = "pdfgenius.log";

/// Server subscriber: stdout plus the log file, `info` unless `RUST_LOG` says otherwise.
///
/// The non-blocking file writer's guard lives for the rest of the process.
pub fn init_tracing() {
    let file_layer = open_log_file().map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(console_layer(std::io::stdout))
        .with(file_layer)
        .init();
}

/// CLI subscriber: stderr only, `warn` unless `RUST_LOG` says otherwise.
pub fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(console_layer(std::io::stderr))
        .init();
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn console_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer().with_writer(writer).with_target(false).compact()
}

fn log_file_path(configured: Option<OsString>) -> PathBuf {
    configured
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(LOG_DIR).join(LOG_FILE_NAME))
}

fn open_log_file() -> Option<NonBlocking> {
    let path = log_file_path(std::env::var_os(LOG_FILE_ENV));
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {err}", parent.display());
            return None;
        }
    }

    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
