use std::sync::OnceLock;

use anyhow::Context;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::core::config::AppPaths;
use crate::telemetry::Telemetry;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where log lines go besides the rolling file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Servers mirror everything to stdout.
    FileAndStdout,
    /// The chat loop owns stdout, so logs only go to the file.
    FileOnly,
}

/// Installs the global subscriber. With `telemetry`, this crate's spans are
/// also recorded for OTLP export regardless of `RUST_LOG`.
pub fn init(
    paths: &AppPaths,
    file_name: &str,
    target: LogTarget,
    telemetry: Option<&Telemetry>,
) -> anyhow::Result<()> {
    let log_dir = &paths.log_dir;
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(env_filter());

    let stdout_layer = match target {
        LogTarget::FileAndStdout => Some(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(env_filter()),
        ),
        LogTarget::FileOnly => None,
    };

    let span_layer = telemetry.map(|telemetry| {
        telemetry
            .layer()
            .with_filter(Targets::new().with_target(env!("CARGO_CRATE_NAME"), Level::INFO))
    });

    tracing_subscriber::registry()
        .with(span_layer)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install the log subscriber")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let mut paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().to_path_buf());
        paths.log_dir = blocker.join("logs");

        let err = init(&paths, "wikichat.log", LogTarget::FileOnly, None).unwrap_err();
        assert!(err.to_string().starts_with("Failed to create log directory"));
    }
}
