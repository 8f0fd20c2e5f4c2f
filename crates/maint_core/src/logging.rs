use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::ExportConfig;

/// Initializes the logging system with file + console output in
/// `~/.maint/logs`. Returns a guard that must be kept alive for the duration
/// of the process.
pub fn init_logging(config: &ExportConfig) -> Result<WorkerGuard> {
    let logs_dir = ExportConfig::logs_dir()?;
    init_logging_to_dir(&logs_dir, &config.log_level)
}

/// Same as [`init_logging`] with an explicit log directory. `level` is a bare
/// level or a full filter string; `RUST_LOG` takes precedence over both.
pub fn init_logging_to_dir(logs_dir: &Path, level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    // File appender: daily rotation
    let file_appender = tracing_appender::rolling::daily(logs_dir, "maint-export");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}

/// Expands a bare level ("info") into a filter naming each workspace crate.
/// Strings that already carry directives are passed through.
fn default_filter(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("{level},maint_export={level},maint_docs={level},maint_app={level}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_init_logging_to_dir_creates_directory() {
        let tmp = tempfile::tempdir().expect("Failed to create tempdir");
        let logs_dir = tmp.path().join("nested").join("logs");
        assert!(!logs_dir.exists());

        // The global subscriber can only be installed once per process, so
        // only directory creation is asserted here.
        let guard = init_logging_to_dir(&logs_dir, "warn");
        assert!(logs_dir.exists());
        drop(guard);
    }

    #[test]
    fn test_init_logging_to_dir_existing_directory() {
        let tmp = tempfile::tempdir().expect("Failed to create tempdir");
        let logs_dir = tmp.path().join("logs");
        fs::create_dir_all(&logs_dir).unwrap();

        let result = init_logging_to_dir(&logs_dir, "info");
        assert!(logs_dir.exists());
        match result {
            Ok(guard) => drop(guard),
            Err(e) => {
                // Another test already installed the global subscriber.
                let msg = e.to_string();
                assert!(
                    msg.contains("logging") || msg.contains("subscriber"),
                    "unexpected error: {msg}"
                );
            }
        }
    }

    #[test]
    fn test_default_filter_expands_bare_level() {
        let filter = default_filter("debug");
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("maint_export=debug"));
    }

    #[test]
    fn test_default_filter_keeps_directives() {
        assert_eq!(default_filter("warn,maint_docs=trace"), "warn,maint_docs=trace");
        assert_eq!(default_filter("maint_export=debug"), "maint_export=debug");
    }

    #[test]
    fn test_env_filter_accepts_defaults() {
        for level in ["info", "debug", "warn", "trace"] {
            let filter = EnvFilter::new(default_filter(level));
            drop(filter);
        }
    }
}
