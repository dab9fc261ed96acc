//! # Logging Setup
//!
//! Installs the process-wide `tracing` subscriber: a console layer plus a
//! non-blocking, daily-rotated file in the configured log directory. Files
//! left by earlier runs are pruned on start-up so the directory stays small.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log files from earlier runs kept alongside the current one.
pub const DEFAULT_KEEP_FILES: usize = 5;

/// # Setup Logging
///
/// `log_level` is used unless `RUST_LOG` is set. Files are named
/// `{app_name}.log.YYYY-MM-DD`.
///
/// The returned guard flushes the file writer when dropped and must be held
/// for the lifetime of the process.
pub fn setup_logging(log_dir: &Path, log_level: &str, app_name: &str) -> Result<WorkerGuard> {
    // 1. Make sure the directory exists, then prune old runs
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Cannot create log directory {}", log_dir.display()))?;
    }
    cleanup_old_logs(log_dir, app_name, DEFAULT_KEEP_FILES)?;

    // 2. Daily file behind a background writer
    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{}.log", app_name));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // 3. RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}

/// Deletes all but the `keep` most recently modified files in `log_dir`
/// whose names start with `prefix`. Returns how many were removed.
///
/// A file that cannot be removed is reported on stderr and skipped, since
/// the subscriber is not installed yet when this runs.
pub fn cleanup_old_logs(log_dir: &Path, prefix: &str, keep: usize) -> Result<usize> {
    let mut entries: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
        .filter_map(|e| {
            let modified = e.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, e.path()))
        })
        .collect();

    // Newest first
    entries.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in entries.iter().skip(keep) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Failed to delete old log file {:?}: {}", path, e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs)).unwrap();
    }

    #[test]
    fn keeps_only_the_newest_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "server_site.log.2026-01-01", 300);
        touch(dir.path(), "server_site.log.2026-01-02", 200);
        touch(dir.path(), "server_site.log.2026-01-03", 100);
        touch(dir.path(), "unrelated.txt", 1000);

        let removed = cleanup_old_logs(dir.path(), "server_site", 2).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.path().join("server_site.log.2026-01-01").exists());
        assert!(dir.path().join("server_site.log.2026-01-03").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn nothing_to_remove_under_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "server_site.log.2026-01-01", 10);
        assert_eq!(cleanup_old_logs(dir.path(), "server_site", 5).unwrap(), 0);
    }
}
