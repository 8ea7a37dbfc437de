use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where log lines go. The TUI owns the terminal, so it must log to a file.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Default log file under the user cache dir, falling back to the working directory.
pub fn default_log_file() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("sim-stopwatch"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sim-stopwatch.log")
}

/// `level` overrides `RUST_LOG`; with neither set the filter is `info`.
pub fn build_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}")),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(level: Option<&str>, target: &LogTarget) -> Result<()> {
    let filter = build_filter(level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let res = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };
    if res.is_err() {
        tracing::debug!("global subscriber already installed");
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_level_is_validated() {
        assert!(build_filter(Some("debug")).is_ok());
        assert!(build_filter(Some("sim_stopwatch=trace,warn")).is_ok());
        assert!(build_filter(Some("sim_stopwatch=loud")).is_err());
    }

    #[test]
    fn log_file_parent_is_created() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("app.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn default_log_file_name() {
        assert!(default_log_file().ends_with("sim-stopwatch.log"));
    }
}
