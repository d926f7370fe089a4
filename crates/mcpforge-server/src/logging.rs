//! Logging initialization, grounded on the teacher's `LoggingConfig`/
//! `LoggingGuard` pair.
//!
//! For the stdio transport, stdout is the protocol channel and must never
//! carry log output (spec §4.I): use `stderr_minimal()` or `stdio_file()`.

use std::io;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    None,
    Stderr,
    FileOnly,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogRotation {
    Minute,
    Hourly,
    Daily,
    #[default]
    Never,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub structured: bool,
    pub output: LogOutput,
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    pub rotation: LogRotation,
}

impl LoggingConfig {
    /// Stderr only, error level. No guard needed: direct, unbuffered writes.
    pub fn stderr_minimal() -> Self {
        Self {
            level: "error".to_string(),
            structured: false,
            output: LogOutput::Stderr,
            directory: None,
            file_prefix: "mcpforge".to_string(),
            rotation: LogRotation::Never,
        }
    }

    pub fn stderr_debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Self::stderr_minimal()
        }
    }

    /// File-only, info level: for a stdio server that wants logs without
    /// touching stdout or stderr at all.
    pub fn stdio_file(directory: impl Into<PathBuf>) -> Self {
        Self {
            level: "info".to_string(),
            structured: false,
            output: LogOutput::FileOnly,
            directory: Some(directory.into()),
            file_prefix: "mcpforge".to_string(),
            rotation: LogRotation::Never,
        }
    }

    pub fn production(directory: impl Into<PathBuf>) -> Self {
        Self {
            level: "info".to_string(),
            structured: true,
            output: LogOutput::Both,
            directory: Some(directory.into()),
            file_prefix: "mcpforge".to_string(),
            rotation: LogRotation::Hourly,
        }
    }

    /// Returns `Some(guard)` for file-based outputs (the guard must be held
    /// for the process lifetime to flush buffered logs on drop), or `None`
    /// for stderr-only / disabled logging.
    pub fn init(&self) -> io::Result<Option<LoggingGuard>> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.output {
            LogOutput::None => Ok(None),
            LogOutput::Stderr => {
                self.init_stderr(filter)?;
                Ok(None)
            }
            LogOutput::FileOnly => {
                let dir = self.require_directory()?;
                Ok(Some(self.init_file_only(dir, filter)?))
            }
            LogOutput::Both => {
                let dir = self.require_directory()?;
                Ok(Some(self.init_stderr_and_file(dir, filter)?))
            }
        }
    }

    fn require_directory(&self) -> io::Result<&std::path::Path> {
        self.directory.as_deref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "file logging requires a directory (use .directory or stdio_file())",
            )
        })
    }

    fn init_stderr(&self, filter: EnvFilter) -> io::Result<()> {
        let subscriber = tracing_subscriber::registry().with(filter);
        if self.structured {
            subscriber
                .with(fmt::layer().json().with_writer(io::stderr))
                .try_init()
        } else {
            subscriber.with(fmt::layer().with_writer(io::stderr)).try_init()
        }
        .map_err(io::Error::other)
    }

    fn rolling(&self, dir: &std::path::Path) -> tracing_appender::rolling::RollingFileAppender {
        match self.rotation {
            LogRotation::Minute => tracing_appender::rolling::minutely(dir, &self.file_prefix),
            LogRotation::Hourly => tracing_appender::rolling::hourly(dir, &self.file_prefix),
            LogRotation::Daily => tracing_appender::rolling::daily(dir, &self.file_prefix),
            LogRotation::Never => tracing_appender::rolling::never(dir, &self.file_prefix),
        }
    }

    fn init_file_only(&self, dir: &std::path::Path, filter: EnvFilter) -> io::Result<LoggingGuard> {
        std::fs::create_dir_all(dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(self.rolling(dir));
        let subscriber = tracing_subscriber::registry().with(filter);
        if self.structured {
            subscriber
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init()
        } else {
            subscriber.with(fmt::layer().with_writer(non_blocking)).try_init()
        }
        .map_err(io::Error::other)?;
        Ok(LoggingGuard {
            _file_guard: guard,
            _stderr_guard: None,
        })
    }

    fn init_stderr_and_file(&self, dir: &std::path::Path, filter: EnvFilter) -> io::Result<LoggingGuard> {
        std::fs::create_dir_all(dir)?;
        let (file_non_blocking, file_guard) = tracing_appender::non_blocking(self.rolling(dir));
        let (stderr_non_blocking, stderr_guard) = tracing_appender::non_blocking(io::stderr());
        let combined = file_non_blocking.and(stderr_non_blocking);
        let subscriber = tracing_subscriber::registry().with(filter);
        if self.structured {
            subscriber
                .with(fmt::layer().json().with_writer(combined))
                .try_init()
        } else {
            subscriber.with(fmt::layer().with_writer(combined)).try_init()
        }
        .map_err(io::Error::other)?;
        Ok(LoggingGuard {
            _file_guard: file_guard,
            _stderr_guard: Some(stderr_guard),
        })
    }
}

/// Holds the non-blocking writer guards; drop it last.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    _stderr_guard: Option<WorkerGuard>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_minimal_has_no_directory() {
        let config = LoggingConfig::stderr_minimal();
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.directory.is_none());
    }

    #[test]
    fn file_only_without_directory_errors() {
        let config = LoggingConfig {
            level: "info".to_string(),
            structured: false,
            output: LogOutput::FileOnly,
            directory: None,
            file_prefix: "test".to_string(),
            rotation: LogRotation::Never,
        };
        assert!(config.init().is_err());
    }

    #[test]
    fn production_uses_hourly_rotation_and_both_outputs() {
        let config = LoggingConfig::production("/tmp/mcpforge-test-logs");
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.rotation, LogRotation::Hourly);
    }
}
