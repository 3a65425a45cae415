//! Logging configuration

use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::DeckError;

/// Log level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level
    pub log_level: LogLevel,

    /// Write logs to stderr (kept off stdout so rendered output stays clean)
    pub stderr: bool,

    /// Log directory for file output; None disables the file target
    pub log_dir: Option<PathBuf>,

    /// Enable JSON format
    pub json_format: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            stderr: true,
            log_dir: None,
            json_format: false,
        }
    }
}

/// Handle that keeps the non-blocking file writer alive.
///
/// Dropping it flushes and closes the log file, so the caller must hold it
/// for the lifetime of the process.
pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize logging
pub fn init_logging(options: LogOptions) -> Result<LogGuard, DeckError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.to_filter_string()));

    let subscriber = tracing_subscriber::registry().with(filter);

    let mut file_guard = None;
    let file_layer = options.log_dir.as_ref().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir, "pipedeck.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);
        fmt::layer().with_writer(writer).with_ansi(false)
    });

    let result = if options.stderr {
        if options.json_format {
            subscriber
                .with(file_layer)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        } else {
            subscriber
                .with(file_layer)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
        }
    } else {
        subscriber.with(file_layer).try_init()
    };

    result.map_err(|e| DeckError::ConfigError(e.to_string()))?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
