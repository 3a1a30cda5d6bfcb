//! Logging setup for the event audit service
//!
//! Wires `tracing-subscriber` and `tracing-appender` from a serde-friendly
//! [`LogConfig`], so the server can take its logging section straight from
//! its TOML file.
//!
//! # Features
//!
//! - **JSON lines or pretty console output**
//! - **File output**: daily/hourly/never rotation with a non-blocking writer
//! - **RUST_LOG override**: the environment wins over the configured level
//!
//! # Quick Start
//!
//! ```ignore
//! use audit_logging::{AuditSubscriberBuilder, LogConfig};
//!
//! // Keep the guard alive for as long as file output should be flushed
//! let _guard = AuditSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```

pub mod config;

pub use config::{ConsoleConfig, FileConfig, LogConfig, LogFormat, RotationStrategy};
pub use tracing_appender::non_blocking::WorkerGuard;

use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors raised while setting up logging
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level directive: {0}")]
    Filter(#[from] ParseError),

    #[error("Failed to create log file appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("Failed to install global subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Builder for configuring and initializing the audit logging subscriber
///
/// By default, console output uses JSON lines. Use `LogConfig::development()`
/// for human-readable output.
#[derive(Debug, Default)]
pub struct AuditSubscriberBuilder {
    config: LogConfig,
}

impl AuditSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Build the subscriber without installing it
    ///
    /// The returned guard (present only with file output) flushes pending
    /// lines when dropped.
    pub fn build(
        self,
    ) -> Result<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>), LoggingError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.config.level)?,
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(console_layer(&self.config.console));
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = tracing_appender::non_blocking(file_appender(file_config)?);
            guard = Some(file_guard);

            layers.push(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
        }

        let subscriber = Registry::default().with(layers).with(filter);
        Ok((subscriber, guard))
    }

    /// Install the subscriber globally
    ///
    /// # Errors
    ///
    /// Fails if the level directive does not parse, the log directory cannot
    /// be used, or a global subscriber is already set.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let (subscriber, guard) = self.build()?;
        subscriber.try_init()?;
        Ok(guard)
    }

    /// Install the subscriber globally, reporting failure on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Logging not initialized: {e}");
                None
            }
        }
    }
}

fn console_layer(config: &ConsoleConfig) -> BoxedLayer {
    match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_ansi(false)
            .boxed(),
    }
}

fn file_appender(config: &FileConfig) -> Result<RollingFileAppender, LoggingError> {
    let rotation = match config.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => Rotation::NEVER,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }

    Ok(builder.build(&config.directory)?)
}
