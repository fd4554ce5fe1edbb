//! Tracing setup shared by the server and the CLI.
//!
//! `RUST_LOG` overrides the configured level, e.g. `RUST_LOG=dgc_core=debug` to watch the cache.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events pass the default filter.
static CRATES: [&str; 3] = ["dgc_core", "dgc_server", "dgc_cli"];

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single-line, human readable.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level for this workspace's crates when `RUST_LOG` is not set.
    pub default_level: Level,
    pub output_format: OutputFormat,
    pub include_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: OutputFormat::Compact,
            include_target: true,
        }
    }
}

impl TracingConfig {
    /// Quieter output for one-shot commands.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            default_level: Level::WARN,
            include_target: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// The filter used when `RUST_LOG` is not set.
    fn default_directives(&self) -> String {
        CRATES
            .iter()
            .map(|name| format!("{name}={}", self.default_level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.default_directives())?,
    };
    let registry = tracing_subscriber::registry().with(env_filter);
    match config.output_format {
        OutputFormat::Compact => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_target),
            ),
        )?,
        OutputFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(config.include_target),
            ),
        )?,
    }
    Ok(())
}
