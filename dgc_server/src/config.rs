use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use clap::{Parser, ValueEnum};
use dgc_core::{
    logging::{OutputFormat, TracingConfig},
    source::{self, SourceConfig},
};
use tracing::Level;

/// How the server writes its log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

impl From<LogFormat> for OutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => OutputFormat::Compact,
            LogFormat::Json => OutputFormat::Json,
        }
    }
}

/// Serve the Ogrodje timeline as JSON and as an iCalendar feed.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Config {
    /// the port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    /// the address to bind to
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
    /// the upstream timeline URL
    #[arg(long, env = "TIMELINE_URL", default_value = source::DEFAULT_URL)]
    pub timeline_url: String,
    /// seconds a fetched timeline is served before fetching it again
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value_t = 300)]
    pub cache_ttl: u64,
    /// the directory with the static frontend
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,
    /// the log level when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,
    /// how log lines are written to stderr
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig::default().with_url(&self.timeline_url)
    }

    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig::default()
            .with_level(self.log_level)
            .with_format(self.log_format.into())
    }
}
