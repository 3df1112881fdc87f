//!
//! Global tracing subscriber for the command line tool.
//!
//! Logs go to stderr: stdout is reserved for the container name so it can be captured by scripts.
//!
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Result, error::Error};

/// Builder for the global tracing subscriber
#[derive(Debug, Clone)]
pub struct LoggerBuilder {
    level: LevelFilter,
    filter: Option<String>,
    ansi: bool,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            filter: None,
            ansi: true,
        }
    }
}

impl LoggerBuilder {
    /// Default level for targets not named by the filter.
    #[must_use]
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Level matching a `-v` count: 0 is `warn`, 1 is `info`, 2 is `debug`, more is `trace`.
    #[must_use]
    pub fn verbosity(self, count: u8) -> Self {
        let level = match count {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        self.level(level)
    }

    /// Explicit filter directives, used instead of `RUST_LOG`.
    #[must_use]
    pub fn filter(mut self, filter: Option<impl Into<String>>) -> Self {
        self.filter = filter.map(Into::into);
        self
    }

    #[must_use]
    pub fn ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    pub(crate) fn build_env_filter(&self) -> Result<EnvFilter> {
        let builder = EnvFilter::builder().with_default_directive(self.level.into());
        match &self.filter {
            Some(filter) => builder
                .parse(filter)
                .map_err(|e| Error::invalid_input(format!("Invalid log filter '{filter}': {e}"))),
            None => Ok(builder.from_env_lossy()),
        }
    }

    /// Installs the subscriber. Fails if one is already installed in this process.
    pub fn init(self) -> Result<()> {
        let env_filter = self.build_env_filter()?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_ansi(self.ansi),
            )
            .try_init()?;

        Ok(())
    }
}

pub fn builder() -> LoggerBuilder {
    LoggerBuilder::default()
}
