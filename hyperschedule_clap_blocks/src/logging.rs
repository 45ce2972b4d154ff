//! CLI config for logging.

use std::io::IsTerminal;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

/// Filter used when neither `--log-filter` nor `-v` is given
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("failed to install the global subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Logs: message format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// human-readable, single line
    #[default]
    Full,
    /// human-readable, multi line
    Pretty,
    /// machine-parseable
    Json,
}

/// Logs: destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogDestination {
    #[default]
    Stdout,
    Stderr,
}

/// CLI config for the logging related subset of options.
#[derive(Debug, Clone, clap::Parser)]
pub struct LoggingConfig {
    /// Logs: filter directive
    ///
    /// Configures log severity level filter, by target.
    ///
    /// Simplest options: error, warn, info, debug, trace
    ///
    /// Levels for different modules can be specified. For example
    /// `debug,hyper::proto::h1=info` specifies debug logging for all modules
    /// except for the `hyper::proto::h1' module which will only display info
    /// level logging.
    ///
    /// Overridden by `-v`.
    #[clap(long = "log-filter", env = "LOG_FILTER", action)]
    pub log_filter: Option<String>,

    /// Logs: filter short-hand
    ///
    /// Convenient way to set log severity level filter.
    /// Overrides `--log-filter`.
    ///
    /// -v   'info'
    ///
    /// -vv  'debug,hyper::proto::h1=info,h2=info'
    ///
    /// -vvv 'trace,hyper::proto::h1=info,h2=info'
    #[clap(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        verbatim_doc_comment
    )]
    pub log_verbose_count: u8,

    /// Logs: destination
    #[clap(
        long = "log-destination",
        env = "LOG_DESTINATION",
        default_value = "stdout",
        value_enum,
        action
    )]
    pub log_destination: LogDestination,

    /// Logs: message format
    #[clap(
        long = "log-format",
        env = "LOG_FORMAT",
        default_value = "full",
        value_enum,
        action
    )]
    pub log_format: LogFormat,
}

impl LoggingConfig {
    /// The effective filter; `-v` takes precedence over `--log-filter`
    pub fn filter(&self) -> Result<EnvFilter, Error> {
        let directives = match self.log_verbose_count {
            0 => self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER),
            1 => "info",
            2 => "debug,hyper::proto::h1=info,h2=info",
            _ => "trace,hyper::proto::h1=info,h2=info",
        };
        Ok(EnvFilter::try_new(directives)?)
    }

    fn writer(&self) -> BoxMakeWriter {
        match self.log_destination {
            LogDestination::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogDestination::Stderr => BoxMakeWriter::new(std::io::stderr),
        }
    }

    /// Colors only when writing to a terminal
    fn ansi(&self) -> bool {
        match self.log_destination {
            LogDestination::Stdout => std::io::stdout().is_terminal(),
            LogDestination::Stderr => std::io::stderr().is_terminal(),
        }
    }

    /// Build the subscriber described by this config and install it for all threads
    pub fn install_global_subscriber(&self) -> Result<(), Error> {
        let filter = self.filter()?;
        let fmt = tracing_subscriber::fmt::layer()
            .with_writer(self.writer())
            .with_ansi(self.ansi());
        let registry = tracing_subscriber::registry().with(filter);
        match self.log_format {
            LogFormat::Full => registry.with(fmt).try_init()?,
            LogFormat::Pretty => registry.with(fmt.pretty()).try_init()?,
            LogFormat::Json => registry.with(fmt.json()).try_init()?,
        }
        Ok(())
    }
}
