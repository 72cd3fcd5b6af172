//! Logging setup for the `hubsig` binary.
//!
//! Logs go to stderr so `hubsig sign` can print the header value on stdout.
//! `RUST_LOG` takes precedence over the verbosity given on the command line.

use tracing_subscriber::{fmt, EnvFilter};

/// Log level selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Info level (default)
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Level for a `-v` count, or [`LogLevel::Quiet`] when `quiet` is set.
    pub fn from_flags(verbosity: u8, quiet: bool) -> Self {
        if quiet {
            return LogLevel::Quiet;
        }
        match verbosity {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Quiet => "error",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(level: LogLevel) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level.directive())
    };

    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(level >= LogLevel::Debug)
        .init();
}
