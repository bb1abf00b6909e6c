//! Command-line interface for convo-tracker.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::StorageBackend;

/// Command-line arguments.
#[derive(Debug, Clone)]
pub struct Args {
    /// Host address override.
    pub host: Option<IpAddr>,
    /// Port override.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Storage backend override.
    pub store: Option<StorageBackend>,
    /// SQLite database path override.
    pub db_path: Option<PathBuf>,
    /// Exit immediately on Ctrl-C.
    pub no_graceful_shutdown: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            config: None,
            store: None,
            db_path: None,
            no_graceful_shutdown: false,
            log_level: None,
            version: false,
            help: false,
        }
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("store") => {
                let value: String = parser.value()?.parse()?;
                result.store = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("store", value))?,
                );
            }
            Short('d') | Long("db") => {
                result.db_path = Some(parser.value()?.parse()?);
            }
            Long("no-graceful-shutdown") => {
                result.no_graceful_shutdown = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"convo-tracker {version}
Idempotent conversation-session tracker

USAGE:
    convo-tracker [OPTIONS]

OPTIONS:
    -H, --host <ADDR>         Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>         Port to listen on [default: 3000]
    -c, --config <FILE>       Path to configuration file (JSON)
    -s, --store <BACKEND>     Storage backend: memory | sqlite [default: memory]
    -d, --db <FILE>           SQLite database file [default: convo-tracker.db]
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
        --no-graceful-shutdown
                              Exit immediately on Ctrl-C
    -h, --help                Print help
    -V, --version             Print version

ENVIRONMENT VARIABLES:
    CONVO_TRACKER_HOST        Host address (overrides config)
    CONVO_TRACKER_PORT        Port number (overrides config)
    CONVO_TRACKER_STORE       Storage backend (overrides config)
    CONVO_TRACKER_DB          SQLite database file (overrides config)
    CONVO_TRACKER_LOG_LEVEL   Log level (overrides config)
    RUST_LOG                  Alternative log level setting

EXAMPLES:
    # Start with defaults (localhost:3000, in-memory store)
    convo-tracker

    # Persist sessions to SQLite on all interfaces
    convo-tracker -H 0.0.0.0 -p 8080 -s sqlite -d /var/lib/convo-tracker/sessions.db

    # Start with config file
    convo-tracker -c /etc/convo-tracker/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("convo-tracker {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// Lexopt parsing error.
    #[error("{0}")]
    Lexopt(#[from] lexopt::Error),
    /// Invalid argument value.
    #[error("invalid value for --{0}: '{1}'")]
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    #[error("unexpected argument: '{0}'")]
    UnexpectedArgument(String),
}
