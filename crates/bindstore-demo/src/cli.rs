#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo.
//!
//! Parses args manually (no external dependencies) to keep the binary lean.
//! Supports environment variable overrides via `BINDSTORE_DEMO_*` prefix.

use std::env;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
bindstore demo: worker threads writing a view model, one affinity thread observing

USAGE:
    bindstore-demo [OPTIONS]

OPTIONS:
    --workers=N          Number of writer threads (default: 4)
    --orders=N           Orders filled per writer (default: 25)
    --trader=NAME        Initial trader name (default: Trader)
    --confirm-kick       Answer the kick confirmation with yes (default)
    --no-confirm-kick    Answer the kick confirmation with no
    --log=FILTER         tracing filter, e.g. 'info' or 'bindstore_core=debug'
    --log-format=FORMAT  Log output: text or json (default: text)
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    BINDSTORE_DEMO_WORKERS        Override --workers
    BINDSTORE_DEMO_ORDERS         Override --orders
    BINDSTORE_DEMO_TRADER         Override --trader
    BINDSTORE_DEMO_CONFIRM_KICK   1/true to confirm, 0/false to decline
    BINDSTORE_DEMO_LOG            Override --log (RUST_LOG is used when neither is set)
    BINDSTORE_DEMO_LOG_FORMAT     Override --log-format
    BINDSTORE_NOTIFY_PRIORITY     Store notification priority (databind, normal, ...)
    BINDSTORE_THROW_ON_INVALID_NAME  Fail hard on unregistered property names (debug builds)";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable `tracing-subscriber` fmt output.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Number of writer threads.
    pub workers: usize,
    /// Orders filled by each writer.
    pub orders: u64,
    /// Initial trader name.
    pub trader: String,
    /// Answer given to the kick confirmation.
    pub confirm_kick: bool,
    /// Explicit tracing filter.
    pub log: Option<String>,
    /// Log output format.
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            workers: 4,
            orders: 25,
            trader: "Trader".into(),
            confirm_kick: true,
            log: None,
            log_format: LogFormat::Text,
        }
    }
}

fn flag_enabled(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl Opts {
    /// Parse command-line arguments and environment variables.
    ///
    /// Environment variables take precedence over defaults but are overridden
    /// by explicit command-line flags.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("bindstore-demo {VERSION}");
                process::exit(0);
            }
            Err(ParseError::InvalidValue { flag, value }) => {
                eprintln!("Invalid {flag} value: {value}");
                process::exit(1);
            }
            Err(ParseError::UnknownArg(arg)) => {
                eprintln!("Unknown argument: {arg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    fn parse_from_env_and_args<I, S, F>(args: I, get_env: F) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        // Apply environment variable defaults first
        if let Some(val) = get_env("BINDSTORE_DEMO_WORKERS")
            && let Ok(n) = val.parse()
        {
            opts.workers = n;
        }
        if let Some(val) = get_env("BINDSTORE_DEMO_ORDERS")
            && let Ok(n) = val.parse()
        {
            opts.orders = n;
        }
        if let Some(val) = get_env("BINDSTORE_DEMO_TRADER") {
            opts.trader = val;
        }
        if let Some(val) = get_env("BINDSTORE_DEMO_CONFIRM_KICK") {
            opts.confirm_kick = flag_enabled(&val);
        }
        if let Some(val) = get_env("BINDSTORE_DEMO_LOG")
            && !val.trim().is_empty()
        {
            opts.log = Some(val);
        }
        if let Some(val) = get_env("BINDSTORE_DEMO_LOG_FORMAT")
            && let Some(format) = LogFormat::parse(&val)
        {
            opts.log_format = format;
        }

        // Parse command-line args (override env vars)
        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                "--confirm-kick" => opts.confirm_kick = true,
                "--no-confirm-kick" => opts.confirm_kick = false,
                other => {
                    if let Some(val) = other.strip_prefix("--workers=") {
                        opts.workers = val.parse().map_err(|_| ParseError::InvalidValue {
                            flag: "--workers",
                            value: val.to_string(),
                        })?;
                    } else if let Some(val) = other.strip_prefix("--orders=") {
                        opts.orders = val.parse().map_err(|_| ParseError::InvalidValue {
                            flag: "--orders",
                            value: val.to_string(),
                        })?;
                    } else if let Some(val) = other.strip_prefix("--trader=") {
                        opts.trader = val.to_string();
                    } else if let Some(val) = other.strip_prefix("--log=") {
                        opts.log = Some(val.to_string());
                    } else if let Some(val) = other.strip_prefix("--log-format=") {
                        opts.log_format =
                            LogFormat::parse(val).ok_or_else(|| ParseError::InvalidValue {
                                flag: "--log-format",
                                value: val.to_string(),
                            })?;
                    } else {
                        return Err(ParseError::UnknownArg(other.to_string()));
                    }
                }
            }
        }

        Ok(opts)
    }
}
