//! CLI argument definitions using clap.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

/// Pumpkin - scheduled message ingestion and dispatch
#[derive(Parser, Debug)]
#[command(
    name = "pumpkin",
    author,
    version,
    about = "Scheduled message ingestion and dispatch engine",
    long_about = "Polls mailbox and social feeds, extracts key:value directives from each \n\
                  message, and renders every message once its release time has come.\n\n\
                  Messages carrying `delay:30m` are held back; `rate`, `volume` and \n\
                  `voice` directives tune the output for that message only."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PUMPKIN_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PUMPKIN_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level used when `RUST_LOG` is not set
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start every feed and the dispatcher until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Run the directive parser on a piece of text
    Parse(ParseArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "pumpkin.toml", env = "PUMPKIN_CONFIG")]
    pub config: PathBuf,

    /// Override the dispatcher tick interval (e.g. 500ms, 2s)
    #[arg(long, value_parser = parse_interval, env = "PUMPKIN_TICK_INTERVAL")]
    pub tick_interval: Option<Duration>,

    /// Do not send heartbeats even when the configuration enables them
    #[arg(long)]
    pub no_liveness: bool,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "PUMPKIN_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without starting feeds
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "PUMPKIN_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pumpkin.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `parse` command
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Message text, e.g. "Hello there rate:100 delay:2s"
    pub text: String,

    /// Receive time as RFC 3339 (defaults to now)
    #[arg(long)]
    pub received_at: Option<DateTime<Utc>>,

    /// Output the parsed message as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

fn parse_interval(text: &str) -> Result<Duration, String> {
    let interval = contracts::parse_duration(text).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["pumpkin", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("pumpkin.toml"));
        assert_eq!(args.tick_interval, None);
        assert_eq!(args.timeout, 0);
        assert!(!args.no_liveness);
    }

    #[test]
    fn test_tick_interval_uses_duration_grammar() {
        let cli = Cli::parse_from(["pumpkin", "run", "--tick-interval", "250ms"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.tick_interval, Some(Duration::from_millis(250)));

        assert!(Cli::try_parse_from(["pumpkin", "run", "--tick-interval", "0s"]).is_err());
        assert!(Cli::try_parse_from(["pumpkin", "run", "--tick-interval", "soon"]).is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Cli::parse_from(["pumpkin", "parse", "x"]).default_log_level(), "info");
        assert_eq!(Cli::parse_from(["pumpkin", "-vv", "parse", "x"]).default_log_level(), "trace");
        assert_eq!(Cli::parse_from(["pumpkin", "-q", "parse", "x"]).default_log_level(), "warn");
        assert!(Cli::try_parse_from(["pumpkin", "-q", "-v", "parse", "x"]).is_err());
    }

    #[test]
    fn test_parse_accepts_received_at() {
        let cli = Cli::parse_from([
            "pumpkin",
            "parse",
            "Hello delay:2s",
            "--received-at",
            "2024-05-01T12:00:00Z",
        ]);
        let Commands::Parse(args) = cli.command else {
            panic!("expected parse command");
        };
        assert_eq!(args.text, "Hello delay:2s");
        assert_eq!(
            args.received_at.map(|t| t.to_rfc3339()),
            Some("2024-05-01T12:00:00+00:00".to_string())
        );
    }
}
