//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, health), and their associated
//! argument structs. Every `run` flag has an environment variable
//! equivalent for container deployments; tuning flags override the
//! matching `pool` values from the config file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::model::Config;

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "HTTP forwarding proxy",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        ferry run                            Start with defaults on :3000\n  \
        ferry run -c ferry.yaml              Start with a config file\n  \
        curl 'localhost:3000/proxy?url=https://example.com/'"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        ferry run                                   Auto-detect ./ferry.yaml\n  \
        ferry run -c ferry.toml                     Specific config file\n  \
        ferry run -p 8080 --pretty                  Local dev mode\n  \
        ferry run --max-connections 200             Smaller outbound pool")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Ingress path of the forwarding endpoint
    #[arg(long, env = "FERRY_PATH")]
    pub path: Option<String>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Observability --
    /// Sentry DSN (enables error tracking)
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_DSN", help_heading = "Observability")]
    pub sentry_dsn: Option<String>,

    /// Sentry environment tag
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_ENVIRONMENT", help_heading = "Observability")]
    pub sentry_environment: Option<String>,

    // -- Tuning --
    /// Max concurrent outbound connections
    #[arg(long, env = "FERRY_MAX_CONNECTIONS", help_heading = "Tuning")]
    pub max_connections: Option<usize>,

    /// Max concurrent outbound connections per target host
    #[arg(long, env = "FERRY_MAX_PER_HOST", help_heading = "Tuning")]
    pub max_per_host: Option<usize>,

    /// Max wait for a pooled connection, in milliseconds
    #[arg(long, env = "FERRY_ACQUIRE_TIMEOUT_MS", help_heading = "Tuning")]
    pub acquire_timeout: Option<u64>,

    /// Connect timeout, in milliseconds
    #[arg(long, env = "FERRY_CONNECT_TIMEOUT_MS", help_heading = "Tuning")]
    pub connect_timeout: Option<u64>,

    /// Socket read timeout, in milliseconds
    #[arg(long, env = "FERRY_SOCKET_TIMEOUT_MS", help_heading = "Tuning")]
    pub socket_timeout: Option<u64>,
}

impl RunArgs {
    /// Apply flags that were given on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref path) = self.path {
            config.proxy.path.clone_from(path);
        }
        let pool = &mut config.pool;
        if let Some(v) = self.max_connections {
            pool.max_total = v;
        }
        if let Some(v) = self.max_per_host {
            pool.max_per_host = v;
        }
        if let Some(v) = self.acquire_timeout {
            pool.acquire_timeout_ms = v;
        }
        if let Some(v) = self.connect_timeout {
            pool.connect_timeout_ms = v;
        }
        if let Some(v) = self.socket_timeout {
            pool.socket_timeout_ms = v;
        }
    }
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        ferry init                          Minimal config (yaml)\n  \
        ferry init --full                   Every option, documented\n  \
        ferry init -f toml -o ferry.toml    TOML format")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include full documentation as comments
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate (defaults to the file `ferry run` would pick up)
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_defaults() {
        let args = parse(&["ferry", "run"]);
        assert_eq!(args.port, 3000);
        assert!(args.config.is_none());
        assert!(args.max_connections.is_none());
    }

    #[test]
    fn tuning_flags_override_config() {
        let args = parse(&[
            "ferry",
            "run",
            "--path",
            "/forward",
            "--max-connections",
            "20",
            "--max-per-host",
            "4",
            "--connect-timeout",
            "250",
        ]);
        let mut config = Config::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.proxy.path, "/forward");
        assert_eq!(config.pool.max_total, 20);
        assert_eq!(config.pool.max_per_host, 4);
        assert_eq!(config.pool.connect_timeout_ms, 250);
        assert_eq!(config.pool.socket_timeout_ms, 10_000);
    }

    #[test]
    fn pretty_and_json_conflict() {
        assert!(Cli::try_parse_from(["ferry", "run", "--pretty", "--json"]).is_err());
    }
}
