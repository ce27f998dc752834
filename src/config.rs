//! Configuration for the echo server.
//!
//! The only configuration surface is a single optional port argument;
//! everything else is fixed by design.

use clap::error::ErrorKind;
use clap::Parser;

/// Port used when none is given on the command line.
pub const DEFAULT_PORT: u16 = 8080;

/// Command-line arguments for the echo server
#[derive(Parser, Debug)]
#[command(name = "echod")]
#[command(version = "0.1.0")]
#[command(about = "A concurrent TCP echo server", long_about = None)]
pub struct CliArgs {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
}

impl Config {
    /// Load configuration from CLI arguments.
    ///
    /// An unparsable port is a fatal startup error and surfaces as
    /// `ConfigError`, so the process exits with status 1 rather than
    /// clap's default status.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = match CliArgs::try_parse() {
            Ok(cli) => cli,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                e.exit()
            }
            Err(e) => return Err(ConfigError::InvalidArgs(e)),
        };

        Ok(Config { port: cli.port })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    InvalidArgs(clap::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidArgs(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
