//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct holds
/// the CLI layer; `HarnessContext` merges it over the loaded configuration.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (pretty, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.ragcheck/config.yaml)
    pub config: Option<String>,

    /// Query endpoint override
    pub endpoint: Option<String>,

    /// Network timeout override in seconds
    pub timeout: Option<u64>,

    /// Keep fetched tokens in memory only
    pub no_persist: bool,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            endpoint: cli.endpoint.clone(),
            timeout: cli.timeout,
            no_persist: cli.no_persist,
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Get endpoint override as `Option<&str>`.
    pub fn endpoint_ref(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}
