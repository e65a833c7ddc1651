//! CLI command definitions and handlers

use std::num::NonZeroU32;

use clap::{Args, Parser, Subcommand};

pub mod args;
pub mod burst;
pub mod check;
pub mod context;
pub mod query;
pub mod token;

pub use args::OutputFormat;
pub use context::HarnessContext;

/// Query used by `check` and `burst` when none is given
pub const DEFAULT_PROBE_QUERY: &str = "What is retrieval augmented generation?";

/// ragcheck - verification harness for the authenticated RAG query API
#[derive(Parser, Debug)]
#[command(name = "ragcheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, json)
    #[arg(
        long,
        global = true,
        env = "RAGCHECK_FORMAT",
        default_value = "pretty",
        hide_env = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "RAGCHECK_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the query endpoint base URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Network timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable debug logging
    #[arg(long, global = true, env = "RAGCHECK_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Keep fetched tokens in memory instead of the cache directory
    #[arg(long, global = true)]
    pub no_persist: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve and inspect access tokens
    #[command(subcommand)]
    Token(TokenCommands),

    /// Send a single query and print the response
    Query(QueryArgs),

    /// Run the authentication and response contract checks
    Check {
        /// Query text used by the checks
        #[arg(long, default_value = DEFAULT_PROBE_QUERY)]
        query: String,
    },

    /// Fire concurrent queries and summarize statuses and latency
    Burst(BurstArgs),

    /// Display version information
    Version,
}

/// Token subcommands
#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Print the resolved bearer token
    Show,

    /// Show credential environment and cached token state
    Status,

    /// Print the token cache file location
    Path,
}

/// Arguments for `query`
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Query text
    pub text: String,

    /// Number of results to request
    #[arg(long, short = 'n')]
    pub count: Option<u32>,

    /// Index to search
    #[arg(long)]
    pub index: Option<String>,

    /// Extra request header as NAME:VALUE (repeatable)
    #[arg(long = "header", short = 'H', value_parser = args::parse_header)]
    pub headers: Vec<(String, String)>,

    /// Send the request without an Authorization header
    #[arg(long, conflicts_with = "auth_header")]
    pub no_auth: bool,

    /// Use this exact Authorization header value
    #[arg(long)]
    pub auth_header: Option<String>,
}

/// Arguments for `burst`
#[derive(Args, Debug, Clone)]
pub struct BurstArgs {
    /// Total number of requests
    #[arg(long, default_value_t = 20)]
    pub requests: usize,

    /// Maximum requests in flight
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Pace requests to at most this many per second
    #[arg(long)]
    pub rate: Option<NonZeroU32>,

    /// Query text
    #[arg(long, default_value = DEFAULT_PROBE_QUERY)]
    pub query: String,

    /// Index to search
    #[arg(long)]
    pub index: Option<String>,
}
