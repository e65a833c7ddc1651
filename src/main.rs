//! ragcheck - verification harness for an authenticated RAG query API

use clap::Parser;

mod cli;
mod client;
mod config;
mod contract;
mod credential;
mod error;
mod load;
mod output;

use cli::args::GlobalOptions;
use cli::{Cli, Commands, HarnessContext, TokenCommands};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// RUST_LOG overrides the default filter
fn init_logging(debug: bool) {
    let default_filter = if debug { "ragcheck=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.command {
        println!("ragcheck version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let opts = GlobalOptions::from_cli(&cli);
    let ctx = HarnessContext::new(&opts)?;

    match &cli.command {
        Commands::Token(cmd) => match cmd {
            TokenCommands::Show => cli::token::show(&ctx).await,
            TokenCommands::Status => cli::token::status(&ctx),
            TokenCommands::Path => cli::token::path(&ctx),
        },
        Commands::Query(args) => cli::query::run(&ctx, args).await,
        Commands::Check { query } => cli::check::run(&ctx, query).await,
        Commands::Burst(args) => cli::burst::run(&ctx, args).await,
        Commands::Version => Ok(()),
    }
}
