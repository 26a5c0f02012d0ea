mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands};
use mediafetch::config::Config;
use mediafetch::observability::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.telemetry.log_level);
    info!(binary = %config.downloader.binary.display(), "Configuration loaded");

    let code = match cli.command {
        Commands::Server(args) => {
            mediafetch::api::run(config, args.address).await?;
            ExitCode::SUCCESS
        }
        Commands::Fetch(args) => commands::fetch(&config, args).await?,
        Commands::Metadata(args) => commands::metadata(&config, args).await?,
        Commands::Check => commands::check(&config).await?,
    };

    Ok(code)
}
