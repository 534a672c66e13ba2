//! Paygate CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;

mod commands;
mod config;
mod handlers;
mod logging;

use commands::{Commands, ConfigCommands};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "paygate")]
#[command(author, version, about = "Subscription-gated API server", long_about = None)]
struct Cli {
    /// Extra configuration file, layered over config/default and config/local
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging);

    match cli.command {
        Commands::Serve { host, port } => handlers::serve(&config, host, port).await?,
        Commands::Keygen => handlers::keygen(&config).await?,
        Commands::Fingerprint { key } => handlers::fingerprint(key)?,
        Commands::Config { command } => match command {
            ConfigCommands::Show => handlers::show_config(&config),
        },
    }

    Ok(())
}
