mod config;
mod error;
mod store;

use clap::Parser;
use config::{AppConfig, Cli, Commands};

mod cmd;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match AppConfig::load(&cli.config) {
        Ok(config) => match cli.command {
            Commands::Sync(args) => cmd::sync::run(args, config).await,
            Commands::Download(args) => cmd::download::run(args, config).await,
        },
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
