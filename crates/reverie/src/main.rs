//! Reverie CLI binary.
//!
//! This binary provides command-line access to Reverie:
//! - Simulate a story end to end over scripted services
//! - Print the effective configuration

use clap::Parser;
use reverie::{ReverieConfig, init_tracing};

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, run_simulation};

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => ReverieConfig::from_file(path)?,
        None => ReverieConfig::load()?,
    };

    match cli.command {
        Commands::Simulate(args) => {
            run_simulation(&args, config).await?;
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
