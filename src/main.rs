use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ChangesCommand, ConfigCommand, ItemCommand, UserCommand};
use diary::{Config, Storage};

#[derive(Parser)]
#[command(name = "diary")]
#[command(version)]
#[command(about = "A dated diary with a synchronizable change log", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and write diary items
    Item(ItemCommand),

    /// Read the change log
    Changes(ChangesCommand),

    /// Manage users
    User(UserCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Item(cmd)) => {
            let storage = Storage::open(&config.database_path.value).await?;
            cmd.run(&storage).await?;
        }
        Some(Commands::Changes(cmd)) => {
            let storage = Storage::open(&config.database_path.value).await?;
            cmd.run(&storage, config.sync).await?;
        }
        Some(Commands::User(cmd)) => {
            let storage = Storage::open(&config.database_path.value).await?;
            cmd.run(&storage).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
