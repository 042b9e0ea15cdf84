mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{init, replay, serve, simulate, InitArgs, ReplayArgs, ServeArgs, SimulateArgs};
use tracing_subscriber::EnvFilter;

/// Classdraft CLI - autosave and version history for classroom documents
#[derive(Parser, Debug)]
#[command(name = "classdraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default classdraft.config.json
    Init(InitArgs),

    /// Run the in-memory document store over HTTP
    Serve(ServeArgs),

    /// Print a history listing and reconstruct one of its entries
    Replay(ReplayArgs),

    /// Run a timed edit script through the save scheduler
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Init(args) => init(args, &cwd),
                Command::Serve(args) => serve(args, &cwd).await,
                Command::Replay(args) => replay(args, &cwd),
                Command::Simulate(args) => simulate(args, &cwd).await,
            }
        }
        Err(err) => Err(anyhow::anyhow!("cannot get current directory: {}", err)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
