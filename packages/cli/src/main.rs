mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{init, inspect, replay, InitArgs, InspectArgs, ReplayArgs};

/// Folio CLI - drive the visual editor core from the command line
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log session internals at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default folio.config.json
    Init(InitArgs),

    /// Replay a scripted editing session against a document
    Replay(ReplayArgs),

    /// Print a document tree with regions and capabilities
    Inspect(InspectArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Init(args) => init(args),
        Command::Replay(args) => replay(args),
        Command::Inspect(args) => inspect(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
