//! nestattr CLI
//!
//! Runs nested attribute reconciliation over JSON files

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "nestattr")]
#[command(about = "nestattr - Reconcile nested attribute payloads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the directives a payload produces
    Reconcile(commands::reconcile::ReconcileArgs),
    /// Apply a payload and print the committed children
    Apply(commands::apply::ApplyArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Reconcile(args) => commands::reconcile::execute(args),
        Commands::Apply(args) => commands::apply::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
