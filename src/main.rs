//! Placa Checker - license plate capture validation CLI
//!
//! Sends vehicle photos to a remote recognition service and decides whether
//! the detected plate can be trusted.

use clap::Parser;
use env_logger::Env;
use placa_checker::cli::Cli;
use placa_checker::commands;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = commands::execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
