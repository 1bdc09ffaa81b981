mod cli;
mod commands;
mod config;
mod error;
mod session;
mod ui;
mod wait;

use clap::Parser;
use cli::{Cli, Commands, GlobalOptions};
use commands::counter::Direction;
use config::Settings;
use error::Result;

fn main() {
    if let Err(err) = run() {
        ui::error(err.to_string());
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.global.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let global = &cli.global;
    match cli.command {
        Commands::Encode(args) => commands::encode::run(args, global.verbose),
        Commands::Completions(args) => commands::completions::run(args),
        Commands::Deploy(args) => on_ledger(global, |settings| commands::deploy::run(args, settings)),
        Commands::Increment(args) => on_ledger(global, |settings| {
            commands::counter::run(args, Direction::Increase, settings)
        }),
        Commands::Decrement(args) => on_ledger(global, |settings| {
            commands::counter::run(args, Direction::Decrease, settings)
        }),
        Commands::Upgrade(args) => on_ledger(global, |settings| commands::upgrade::run(args, settings)),
        Commands::Get(args) => on_ledger(global, |settings| commands::get::run(args, settings)),
    }
}

/// Resolves config and flags, then runs a command against the local ledger.
fn on_ledger(global: &GlobalOptions, run: impl FnOnce(&Settings) -> Result<()>) -> Result<()> {
    let config = config::load(global.config.as_deref())?;
    let settings = Settings::resolve(global, config)?;
    run(&settings)
}
