//! Packsmith - project scaffolding from versioned packs
//!
//! A command line tool that installs versioned packs into a content-addressed
//! store and generates project files from them: template rendering, conflict
//! detection, idempotent file patching, and lifecycle commands, all staged in
//! isolation and committed atomically with a per-target generation history.

use clap::Parser;

mod cli;
mod commands;
mod common;
mod conflict;
mod error;
mod generate;
mod hash;
mod hooks;
mod manifest;
mod patch;
mod render;
mod resolver;
mod state;
mod store;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Install(args) => commands::install::run(cli.packs_root, args),
        Commands::Generate(args) => commands::generate::run(cli.packs_root, args, cli.verbose),
        Commands::List(args) => commands::list::run(cli.packs_root, args),
        Commands::Versions(args) => commands::versions::run(cli.packs_root, args),
        Commands::History(args) => commands::history::run(args),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        // Operational errors are user-actionable; environment faults get a
        // distinct exit code for scripts
        std::process::exit(if e.is_operational() { 1 } else { 2 });
    }
}
