//! Salvo CLI - run tank-battle tournaments from the command line.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Salvo - a deterministic tank-battle tournament runner
#[derive(Parser, Debug)]
#[command(name = "salvo")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Worker threads for running games (default: 1)
    #[arg(long, global = true, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    num_threads: u64,

    /// Write a per-match output log for every game
    #[arg(long, global = true)]
    verbose: bool,

    /// Enable the run log; give a path to log to a file instead of stderr
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    logger: Option<String>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Show a progress bar over games
    #[arg(long, global = true)]
    progress: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one map and one algorithm pair under every game manager in a folder
    Comparative {
        /// The map file to play
        #[arg(long)]
        game_map: PathBuf,

        /// Folder of game-manager plugin files
        #[arg(long)]
        game_managers_folder: PathBuf,

        /// First algorithm plugin file
        #[arg(long)]
        algorithm1: PathBuf,

        /// Second algorithm plugin file
        #[arg(long)]
        algorithm2: PathBuf,
    },

    /// Round-robin a folder of algorithms across a folder of maps
    Competition {
        /// Folder of map files
        #[arg(long)]
        game_maps_folder: PathBuf,

        /// The game-manager plugin file
        #[arg(long)]
        game_manager: PathBuf,

        /// Folder of algorithm plugin files (at least two)
        #[arg(long)]
        algorithms_folder: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Usage and parse problems exit with code 1.
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    salvo::logging::init(args.debug, args.logger.as_deref());

    let num_threads = args.num_threads as usize;
    let result = match args.command {
        Commands::Comparative {
            game_map,
            game_managers_folder,
            algorithm1,
            algorithm2,
        } => cli::comparative::execute(
            game_map,
            game_managers_folder,
            algorithm1,
            algorithm2,
            num_threads,
            args.verbose,
            args.progress,
        ),

        Commands::Competition {
            game_maps_folder,
            game_manager,
            algorithms_folder,
        } => cli::competition::execute(
            game_maps_folder,
            game_manager,
            algorithms_folder,
            num_threads,
            args.verbose,
            args.progress,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
