//! Comparative command implementation.

use std::path::PathBuf;

use salvo::tournament::{comparative, ComparativeConfig, PluginLibrary};

use super::CliError;

/// Execute the comparative command.
///
/// # Errors
///
/// Returns an error if the run fails outright (bad map, unloadable
/// algorithms, unusable game-manager folder).
pub(crate) fn execute(
    game_map: PathBuf,
    game_managers_folder: PathBuf,
    algorithm1: PathBuf,
    algorithm2: PathBuf,
    num_threads: usize,
    verbose: bool,
    progress: bool,
) -> Result<(), CliError> {
    let config = ComparativeConfig {
        map_path: game_map,
        gm_folder: game_managers_folder,
        algorithm1_path: algorithm1,
        algorithm2_path: algorithm2,
        num_threads,
        verbose,
        progress,
    };
    let library = PluginLibrary::with_builtins();
    comparative::run(&config, &library)?;
    Ok(())
}
