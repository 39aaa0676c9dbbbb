//! Competition command implementation.

use std::path::PathBuf;

use salvo::tournament::{competition, CompetitionConfig, PluginLibrary};

use super::CliError;

/// Execute the competition command.
///
/// # Errors
///
/// Returns an error if the run fails outright (unloadable game manager,
/// too few algorithms, empty maps folder).
pub(crate) fn execute(
    game_maps_folder: PathBuf,
    game_manager: PathBuf,
    algorithms_folder: PathBuf,
    num_threads: usize,
    verbose: bool,
    progress: bool,
) -> Result<(), CliError> {
    let config = CompetitionConfig {
        maps_folder: game_maps_folder,
        game_manager_path: game_manager,
        algorithms_folder,
        num_threads,
        verbose,
        progress,
    };
    let library = PluginLibrary::with_builtins();
    competition::run(&config, &library)?;
    Ok(())
}
