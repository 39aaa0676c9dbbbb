//! Comparative mode: one map and one algorithm pair, run under every game
//! manager found in a folder, with identical outcomes grouped together.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::game::{GameResult, Owner};
use crate::tournament::maps::{load_map, MapData, MapError};
use crate::tournament::output::{comparative_report, write_report, ResultGroup};
use crate::tournament::plugin::{PluginError, PluginLibrary};
use crate::tournament::pool;
use crate::tournament::registrar::{Registrar, RegistrarEntry};

/// Inputs for a comparative run.
#[derive(Debug, Clone)]
pub struct ComparativeConfig {
    /// The single map every game manager plays.
    pub map_path: PathBuf,
    /// Folder holding game-manager plugin files.
    pub gm_folder: PathBuf,
    /// First algorithm plugin file.
    pub algorithm1_path: PathBuf,
    /// Second algorithm plugin file.
    pub algorithm2_path: PathBuf,
    /// Worker threads for running games.
    pub num_threads: usize,
    /// Write per-match logs.
    pub verbose: bool,
    /// Show a progress bar over games.
    pub progress: bool,
}

/// Why a comparative run failed outright.
#[derive(Debug)]
pub enum ComparativeError {
    /// The map failed to load.
    Map(MapError),
    /// An algorithm plugin failed to load.
    Plugin(PluginError),
    /// The game-manager folder holds no plugin files.
    NoGameManagers(PathBuf),
    /// The game-manager folder could not be read.
    Io(io::Error),
}

impl fmt::Display for ComparativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparativeError::Map(e) => write!(f, "{e}"),
            ComparativeError::Plugin(e) => write!(f, "{e}"),
            ComparativeError::NoGameManagers(folder) => {
                write!(f, "no game-manager plugins found in {}", folder.display())
            }
            ComparativeError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ComparativeError {}

impl From<MapError> for ComparativeError {
    fn from(e: MapError) -> Self {
        ComparativeError::Map(e)
    }
}

impl From<PluginError> for ComparativeError {
    fn from(e: PluginError) -> Self {
        ComparativeError::Plugin(e)
    }
}

impl From<io::Error> for ComparativeError {
    fn from(e: io::Error) -> Self {
        ComparativeError::Io(e)
    }
}

/// Collect the plugin files in a folder, sorted for reproducible runs.
fn plugin_paths(folder: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(folder)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "so"))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Cluster results by outcome.
///
/// The returned groups are ordered most frequent first; equally sized
/// groups keep the reverse of their formation order, matching the
/// ascending-sort-then-drain emission.
fn group_results(results: Vec<(GameResult, String)>) -> Vec<ResultGroup> {
    let mut groups: Vec<ResultGroup> = Vec::new();
    for (result, gm_name) in results {
        if let Some(group) = groups
            .iter_mut()
            .find(|group| group.result.same_outcome(&result))
        {
            group.gm_names.push(gm_name);
        } else {
            groups.push(ResultGroup {
                result,
                gm_names: vec![gm_name],
            });
        }
    }
    groups.sort_by_key(|group| group.gm_names.len());
    groups.reverse();
    groups
}

/// Run comparative mode to completion and write the results file into the
/// game-manager folder.
///
/// # Errors
///
/// Fails on a bad map, unloadable algorithm plugins, or an unusable
/// game-manager folder. Individual game-manager failures are logged and
/// skipped instead.
pub fn run(config: &ComparativeConfig, library: &PluginLibrary) -> Result<(), ComparativeError> {
    info!("starting comparative run on {}", config.map_path.display());
    let map = load_map(&config.map_path)?;
    debug!(
        "map '{}' loaded: {}x{}, max_steps={}, num_shells={}",
        map.settings.map_name,
        map.board.width(),
        map.board.height(),
        map.settings.max_steps,
        map.settings.num_shells
    );

    let registrar = Registrar::new();
    let mut algo_handles = Vec::new();

    let handle1 = library.load_algorithm(&config.algorithm1_path, &registrar)?;
    let name1 = handle1.name().to_string();
    algo_handles.push(handle1);

    // The same file given twice shares a single registrar entry.
    let canon1 = fs::canonicalize(&config.algorithm1_path);
    let canon2 = fs::canonicalize(&config.algorithm2_path);
    let name2 = match (canon1, canon2) {
        (Ok(a), Ok(b)) if a == b => {
            info!("same algorithm file provided twice; sharing one entry");
            name1.clone()
        }
        _ => {
            let handle2 = library.load_algorithm(&config.algorithm2_path, &registrar)?;
            let name = handle2.name().to_string();
            algo_handles.push(handle2);
            name
        }
    };

    let algo1 = registrar
        .entry(&name1)
        .ok_or_else(|| ComparativeError::Plugin(PluginError::UnknownPlugin(name1.clone())))?;
    let algo2 = registrar
        .entry(&name2)
        .ok_or_else(|| ComparativeError::Plugin(PluginError::UnknownPlugin(name2.clone())))?;

    let gm_paths = plugin_paths(&config.gm_folder)?;
    if gm_paths.is_empty() {
        return Err(ComparativeError::NoGameManagers(config.gm_folder.clone()));
    }
    debug!("found {} game-manager plugins", gm_paths.len());

    let results: Mutex<Vec<(GameResult, String)>> = Mutex::new(Vec::new());
    // Serializes the create-entry/register/validate transaction: the
    // registrar's "last entry" is only meaningful for one loader at a time.
    let loader_lock: Mutex<()> = Mutex::new(());
    let bar = config.progress.then(|| {
        let bar = ProgressBar::new(gm_paths.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games")
                .expect("valid template")
                .progress_chars("=>-"),
        );
        bar
    });

    pool::run_tasks(&gm_paths, config.num_threads, |gm_path| {
        run_single_game(
            gm_path,
            library,
            &registrar,
            &loader_lock,
            &map,
            &algo1,
            &algo2,
            config.verbose,
            &results,
        );
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    });
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let mut results = results
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    // Completion order depends on thread scheduling; sort so grouping is a
    // pure function of the outcome set.
    results.sort_by(|a, b| a.1.cmp(&b.1));
    let groups = group_results(results);

    let report = comparative_report(
        &config.map_path,
        &config.algorithm1_path,
        &config.algorithm2_path,
        &groups,
    );
    write_report(&config.gm_folder, "comparative_results", &report);
    info!("comparative run finished: {} outcome group(s)", groups.len());
    Ok(())
}

/// Load one game manager, run the match, record the result, unload.
#[allow(clippy::too_many_arguments)]
fn run_single_game(
    gm_path: &Path,
    library: &PluginLibrary,
    registrar: &Registrar,
    loader_lock: &Mutex<()>,
    map: &MapData,
    algo1: &RegistrarEntry,
    algo2: &RegistrarEntry,
    verbose: bool,
    results: &Mutex<Vec<(GameResult, String)>>,
) {
    let (handle, game) = {
        let _guard = loader_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let handle = match library.load_game_manager(gm_path, registrar) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("skipping game manager {}: {e}", gm_path.display());
                return;
            }
        };
        let game = registrar
            .entry(handle.name())
            .and_then(|entry| entry.create_game_manager(verbose));
        (handle, game)
    };
    let gm_name = handle.name().to_string();

    let Some(mut game) = game else {
        warn!("failed to create game manager instance for {gm_name}");
        registrar.erase_by_name(&gm_name);
        return;
    };

    let cols = map.board.width();
    let rows = map.board.height();
    let players = (
        algo1.create_player(Owner::One, cols, rows, &map.settings),
        algo2.create_player(Owner::Two, cols, rows, &map.settings),
    );
    let factories = (algo1.tank_factory(), algo2.tank_factory());
    let ((Some(mut player1), Some(mut player2)), (Some(factory1), Some(factory2))) =
        (players, factories)
    else {
        warn!("missing factories while preparing game for {gm_name}");
        registrar.erase_by_name(&gm_name);
        return;
    };

    debug!("running {} vs {} under {gm_name}", algo1.name(), algo2.name());
    let result = game.run(
        &map.board,
        &map.settings,
        player1.as_mut(),
        algo1.name(),
        player2.as_mut(),
        algo2.name(),
        &factory1,
        &factory2,
    );
    info!(
        "game under {gm_name} finished: winner={}, rounds={}",
        result.winner, result.rounds
    );

    {
        let mut results = results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.push((result, gm_name.clone()));
    }

    registrar.erase_by_name(&gm_name);
    drop(handle);
}
