//! Competition mode: every algorithm in a folder round-robins across a
//! folder of maps under a single game manager, accumulating a score table.
//!
//! Algorithm plugins are loaded lazily on first use and unloaded once the
//! last game that references them finishes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::game::Owner;
use crate::tournament::maps::load_map;
use crate::tournament::output::{competition_report, write_report};
use crate::tournament::plugin::{PluginError, PluginHandle, PluginLibrary};
use crate::tournament::pool;
use crate::tournament::registrar::Registrar;

/// Points for winning one game.
const WIN_POINTS: u32 = 3;
/// Points each side gets for a tie.
const TIE_POINTS: u32 = 1;

/// Inputs for a competition run.
#[derive(Debug, Clone)]
pub struct CompetitionConfig {
    /// Folder holding map files.
    pub maps_folder: PathBuf,
    /// The single game-manager plugin file.
    pub game_manager_path: PathBuf,
    /// Folder holding algorithm plugin files (at least two).
    pub algorithms_folder: PathBuf,
    /// Worker threads for running games.
    pub num_threads: usize,
    /// Write per-match logs.
    pub verbose: bool,
    /// Show a progress bar over games.
    pub progress: bool,
}

/// Why a competition run failed outright.
#[derive(Debug)]
pub enum CompetitionError {
    /// The game-manager plugin failed to load.
    Plugin(PluginError),
    /// Fewer than two algorithm plugin files were found.
    NotEnoughAlgorithms(usize),
    /// The maps folder holds no files.
    NoMaps(PathBuf),
    /// A folder could not be read.
    Io(io::Error),
}

impl fmt::Display for CompetitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompetitionError::Plugin(e) => write!(f, "{e}"),
            CompetitionError::NotEnoughAlgorithms(n) => {
                write!(f, "competition needs at least two algorithms, found {n}")
            }
            CompetitionError::NoMaps(folder) => {
                write!(f, "no map files found in {}", folder.display())
            }
            CompetitionError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompetitionError {}

impl From<PluginError> for CompetitionError {
    fn from(e: PluginError) -> Self {
        CompetitionError::Plugin(e)
    }
}

impl From<io::Error> for CompetitionError {
    fn from(e: io::Error) -> Self {
        CompetitionError::Io(e)
    }
}

/// One scheduled game: a map and a directed algorithm pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledGame {
    /// The map file to play on.
    pub map_path: PathBuf,
    /// Algorithm taking the player-1 slot.
    pub algo1: String,
    /// Algorithm taking the player-2 slot.
    pub algo2: String,
}

/// Build the round-robin schedule.
///
/// Map `k` uses rotation `r = k mod (N-1)`: algorithm `i` is paired with
/// `(i + 1 + r) mod N`, deduplicating unordered pairs per map (with even
/// `N`, half the pairings of the middle rotation mirror the other half).
#[must_use]
pub fn schedule_games(algo_names: &[String], maps: &[PathBuf]) -> Vec<ScheduledGame> {
    let n = algo_names.len();
    if n < 2 {
        return Vec::new();
    }

    let mut games = Vec::new();
    for (k, map_path) in maps.iter().enumerate() {
        let rotation = k % (n - 1);
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for i in 0..n {
            let j = (i + 1 + rotation) % n;
            let key = (i.min(j), i.max(j));
            if seen.insert(key) {
                games.push(ScheduledGame {
                    map_path: map_path.clone(),
                    algo1: algo_names[i].clone(),
                    algo2: algo_names[j].clone(),
                });
            }
        }
    }
    games
}

/// Lazily loaded algorithm plugins with per-name usage counts.
struct AlgorithmPool<'a> {
    library: &'a PluginLibrary,
    registrar: &'a Registrar,
    paths: HashMap<String, PathBuf>,
    inner: Mutex<PoolInner>,
}

struct PoolInner {
    handles: HashMap<String, PluginHandle>,
    usage: HashMap<String, usize>,
}

impl<'a> AlgorithmPool<'a> {
    fn new(
        library: &'a PluginLibrary,
        registrar: &'a Registrar,
        paths: HashMap<String, PathBuf>,
        usage: HashMap<String, usize>,
    ) -> Self {
        Self {
            library,
            registrar,
            paths,
            inner: Mutex::new(PoolInner {
                handles: HashMap::new(),
                usage,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load the named plugin if it is not resident yet.
    fn ensure_loaded(&self, name: &str) -> Result<(), PluginError> {
        let mut inner = self.lock();
        if inner.handles.contains_key(name) {
            return Ok(());
        }
        let Some(path) = self.paths.get(name) else {
            return Err(PluginError::UnknownPlugin(name.to_string()));
        };
        let handle = self.library.load_algorithm(path, self.registrar)?;
        info!("loaded algorithm '{name}'");
        inner.handles.insert(name.to_string(), handle);
        Ok(())
    }

    /// Count one finished game; unload the plugin when no games remain.
    fn release(&self, name: &str) {
        let mut inner = self.lock();
        let Some(count) = inner.usage.get_mut(name) else {
            return;
        };
        *count -= 1;
        if *count > 0 {
            return;
        }
        inner.usage.remove(name);
        if inner.handles.remove(name).is_some() {
            self.registrar.erase_by_name(name);
            debug!("unloaded algorithm '{name}': no games left");
        }
    }
}

/// Run competition mode to completion and write the score table into the
/// algorithms folder.
///
/// # Errors
///
/// Fails on an unloadable game manager, too few algorithms, or an empty
/// maps folder. Per-game failures (bad map, bad algorithm plugin) are
/// logged and the game skipped.
pub fn run(config: &CompetitionConfig, library: &PluginLibrary) -> Result<(), CompetitionError> {
    info!(
        "starting competition: maps from {}, algorithms from {}",
        config.maps_folder.display(),
        config.algorithms_folder.display()
    );

    let registrar = Registrar::new();
    let gm_handle = library.load_game_manager(&config.game_manager_path, &registrar)?;
    let gm_entry = registrar
        .entry(gm_handle.name())
        .ok_or_else(|| PluginError::UnknownPlugin(gm_handle.name().to_string()))?;

    // Algorithm names come from the plugin file stems, sorted so scheduling
    // is reproducible.
    let mut algo_paths: Vec<PathBuf> = fs::read_dir(&config.algorithms_folder)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "so"))
        .collect();
    algo_paths.sort();
    let paths_by_name: HashMap<String, PathBuf> = algo_paths
        .iter()
        .filter_map(|path| {
            path.file_stem()
                .map(|stem| (stem.to_string_lossy().to_string(), path.clone()))
        })
        .collect();
    let mut algo_names: Vec<String> = paths_by_name.keys().cloned().collect();
    algo_names.sort();
    if algo_names.len() < 2 {
        return Err(CompetitionError::NotEnoughAlgorithms(algo_names.len()));
    }

    let mut maps: Vec<PathBuf> = fs::read_dir(&config.maps_folder)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    maps.sort();
    if maps.is_empty() {
        return Err(CompetitionError::NoMaps(config.maps_folder.clone()));
    }

    let games = schedule_games(&algo_names, &maps);
    info!(
        "scheduled {} game(s) across {} map(s) and {} algorithm(s)",
        games.len(),
        maps.len(),
        algo_names.len()
    );

    let mut usage: HashMap<String, usize> = HashMap::new();
    for game in &games {
        *usage.entry(game.algo1.clone()).or_insert(0) += 1;
        *usage.entry(game.algo2.clone()).or_insert(0) += 1;
    }
    let algo_pool = AlgorithmPool::new(library, &registrar, paths_by_name, usage);

    let scores: Mutex<HashMap<String, u32>> =
        Mutex::new(algo_names.iter().map(|n| (n.clone(), 0)).collect());

    let bar = config.progress.then(|| {
        let bar = ProgressBar::new(games.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games")
                .expect("valid template")
                .progress_chars("=>-"),
        );
        bar
    });

    pool::run_tasks(&games, config.num_threads, |game| {
        run_single_game(game, &registrar, &gm_entry, &algo_pool, config.verbose, &scores);
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    });
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let scores = scores
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut sorted: Vec<(String, u32)> = scores.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    let report = competition_report(&config.maps_folder, &config.game_manager_path, &sorted);
    write_report(&config.algorithms_folder, "competition", &report);
    info!("competition finished");
    Ok(())
}

fn run_single_game(
    game: &ScheduledGame,
    registrar: &Registrar,
    gm_entry: &crate::tournament::registrar::RegistrarEntry,
    algo_pool: &AlgorithmPool<'_>,
    verbose: bool,
    scores: &Mutex<HashMap<String, u32>>,
) {
    let map = match load_map(&game.map_path) {
        Ok(map) => map,
        Err(e) => {
            warn!(
                "failed to load map {}: {e} - skipping game",
                game.map_path.display()
            );
            return;
        }
    };

    if let Err(e) = algo_pool
        .ensure_loaded(&game.algo1)
        .and_then(|()| algo_pool.ensure_loaded(&game.algo2))
    {
        warn!(
            "failed to load algorithm(s) for game on {}: {e} - skipping game",
            game.map_path.display()
        );
        return;
    }

    let entries = (registrar.entry(&game.algo1), registrar.entry(&game.algo2));
    let (Some(algo1), Some(algo2)) = entries else {
        warn!("missing registrar entries for {} / {}", game.algo1, game.algo2);
        return;
    };

    let cols = map.board.width();
    let rows = map.board.height();
    let pieces = (
        algo1.create_player(Owner::One, cols, rows, &map.settings),
        algo2.create_player(Owner::Two, cols, rows, &map.settings),
        algo1.tank_factory(),
        algo2.tank_factory(),
        gm_entry.create_game_manager(verbose),
    );
    let (Some(mut player1), Some(mut player2), Some(factory1), Some(factory2), Some(mut gm)) =
        pieces
    else {
        warn!(
            "missing factories for game {} vs {} on {}",
            game.algo1,
            game.algo2,
            game.map_path.display()
        );
        return;
    };

    debug!(
        "running {} vs {} on {}",
        game.algo1,
        game.algo2,
        game.map_path.display()
    );
    let result = gm.run(
        &map.board,
        &map.settings,
        player1.as_mut(),
        &game.algo1,
        player2.as_mut(),
        &game.algo2,
        &factory1,
        &factory2,
    );

    {
        let mut scores = scores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match result.winner {
            0 => {
                *scores.entry(game.algo1.clone()).or_insert(0) += TIE_POINTS;
                *scores.entry(game.algo2.clone()).or_insert(0) += TIE_POINTS;
            }
            1 => *scores.entry(game.algo1.clone()).or_insert(0) += WIN_POINTS,
            _ => *scores.entry(game.algo2.clone()).or_insert(0) += WIN_POINTS,
        }
    }
    info!(
        "game finished on {}: {} vs {} -> {}",
        game.map_path.display(),
        game.algo1,
        game.algo2,
        if result.winner == 0 {
            "tie".to_string()
        } else {
            format!("player {} wins", result.winner)
        }
    );

    algo_pool.release(&game.algo1);
    algo_pool.release(&game.algo2);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("algo{i}")).collect()
    }

    fn maps(m: usize) -> Vec<PathBuf> {
        (0..m).map(|i| PathBuf::from(format!("map{i}.txt"))).collect()
    }

    #[test]
    fn test_schedule_four_algos_three_maps() {
        // Rotations 0, 1, 2: the middle rotation pairs everyone with the
        // algorithm two ahead, which mirrors itself and dedups to 2 games.
        let games = schedule_games(&names(4), &maps(3));
        assert_eq!(games.len(), 10);

        let per_map = |k: usize| {
            games
                .iter()
                .filter(|g| g.map_path == PathBuf::from(format!("map{k}.txt")))
                .count()
        };
        assert_eq!(per_map(0), 4);
        assert_eq!(per_map(1), 2);
        assert_eq!(per_map(2), 4);

        // Every algorithm plays 5 games.
        for name in names(4) {
            let count = games
                .iter()
                .filter(|g| g.algo1 == name || g.algo2 == name)
                .count();
            assert_eq!(count, 5, "{name} plays a wrong number of games");
        }
    }

    #[test]
    fn test_schedule_pairs_are_distinct_per_map() {
        let games = schedule_games(&names(5), &maps(4));
        for k in 0..4 {
            let mut seen = HashSet::new();
            for game in games
                .iter()
                .filter(|g| g.map_path == PathBuf::from(format!("map{k}.txt")))
            {
                let key = if game.algo1 < game.algo2 {
                    (game.algo1.clone(), game.algo2.clone())
                } else {
                    (game.algo2.clone(), game.algo1.clone())
                };
                assert!(seen.insert(key), "duplicate unordered pair on map {k}");
            }
        }
    }

    #[test]
    fn test_schedule_covers_all_pairs_with_enough_maps() {
        // With M >= N-1 every unordered pair appears at least once.
        let n = 5;
        let games = schedule_games(&names(n), &maps(n - 1));
        let mut pairs = HashSet::new();
        for game in &games {
            let key = if game.algo1 < game.algo2 {
                (game.algo1.clone(), game.algo2.clone())
            } else {
                (game.algo2.clone(), game.algo1.clone())
            };
            pairs.insert(key);
        }
        assert_eq!(pairs.len(), n * (n - 1) / 2);
    }

    #[test]
    fn test_schedule_too_few_algorithms() {
        assert!(schedule_games(&names(1), &maps(3)).is_empty());
    }

    #[test]
    fn test_schedule_no_self_pairing() {
        for n in 2..=6 {
            for m in 1..=5 {
                for game in schedule_games(&names(n), &maps(m)) {
                    assert_ne!(game.algo1, game.algo2);
                }
            }
        }
    }
}
