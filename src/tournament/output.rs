//! Result-file writers for both tournament modes.

use std::fs;
use std::path::{Path, PathBuf};

use time::{format_description, OffsetDateTime};
use tracing::{info, warn};

use crate::game::GameResult;

/// A cluster of game managers whose matches produced the same outcome.
#[derive(Debug, Clone)]
pub struct ResultGroup {
    /// The shared outcome.
    pub result: GameResult,
    /// Names of the game managers in the cluster.
    pub gm_names: Vec<String>,
}

/// Current local time as a `YYYYMMDD_HHMMSS` file-name stamp.
#[must_use]
pub fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_description::parse("[year][month][day]_[hour][minute][second]")
        .ok()
        .and_then(|format| now.format(&format).ok())
        .unwrap_or_else(|| "00000000_000000".to_string())
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Render the comparative results text.
///
/// Groups are emitted in the order given (most frequent first); each group
/// lists its game managers, the shared result line, the round count, and
/// the final board.
#[must_use]
pub fn comparative_report(
    map_path: &Path,
    algorithm1_path: &Path,
    algorithm2_path: &Path,
    groups: &[ResultGroup],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("game_map={}\n", base_name(map_path)));
    out.push_str(&format!("algorithm1={}\n", base_name(algorithm1_path)));
    out.push_str(&format!("algorithm2={}\n", base_name(algorithm2_path)));
    out.push('\n');

    for (i, group) in groups.iter().enumerate() {
        out.push_str(&group.gm_names.join(", "));
        out.push('\n');
        out.push_str(&group.result.describe());
        out.push('\n');
        out.push_str(&group.result.rounds.to_string());
        out.push('\n');
        for row in group.result.final_board.render_rows() {
            out.push_str(&row);
            out.push('\n');
        }
        if i + 1 < groups.len() {
            out.push('\n');
        }
    }

    out
}

/// Render the competition score table text.
///
/// `scores` must already be sorted descending.
#[must_use]
pub fn competition_report(
    maps_folder: &Path,
    game_manager_path: &Path,
    scores: &[(String, u32)],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("game_maps_folder={}\n", maps_folder.display()));
    out.push_str(&format!("game_manager={}\n", base_name(game_manager_path)));
    out.push('\n');
    for (name, score) in scores {
        out.push_str(&format!("{name} {score}\n"));
    }
    out
}

/// Write a report into `out_folder` under a timestamped name.
///
/// When the file cannot be created the report goes to stdout instead, so
/// the run's outcome is never lost.
pub fn write_report(out_folder: &Path, file_stem: &str, report: &str) -> Option<PathBuf> {
    let path = out_folder.join(format!("{file_stem}_{}.txt", timestamp()));
    match fs::write(&path, report) {
        Ok(()) => {
            info!("results written to {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!(
                "failed to open output file in {}: {e}; printing results to stdout",
                out_folder.display()
            );
            println!("{report}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Board, GameResultReason};

    fn group(names: &[&str], winner: u8, rounds: usize) -> ResultGroup {
        ResultGroup {
            result: GameResult {
                winner,
                reason: GameResultReason::AllTanksDead,
                remaining_tanks: [1, 0],
                final_board: Board::new(2, 1).unwrap(),
                rounds,
            },
            gm_names: names.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn test_timestamp_shape() {
        let stamp = timestamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
    }

    #[test]
    fn test_comparative_report_format() {
        let groups = vec![group(&["gm_a", "gm_b"], 1, 12), group(&["gm_c"], 2, 3)];
        let report = comparative_report(
            Path::new("/maps/arena.txt"),
            Path::new("/algos/pursuit.so"),
            Path::new("/algos/pursuit_b.so"),
            &groups,
        );
        let expected = "game_map=arena.txt\n\
                        algorithm1=pursuit.so\n\
                        algorithm2=pursuit_b.so\n\
                        \n\
                        gm_a, gm_b\n\
                        Player 1 won with 1 tanks still alive\n\
                        12\n\
                        \x20\x20\n\
                        \n\
                        gm_c\n\
                        Player 2 won with 0 tanks still alive\n\
                        3\n\
                        \x20\x20\n";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_competition_report_format() {
        let scores = vec![("alpha".to_string(), 9), ("beta".to_string(), 4)];
        let report = competition_report(
            Path::new("/maps"),
            Path::new("/gms/standard.so"),
            &scores,
        );
        assert_eq!(
            report,
            "game_maps_folder=/maps\ngame_manager=standard.so\n\nalpha 9\nbeta 4\n"
        );
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), "competition", "hello\n").unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("competition_"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\n");
    }
}
