//! Map-file loading.
//!
//! The format is a one-line name, four `key = value` header lines
//! (`MaxSteps`, `NumShells`, `Rows`, `Cols`), then the grid rows. The
//! loader is forgiving about grid mistakes: short rows are padded, long
//! rows truncated, extra rows dropped, and unknown characters mapped to
//! empty cells, each with a recovered-error note.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;

use crate::game::{Board, Cell, Coord, MatchSettings};

/// Characters accepted in a map grid.
const INPUT_ALPHABET: [char; 5] = [' ', '#', '@', '1', '2'];

/// A parsed map file.
#[derive(Debug, Clone)]
pub struct MapData {
    /// Name and limits from the header.
    pub settings: MatchSettings,
    /// The initial board.
    pub board: Board,
    /// Notes about grid mistakes the loader recovered from.
    pub recovered_errors: Vec<String>,
}

/// Why a map file failed to load.
#[derive(Debug)]
pub enum MapError {
    /// The file could not be read.
    Io {
        /// Offending path.
        path: String,
        /// Underlying error.
        error: io::Error,
    },
    /// A required header line is missing.
    MissingLine {
        /// Which header line.
        key: &'static str,
    },
    /// A header line does not parse as `key = <number>`.
    InvalidValue {
        /// Which header key.
        key: &'static str,
        /// The raw line.
        line: String,
    },
    /// Rows or Cols is zero.
    EmptyBoard,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io { path, error } => write!(f, "failed to read map {path}: {error}"),
            MapError::MissingLine { key } => write!(f, "missing {key} line"),
            MapError::InvalidValue { key, line } => {
                write!(f, "invalid {key} line: '{line}'")
            }
            MapError::EmptyBoard => write!(f, "map dimensions must be non-zero"),
        }
    }
}

impl std::error::Error for MapError {}

fn header_value(
    lines: &mut std::str::Lines<'_>,
    key: &'static str,
) -> Result<usize, MapError> {
    let line = lines.next().ok_or(MapError::MissingLine { key })?;
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('='))
        .and_then(|value| value.parse::<usize>().ok())
        .ok_or_else(|| MapError::InvalidValue {
            key,
            line: line.to_string(),
        })
}

/// Load and validate a map file.
///
/// # Errors
///
/// Fails on unreadable files, malformed headers, and zero dimensions.
/// Grid-level mistakes are recovered (and noted), never fatal.
pub fn load_map(path: &Path) -> Result<MapData, MapError> {
    let text = fs::read_to_string(path).map_err(|error| MapError::Io {
        path: path.display().to_string(),
        error,
    })?;
    let mut lines = text.lines();

    let name = lines
        .next()
        .ok_or(MapError::MissingLine { key: "map name" })?
        .trim_end_matches('\r')
        .to_string();
    let max_steps = header_value(&mut lines, "MaxSteps")?;
    let num_shells = header_value(&mut lines, "NumShells")?;
    let rows = header_value(&mut lines, "Rows")?;
    let cols = header_value(&mut lines, "Cols")?;

    let Some(mut board) = Board::new(cols, rows) else {
        return Err(MapError::EmptyBoard);
    };
    let mut recovered = Vec::new();

    let mut row = 0usize;
    for line in lines {
        let line = line.trim_end_matches('\r');
        if row >= rows {
            recovered.push(format!(
                "extra row beyond declared height dropped: '{line}'"
            ));
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        if chars.len() > cols {
            recovered.push(format!(
                "row {row}: {} extra columns beyond declared width ignored",
                chars.len() - cols
            ));
        }

        for col in 0..cols {
            // Short rows are right-padded with spaces.
            let mut c = chars.get(col).copied().unwrap_or(' ');
            if !INPUT_ALPHABET.contains(&c) {
                recovered.push(format!(
                    "row {row}, column {col}: unknown character '{c}' treated as space"
                ));
                c = ' ';
            }
            if let Some(cell) = Cell::from_char(c) {
                board.set(Coord::new(col, row), cell);
            }
        }
        row += 1;
    }

    for note in &recovered {
        warn!("map {}: recovered from input error: {note}", path.display());
    }

    Ok(MapData {
        settings: MatchSettings {
            map_name: name,
            max_steps,
            num_shells,
        },
        board,
        recovered_errors: recovered,
    })
}
