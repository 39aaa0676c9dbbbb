//! The structured message exchanged between a player and a tank algorithm.

use crate::game::{Board, Coord};

/// One battle-info exchange.
///
/// The player fills in the board snapshot (with the observing tank's cell
/// marked), the shell positions, and the spawn-time values; the algorithm
/// reads them and writes its reply fields back. The snapshot must not be
/// retained past the exchange.
#[derive(Debug, Clone)]
pub struct BattleInfo {
    /// Board snapshot with the observing tank marked as
    /// [`Cell::SelfMarker`](crate::game::Cell::SelfMarker).
    pub board: Board,
    /// Positions of every shell currently in flight.
    pub shell_positions: Vec<Coord>,
    /// Initial ammo per tank; meaningful on the first exchange only.
    pub initial_ammo: usize,
    /// The observing tank's cell; meaningful on the first exchange only.
    pub initial_position: Coord,
    /// Reply: the tank's remaining ammo as tracked by the algorithm.
    pub current_ammo: usize,
    /// Reply: the tank's self-declared per-owner index.
    pub tank_index: usize,
}

impl BattleInfo {
    /// Create an exchange message with empty reply fields.
    #[must_use]
    pub fn new(
        board: Board,
        shell_positions: Vec<Coord>,
        initial_ammo: usize,
        initial_position: Coord,
    ) -> Self {
        Self {
            board,
            shell_positions,
            initial_ammo,
            initial_position,
            current_ammo: 0,
            tank_index: 0,
        }
    }
}
