//! Final match outcomes.

use crate::game::{Board, ZERO_SHELLS_GRACE_TURNS};

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResultReason {
    /// At least one side lost all of its tanks.
    AllTanksDead,
    /// The turn limit was reached.
    MaxSteps,
    /// Every alive tank was out of ammo for the full grace period.
    ZeroShells,
}

/// The outcome of one match.
///
/// The result owns a deep copy of the final board so it never references
/// engine or plugin state.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Winning player number, or 0 for a tie.
    pub winner: u8,
    /// Why the match ended.
    pub reason: GameResultReason,
    /// Remaining tanks per side; index 0 is player 1.
    pub remaining_tanks: [usize; 2],
    /// The board at the end of the match.
    pub final_board: Board,
    /// Total turns played.
    pub rounds: usize,
}

impl GameResult {
    /// The user-facing one-line description of this outcome.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.winner == 0 {
            match self.reason {
                GameResultReason::AllTanksDead => "Tie, both players have zero tanks".to_string(),
                GameResultReason::MaxSteps => format!(
                    "Tie, reached max steps = {}, player 1 has {} tanks, player 2 has {} tanks",
                    self.rounds, self.remaining_tanks[0], self.remaining_tanks[1]
                ),
                GameResultReason::ZeroShells => format!(
                    "Tie, both players have zero shells for {ZERO_SHELLS_GRACE_TURNS} steps"
                ),
            }
        } else {
            let remaining = self
                .remaining_tanks
                .get(usize::from(self.winner) - 1)
                .copied()
                .unwrap_or(0);
            format!(
                "Player {} won with {} tanks still alive",
                self.winner, remaining
            )
        }
    }

    /// Whether two results describe the same outcome.
    ///
    /// Winner, reason, and rounds must match exactly; the boards are
    /// compared up to the weakened-wall distinction.
    #[must_use]
    pub fn same_outcome(&self, other: &GameResult) -> bool {
        self.winner == other.winner
            && self.reason == other.reason
            && self.rounds == other.rounds
            && self.final_board.equivalent_to(&other.final_board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Cell, Coord};

    fn result(winner: u8, reason: GameResultReason, rounds: usize) -> GameResult {
        GameResult {
            winner,
            reason,
            remaining_tanks: [1, 2],
            final_board: Board::new(3, 3).unwrap(),
            rounds,
        }
    }

    #[test]
    fn test_describe_win() {
        let r = result(2, GameResultReason::AllTanksDead, 17);
        assert_eq!(r.describe(), "Player 2 won with 2 tanks still alive");
    }

    #[test]
    fn test_describe_ties() {
        assert_eq!(
            result(0, GameResultReason::AllTanksDead, 5).describe(),
            "Tie, both players have zero tanks"
        );
        assert_eq!(
            result(0, GameResultReason::MaxSteps, 100).describe(),
            "Tie, reached max steps = 100, player 1 has 1 tanks, player 2 has 2 tanks"
        );
        assert_eq!(
            result(0, GameResultReason::ZeroShells, 60).describe(),
            "Tie, both players have zero shells for 40 steps"
        );
    }

    #[test]
    fn test_same_outcome_weak_wall_equivalence() {
        let mut a = result(1, GameResultReason::AllTanksDead, 10);
        let mut b = result(1, GameResultReason::AllTanksDead, 10);
        a.final_board.set(Coord::new(0, 0), Cell::Wall);
        b.final_board.set(Coord::new(0, 0), Cell::WeakWall);
        assert!(a.same_outcome(&b));

        b.rounds = 11;
        assert!(!a.same_outcome(&b));
    }
}
