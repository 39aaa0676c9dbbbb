//! Game core: board, entities, engine, and the engine/algorithm contract.

pub mod battle_info;
pub mod board;
pub mod direction;
pub mod engine;
pub mod result;
pub mod shell;
pub mod tank;

pub use battle_info::BattleInfo;
pub use board::{Board, Cell, Coord};
pub use direction::Direction;
pub use engine::Engine;
pub use result::{GameResult, GameResultReason};
pub use shell::Shell;
pub use tank::{BackwardState, Tank};

use std::sync::Arc;

/// Turns a tank must wait between shots.
pub const SHOOT_COOLDOWN_TURNS: u8 = 4;
/// Turns a tank waits before a requested backward move executes.
pub const BACKWARD_WAIT_TURNS: u8 = 2;
/// Grace turns after every alive tank runs out of ammo before the game ties.
pub const ZERO_SHELLS_GRACE_TURNS: usize = 40;
/// Shell advancement substeps per turn (shell velocity in cells per turn).
pub const SHELL_SUBSTEPS_PER_TURN: usize = 2;

/// A player side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Owner {
    /// Player 1.
    One = 1,
    /// Player 2.
    Two = 2,
}

impl Owner {
    /// Both sides in order.
    pub const BOTH: [Owner; 2] = [Owner::One, Owner::Two];

    /// The 1-based player number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// The 0-based side index, for per-side arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Owner::One => Owner::Two,
            Owner::Two => Owner::One,
        }
    }

    /// The board character of this side's tanks.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Owner::One => '1',
            Owner::Two => '2',
        }
    }

    /// The facing a tank of this side spawns with.
    #[must_use]
    pub const fn initial_facing(self) -> Direction {
        match self {
            Owner::One => Direction::Left,
            Owner::Two => Direction::Right,
        }
    }
}

/// An action a tank algorithm may request for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRequest {
    /// Step one cell in the facing direction.
    MoveForward,
    /// Request (or continue) a delayed step opposite the facing direction.
    MoveBackward,
    /// Rotate 45 degrees counter-clockwise.
    RotateLeft45,
    /// Rotate 45 degrees clockwise.
    RotateRight45,
    /// Rotate 90 degrees counter-clockwise.
    RotateLeft90,
    /// Rotate 90 degrees clockwise.
    RotateRight90,
    /// Fire a shell in the facing direction.
    Shoot,
    /// Ask the player for a fresh board snapshot.
    GetBattleInfo,
    /// Do nothing this turn.
    DoNothing,
}

impl std::fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActionRequest::MoveForward => "MoveForward",
            ActionRequest::MoveBackward => "MoveBackward",
            ActionRequest::RotateLeft45 => "RotateLeft45",
            ActionRequest::RotateRight45 => "RotateRight45",
            ActionRequest::RotateLeft90 => "RotateLeft90",
            ActionRequest::RotateRight90 => "RotateRight90",
            ActionRequest::Shoot => "Shoot",
            ActionRequest::GetBattleInfo => "GetBattleInfo",
            ActionRequest::DoNothing => "DoNothing",
        };
        write!(f, "{name}")
    }
}

/// Per-match parameters read from the map header.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Map display name.
    pub map_name: String,
    /// Maximum turns before the game ties.
    pub max_steps: usize,
    /// Initial ammo per tank.
    pub num_shells: usize,
}

/// The per-tank decision maker.
///
/// One instance exists per tank, created through a [`TankAlgorithmFactory`].
/// The exchange with the engine is single-threaded and synchronous: the
/// algorithm must not retain the snapshot beyond the
/// [`update_battle_info`](TankAlgorithm::update_battle_info) call.
pub trait TankAlgorithm: Send {
    /// Decide the next action for this tank.
    fn next_action(&mut self) -> ActionRequest;

    /// Receive a battle-info exchange and write the reply fields back
    /// into `info`.
    fn update_battle_info(&mut self, info: &mut BattleInfo);
}

/// The per-side collaborator that relays board snapshots to its tanks.
pub trait Player: Send {
    /// Build a [`BattleInfo`] from `view` (the observing tank's cell is
    /// marked with [`Cell::SelfMarker`]) and run the exchange with `tank`.
    fn update_tank_with_battle_info(&mut self, tank: &mut dyn TankAlgorithm, view: &Board);
}

/// A game manager: runs one match to termination.
pub trait GameManager: Send {
    /// Run a match on `board` and return the owned final result.
    #[allow(clippy::too_many_arguments)]
    fn run(
        &mut self,
        board: &Board,
        settings: &MatchSettings,
        player1: &mut dyn Player,
        name1: &str,
        player2: &mut dyn Player,
        name2: &str,
        tank_factory1: &TankAlgorithmFactory,
        tank_factory2: &TankAlgorithmFactory,
    ) -> GameResult;
}

/// Creates a tank algorithm for (owner, per-owner tank index).
pub type TankAlgorithmFactory = Arc<dyn Fn(Owner, usize) -> Box<dyn TankAlgorithm> + Send + Sync>;

/// Creates a player for (owner, cols, rows, max_steps, num_shells).
pub type PlayerFactory =
    Arc<dyn Fn(Owner, usize, usize, usize, usize) -> Box<dyn Player> + Send + Sync>;

/// Creates a game manager; the flag enables the per-match verbose log.
pub type GameManagerFactory = Arc<dyn Fn(bool) -> Box<dyn GameManager> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_basics() {
        assert_eq!(Owner::One.opponent(), Owner::Two);
        assert_eq!(Owner::Two.index(), 1);
        assert_eq!(Owner::One.as_char(), '1');
        assert_eq!(Owner::One.initial_facing(), Direction::Left);
        assert_eq!(Owner::Two.initial_facing(), Direction::Right);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(ActionRequest::RotateLeft90.to_string(), "RotateLeft90");
        assert_eq!(ActionRequest::GetBattleInfo.to_string(), "GetBattleInfo");
    }
}
