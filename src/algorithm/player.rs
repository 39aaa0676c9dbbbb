//! The per-side player collaborator.

use std::collections::HashMap;

use crate::game::{BattleInfo, Board, Cell, Coord, Owner, Player, TankAlgorithm};

/// Relays board snapshots from the engine to this side's tanks.
///
/// The player scans the snapshot once, collects shell positions, locates the
/// observing tank's marker cell, and runs the exchange. The replies let it
/// keep a per-tank ammo ledger.
pub struct PursuitPlayer {
    #[allow(dead_code)]
    owner: Owner,
    num_shells: usize,
    tank_ammo: HashMap<usize, usize>,
}

impl PursuitPlayer {
    /// Create a player for one side.
    #[must_use]
    pub fn new(
        owner: Owner,
        _cols: usize,
        _rows: usize,
        _max_steps: usize,
        num_shells: usize,
    ) -> Self {
        Self {
            owner,
            num_shells,
            tank_ammo: HashMap::new(),
        }
    }

    /// Last ammo count a tank reported, if it ever exchanged info.
    #[must_use]
    pub fn reported_ammo(&self, tank_index: usize) -> Option<usize> {
        self.tank_ammo.get(&tank_index).copied()
    }
}

impl Player for PursuitPlayer {
    fn update_tank_with_battle_info(&mut self, tank: &mut dyn TankAlgorithm, view: &Board) {
        let mut shell_positions = Vec::new();
        let mut self_position = Coord::new(0, 0);

        for (coord, cell) in view.iter() {
            match cell {
                Cell::Shell => shell_positions.push(coord),
                Cell::SelfMarker => self_position = coord,
                _ => {}
            }
        }

        let mut info = BattleInfo::new(
            view.clone(),
            shell_positions,
            self.num_shells,
            self_position,
        );
        tank.update_battle_info(&mut info);

        self.tank_ammo.insert(info.tank_index, info.current_ammo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ActionRequest;

    struct Probe {
        seen_shells: Vec<Coord>,
        seen_self: Coord,
    }

    impl TankAlgorithm for Probe {
        fn next_action(&mut self) -> ActionRequest {
            ActionRequest::DoNothing
        }

        fn update_battle_info(&mut self, info: &mut BattleInfo) {
            self.seen_shells = info.shell_positions.clone();
            self.seen_self = info.initial_position;
            info.tank_index = 3;
            info.current_ammo = 7;
        }
    }

    #[test]
    fn test_exchange_collects_shells_and_marker() {
        let mut board = Board::new(4, 2).unwrap();
        board.set(Coord::new(1, 0), Cell::Shell);
        board.set(Coord::new(3, 1), Cell::Shell);
        board.set(Coord::new(2, 1), Cell::SelfMarker);

        let mut player = PursuitPlayer::new(Owner::One, 4, 2, 100, 12);
        let mut probe = Probe {
            seen_shells: Vec::new(),
            seen_self: Coord::new(9, 9),
        };
        player.update_tank_with_battle_info(&mut probe, &board);

        assert_eq!(probe.seen_shells, vec![Coord::new(1, 0), Coord::new(3, 1)]);
        assert_eq!(probe.seen_self, Coord::new(2, 1));
        assert_eq!(player.reported_ammo(3), Some(7));
    }
}
