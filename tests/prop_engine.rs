//! Property-based tests for the game engine.
//!
//! Run with: cargo test --release prop_engine

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use proptest::prelude::*;

use salvo::game::{
    ActionRequest, BattleInfo, Board, Cell, Coord, Direction, Engine, GameManager, GameResult,
    MatchSettings, Owner, Player, TankAlgorithm, TankAlgorithmFactory,
};

struct Scripted {
    actions: Vec<ActionRequest>,
    next: usize,
}

impl TankAlgorithm for Scripted {
    fn next_action(&mut self) -> ActionRequest {
        let action = self
            .actions
            .get(self.next)
            .copied()
            .unwrap_or(ActionRequest::DoNothing);
        self.next += 1;
        action
    }

    fn update_battle_info(&mut self, _info: &mut BattleInfo) {}
}

struct NullPlayer;

impl Player for NullPlayer {
    fn update_tank_with_battle_info(&mut self, _tank: &mut dyn TankAlgorithm, _view: &Board) {}
}

fn action_strategy() -> impl Strategy<Value = ActionRequest> {
    prop_oneof![
        Just(ActionRequest::MoveForward),
        Just(ActionRequest::MoveBackward),
        Just(ActionRequest::RotateLeft45),
        Just(ActionRequest::RotateRight45),
        Just(ActionRequest::RotateLeft90),
        Just(ActionRequest::RotateRight90),
        Just(ActionRequest::Shoot),
        Just(ActionRequest::DoNothing),
    ]
}

/// A small board with one tank per side at random distinct cells, plus a
/// few random walls and mines away from the tanks.
fn board_strategy() -> impl Strategy<Value = Board> {
    (
        3usize..8,
        3usize..8,
        proptest::collection::vec(0usize..64, 0..8),
        0usize..64,
        0usize..64,
    )
        .prop_filter_map("tank cells must differ", |(w, h, obstacles, t1, t2)| {
            let p1 = Coord::new(t1 % w, (t1 / w) % h);
            let p2 = Coord::new(t2 % w, (t2 / w) % h);
            if p1 == p2 {
                return None;
            }
            let mut board = Board::new(w, h)?;
            for (i, cell) in obstacles.iter().enumerate() {
                let coord = Coord::new(cell % w, (cell / w) % h);
                if coord != p1 && coord != p2 {
                    board.set(
                        coord,
                        if i % 2 == 0 { Cell::Wall } else { Cell::Mine },
                    );
                }
            }
            board.set(p1, Cell::Tank(Owner::One));
            board.set(p2, Cell::Tank(Owner::Two));
            Some(board)
        })
}

fn run_scripted(board: &Board, script1: Vec<ActionRequest>, script2: Vec<ActionRequest>) -> GameResult {
    let settings = MatchSettings {
        map_name: "prop".to_string(),
        max_steps: 30,
        num_shells: 3,
    };
    let make = |script: Vec<ActionRequest>| -> TankAlgorithmFactory {
        Arc::new(move |_owner, _tank_index| {
            Box::new(Scripted {
                actions: script.clone(),
                next: 0,
            }) as Box<dyn TankAlgorithm>
        })
    };
    let factory1 = make(script1);
    let factory2 = make(script2);
    Engine::new(false).run(
        board,
        &settings,
        &mut NullPlayer,
        "p1",
        &mut NullPlayer,
        "p2",
        &factory1,
        &factory2,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Any scripted game terminates within max_steps plus the zero-shells
    /// grace, never panics, and never reports more tanks than it started
    /// with.
    #[test]
    fn prop_game_terminates_and_counts_are_bounded(
        board in board_strategy(),
        script1 in proptest::collection::vec(action_strategy(), 0..40),
        script2 in proptest::collection::vec(action_strategy(), 0..40),
    ) {
        let result = run_scripted(&board, script1, script2);
        prop_assert!(result.rounds <= 30 + 40);
        prop_assert!(result.winner <= 2);
        prop_assert!(result.remaining_tanks[0] <= 1);
        prop_assert!(result.remaining_tanks[1] <= 1);
    }

    /// The final board never leaks transient markers: every cell is part
    /// of the persistent alphabet.
    #[test]
    fn prop_final_board_has_no_transient_markers(
        board in board_strategy(),
        script1 in proptest::collection::vec(action_strategy(), 0..40),
        script2 in proptest::collection::vec(action_strategy(), 0..40),
    ) {
        let result = run_scripted(&board, script1, script2);
        for (coord, cell) in result.final_board.iter() {
            prop_assert!(
                !matches!(cell, Cell::SelfMarker | Cell::OutOfBounds),
                "transient marker {cell:?} left at {coord:?}"
            );
        }
    }

    /// Opposite rotations cancel for every facing.
    #[test]
    fn prop_rotation_round_trip(steps in -16i32..16) {
        for dir in Direction::ALL {
            prop_assert_eq!(dir.rotated(steps).rotated(-steps), dir);
        }
    }

    /// Torus stepping is inverted by the opposite direction.
    #[test]
    fn prop_step_round_trip(w in 1usize..12, h in 1usize..12, x in 0usize..12, y in 0usize..12) {
        let board = Board::new(w, h).unwrap();
        let start = Coord::new(x % w, y % h);
        for dir in Direction::ALL {
            let there = board.step(start, dir);
            prop_assert_eq!(board.step(there, dir.opposite()), start);
        }
    }
}
