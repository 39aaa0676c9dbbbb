//! End-to-end engine scenarios: scripted tanks driven through the public
//! game-manager interface.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use salvo::game::{
    ActionRequest, BattleInfo, Board, Cell, Coord, Engine, GameManager, GameResult,
    GameResultReason, MatchSettings, Owner, Player, TankAlgorithm, TankAlgorithmFactory,
};

/// A tank that replays a fixed action script, then idles.
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

fn scripted_factory(scripts: Vec<Vec<ActionRequest>>) -> TankAlgorithmFactory {
    Arc::new(move |_owner, tank_index| {
        Box::new(Scripted {
            actions: scripts.get(tank_index).cloned().unwrap_or_default(),
            next: 0,
        }) as Box<dyn TankAlgorithm>
    })
}

fn parse_board(rows: &[&str]) -> Board {
    let mut board = Board::new(rows[0].len(), rows.len()).unwrap();
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            board.set(Coord::new(x, y), Cell::from_char(c).unwrap());
        }
    }
    board
}

fn run_scripted(
    rows: &[&str],
    max_steps: usize,
    num_shells: usize,
    script1: Vec<Vec<ActionRequest>>,
    script2: Vec<Vec<ActionRequest>>,
) -> GameResult {
    let board = parse_board(rows);
    let settings = MatchSettings {
        map_name: "scenario".to_string(),
        max_steps,
        num_shells,
    };
    let factory1 = scripted_factory(script1);
    let factory2 = scripted_factory(script2);
    Engine::new(false).run(
        &board,
        &settings,
        &mut NullPlayer,
        "left",
        &mut NullPlayer,
        "right",
        &factory1,
        &factory2,
    )
}

#[test]
fn headless_duel_ends_in_zero_shells_tie() {
    // Both tanks shoot their only shell on turn 0; the shells meet mid-board
    // and annihilate. Nobody can shoot again, so the zero-shells grace
    // elapses and the game ties with both tanks alive.
    let result = run_scripted(
        &["     ", "2   1", "     "],
        500,
        1,
        vec![vec![ActionRequest::Shoot]],
        vec![vec![ActionRequest::Shoot]],
    );
    assert_eq!(result.winner, 0);
    assert_eq!(result.reason, GameResultReason::ZeroShells);
    assert_eq!(result.remaining_tanks, [1, 1]);
    assert_eq!(result.final_board.object_at(4, 1), Cell::Tank(Owner::One));
    assert_eq!(result.final_board.object_at(0, 1), Cell::Tank(Owner::Two));
    // The collision cell holds nothing at the end.
    assert_eq!(result.final_board.object_at(2, 1), Cell::Empty);
}

#[test]
fn stepping_on_a_mine_kills_the_tank_and_clears_the_cell() {
    let result = run_scripted(
        &["@1 ", "   ", "  2"],
        10,
        0,
        vec![vec![ActionRequest::MoveForward]],
        vec![vec![]],
    );
    assert_eq!(result.winner, 2);
    assert_eq!(result.reason, GameResultReason::AllTanksDead);
    assert_eq!(result.remaining_tanks, [0, 1]);
    assert_eq!(result.final_board.object_at(0, 0), Cell::Empty);
    assert_eq!(result.final_board.object_at(1, 0), Cell::Empty);
}

#[test]
fn wall_staging_weaken_then_destroy() {
    // First shot turns the wall into a weakened wall; after the cooldown a
    // second shot removes it.
    let script = vec![vec![
        ActionRequest::Shoot,
        ActionRequest::DoNothing,
        ActionRequest::DoNothing,
        ActionRequest::DoNothing,
        ActionRequest::DoNothing,
        ActionRequest::Shoot,
    ]];
    let result = run_scripted(&["#1    2"], 8, 2, script, vec![vec![]]);
    assert_eq!(result.final_board.object_at(0, 0), Cell::Empty);
}

#[test]
fn wall_weakened_by_single_shot() {
    let script = vec![vec![ActionRequest::Shoot]];
    let result = run_scripted(&["#1    2"], 3, 2, script, vec![vec![]]);
    assert_eq!(result.final_board.object_at(0, 0), Cell::WeakWall);
}

#[test]
fn backward_request_waits_two_turns_then_chains() {
    // Three backward requests: the first waits two turns and executes on
    // the third; the fourth request executes immediately.
    let script = vec![vec![
        ActionRequest::MoveBackward,
        ActionRequest::MoveBackward,
        ActionRequest::MoveBackward,
        ActionRequest::MoveBackward,
    ]];
    let result = run_scripted(&["1    ", "    2"], 6, 0, script, vec![vec![]]);
    // Player 1 faces left, so each backward step moves right.
    assert_eq!(result.final_board.object_at(2, 0), Cell::Tank(Owner::One));
}

#[test]
fn forward_cancels_a_pending_backward_without_moving() {
    let script = vec![vec![
        ActionRequest::MoveBackward,
        ActionRequest::MoveForward,
        ActionRequest::DoNothing,
        ActionRequest::DoNothing,
    ]];
    let result = run_scripted(&["  1  ", "    2"], 5, 0, script, vec![vec![]]);
    assert_eq!(result.final_board.object_at(2, 0), Cell::Tank(Owner::One));
}

#[test]
fn movement_wraps_around_the_torus() {
    let result = run_scripted(
        &["1    ", "    2"],
        2,
        0,
        vec![vec![ActionRequest::MoveForward]],
        vec![vec![]],
    );
    assert_eq!(result.final_board.object_at(4, 0), Cell::Tank(Owner::One));
}

#[test]
fn game_never_outlives_max_steps_plus_grace() {
    let result = run_scripted(&["1 2"], 25, 0, vec![vec![]], vec![vec![]]);
    assert!(result.rounds <= 25 + 40);
}

#[test]
fn rotations_compose_to_identity() {
    // Rotate left then right, then drive forward: the tank ends where a
    // plain forward move would have taken it.
    let script = vec![vec![
        ActionRequest::RotateLeft45,
        ActionRequest::RotateRight45,
        ActionRequest::MoveForward,
    ]];
    let result = run_scripted(&["  1  ", "    2"], 4, 0, script, vec![vec![]]);
    assert_eq!(result.final_board.object_at(1, 0), Cell::Tank(Owner::One));
}

#[test]
fn multiple_tanks_per_side_get_distinct_scripts() {
    // Two player-1 tanks; only the second one (spawn order) moves.
    let script1 = vec![
        vec![ActionRequest::DoNothing],
        vec![ActionRequest::MoveForward],
    ];
    let result = run_scripted(
        &["1  1 ", "    2"],
        2,
        0,
        script1,
        vec![vec![]],
    );
    assert_eq!(result.final_board.object_at(0, 0), Cell::Tank(Owner::One));
    assert_eq!(result.final_board.object_at(2, 0), Cell::Tank(Owner::One));
    assert_eq!(result.remaining_tanks, [2, 1]);
}

#[test]
fn full_pursuit_match_terminates() {
    // The real algorithm against itself on a small arena: the match must
    // reach a terminal state within the step limit without panicking.
    use salvo::algorithm::{PursuitPlayer, PursuitTank};

    let rows = [
        "          ",
        "  1       ",
        "   #      ",
        "      @   ",
        "       2  ",
        "          ",
    ];
    let board = parse_board(&rows);
    let settings = MatchSettings {
        map_name: "arena".to_string(),
        max_steps: 200,
        num_shells: 8,
    };
    let factory: TankAlgorithmFactory =
        Arc::new(|owner, tank_index| Box::new(PursuitTank::new(owner, tank_index)));
    let mut player1 = PursuitPlayer::new(Owner::One, 10, 6, 200, 8);
    let mut player2 = PursuitPlayer::new(Owner::Two, 10, 6, 200, 8);

    let result = Engine::new(false).run(
        &board,
        &settings,
        &mut player1,
        "p1",
        &mut player2,
        "p2",
        &factory,
        &factory,
    );
    assert!(result.rounds <= 200 + 40);
    assert!(result.winner <= 2);
}
