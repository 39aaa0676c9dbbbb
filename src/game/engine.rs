//! The standard game manager: a deterministic per-turn simulator.
//!
//! Each turn runs in a strict order: snapshot the board, gather one action
//! per alive tank, apply the actions sequentially in stable tank order,
//! advance every shell twice (shell velocity is two cells per turn),
//! collapse co-located shells, then update the termination flags.

use std::io::Write;

use tracing::{debug, warn};

use crate::game::{
    ActionRequest, BackwardState, Board, Cell, Coord, GameManager, GameResult, GameResultReason,
    MatchSettings, Owner, Player, Shell, Tank, TankAlgorithm, TankAlgorithmFactory,
    BACKWARD_WAIT_TURNS, SHELL_SUBSTEPS_PER_TURN, ZERO_SHELLS_GRACE_TURNS,
};

/// The engine's plugin name, used in the per-match log file name.
pub const ENGINE_NAME: &str = "standard";

/// The standard game manager.
pub struct Engine {
    verbose: bool,
}

impl Engine {
    /// Create an engine; `verbose` enables the per-match log file.
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl GameManager for Engine {
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
    ) -> GameResult {
        let mut state = MatchState::new(board, settings, tank_factory1, tank_factory2);
        let result = state.run(player1, player2);

        if self.verbose {
            state.log.push(result.describe());
            let file_name = format!(
                "output_{}_{}_{}_{}",
                settings.map_name, ENGINE_NAME, name1, name2
            );
            if let Err(e) = std::fs::File::create(&file_name)
                .and_then(|mut f| writeln!(f, "{}", state.log.join("\n")))
            {
                warn!("failed to write match log {file_name}: {e}");
            }
        }

        result
    }
}

/// A tank record paired with its decision maker.
struct TankUnit {
    record: Tank,
    algorithm: Box<dyn TankAlgorithm>,
}

/// All mutable state of one running match.
struct MatchState {
    board: Board,
    last_round_board: Board,
    tanks: Vec<TankUnit>,
    shells: Vec<Shell>,
    // One (action, accepted) pair per tank, rebuilt each turn.
    actions: Vec<(ActionRequest, bool)>,
    turn: usize,
    max_steps: usize,
    // Set once when every alive tank is out of ammo, then counts down.
    zero_ammo_grace: Option<usize>,
    log: Vec<String>,
}

impl MatchState {
    fn new(
        board: &Board,
        settings: &MatchSettings,
        tank_factory1: &TankAlgorithmFactory,
        tank_factory2: &TankAlgorithmFactory,
    ) -> Self {
        let mut tanks = Vec::new();
        let mut counts = [0usize; 2];

        // Tanks spawn from their board cells in row-major order, each with a
        // per-owner index.
        for (coord, cell) in board.iter() {
            if let Cell::Tank(owner) = cell {
                let id = counts[owner.index()];
                counts[owner.index()] += 1;
                let factory = match owner {
                    Owner::One => tank_factory1,
                    Owner::Two => tank_factory2,
                };
                tanks.push(TankUnit {
                    record: Tank::new(id, owner, coord, settings.num_shells),
                    algorithm: factory(owner, id),
                });
            }
        }

        Self {
            board: board.clone(),
            last_round_board: board.clone(),
            tanks,
            shells: Vec::new(),
            actions: Vec::new(),
            turn: 0,
            max_steps: settings.max_steps,
            zero_ammo_grace: None,
            log: Vec::new(),
        }
    }

    fn run(&mut self, player1: &mut dyn Player, player2: &mut dyn Player) -> GameResult {
        // A side with no tanks on the initial board loses before any turn.
        let initial = self.alive_counts();
        if initial[0] == 0 || initial[1] == 0 {
            return self.finish(Self::death_outcome(initial), GameResultReason::AllTanksDead);
        }

        loop {
            self.last_round_board = self.board.clone();

            if self.turn >= self.max_steps {
                let counts = self.alive_counts();
                return self.finish((0, counts), GameResultReason::MaxSteps);
            }

            self.gather_actions();
            self.perform_actions(player1, player2);

            for _ in 0..SHELL_SUBSTEPS_PER_TURN {
                self.shell_substep();
                self.collapse_shells();
            }

            self.log_turn();

            let counts = self.alive_counts();
            if counts[0] == 0 || counts[1] == 0 {
                return self.finish(Self::death_outcome(counts), GameResultReason::AllTanksDead);
            }

            if self.all_alive_out_of_ammo() && self.zero_ammo_grace.is_none() {
                debug!(turn = self.turn, "all tanks out of ammo, grace period starts");
                self.zero_ammo_grace = Some(ZERO_SHELLS_GRACE_TURNS);
            }
            if let Some(grace) = &mut self.zero_ammo_grace {
                *grace -= 1;
                if *grace == 0 {
                    return self.finish((0, counts), GameResultReason::ZeroShells);
                }
            }

            self.turn += 1;
        }
    }

    /// Winner and remaining counts once at least one side has no tanks.
    fn death_outcome(counts: [usize; 2]) -> (u8, [usize; 2]) {
        match counts {
            [0, 0] => (0, [0, 0]),
            [0, _] => (2, counts),
            _ => (1, counts),
        }
    }

    fn finish(&self, (winner, remaining): (u8, [usize; 2]), reason: GameResultReason) -> GameResult {
        GameResult {
            winner,
            reason,
            remaining_tanks: remaining,
            final_board: self.board.clone(),
            rounds: self.turn,
        }
    }

    fn alive_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for unit in &self.tanks {
            if unit.record.is_alive() {
                counts[unit.record.owner().index()] += 1;
            }
        }
        counts
    }

    fn all_alive_out_of_ammo(&self) -> bool {
        self.tanks
            .iter()
            .filter(|unit| unit.record.is_alive())
            .all(|unit| unit.record.ammo() == 0)
    }

    /// Ask every alive tank for its action; dead tanks get a placeholder.
    fn gather_actions(&mut self) {
        self.actions.clear();
        for unit in &mut self.tanks {
            if unit.record.is_alive() {
                self.actions.push((unit.algorithm.next_action(), true));
            } else {
                self.actions.push((ActionRequest::DoNothing, false));
            }
        }
    }

    fn perform_actions(&mut self, player1: &mut dyn Player, player2: &mut dyn Player) {
        for idx in 0..self.tanks.len() {
            if self.tanks[idx].record.is_alive() {
                let action = self.actions[idx].0;
                if !self.perform_action(idx, action, player1, player2) {
                    self.actions[idx].1 = false;
                }
            }
        }
    }

    /// Apply one tank's action. Returns whether the action was accepted.
    fn perform_action(
        &mut self,
        idx: usize,
        action: ActionRequest,
        player1: &mut dyn Player,
        player2: &mut dyn Player,
    ) -> bool {
        // Chained backward moves skip the wait entirely.
        if self.tanks[idx].record.backward_state() == BackwardState::JustMoved {
            if action == ActionRequest::MoveBackward {
                if self.is_valid_move(idx, true) {
                    self.move_tank(idx, true);
                    return true;
                }
                return false;
            }
            self.tanks[idx].record.cancel_backward();
        }

        if action == ActionRequest::MoveBackward
            && !matches!(
                self.tanks[idx].record.backward_state(),
                BackwardState::Requested(_)
            )
        {
            self.tanks[idx].record.request_backward();
        }

        if let BackwardState::Requested(wait) = self.tanks[idx].record.backward_state() {
            // The cooldown keeps ticking through the whole wait.
            self.tanks[idx].record.decrement_cooldown();

            if action == ActionRequest::MoveForward {
                // Forward cancels the pending backward without moving.
                self.tanks[idx].record.cancel_backward();
                return false;
            }

            if wait == 0 {
                if self.is_valid_move(idx, true) {
                    self.move_tank(idx, true);
                    self.tanks[idx].record.mark_just_moved_backward();
                } else {
                    self.tanks[idx].record.cancel_backward();
                }
                return false;
            }

            // Only the requesting turn itself counts as accepted; anything
            // queued during the wait is ignored.
            let fresh_request = wait == BACKWARD_WAIT_TURNS;
            self.tanks[idx].record.tick_backward();
            return fresh_request;
        }

        if !self.is_valid_action(idx, action) {
            self.tanks[idx].record.decrement_cooldown();
            return false;
        }

        match action {
            ActionRequest::MoveForward => {
                self.move_tank(idx, false);
                self.tanks[idx].record.decrement_cooldown();
            }
            ActionRequest::Shoot => self.shoot(idx),
            ActionRequest::MoveBackward => {} // handled by the wait above
            ActionRequest::GetBattleInfo => {
                self.exchange_battle_info(idx, player1, player2);
                self.tanks[idx].record.decrement_cooldown();
            }
            ActionRequest::DoNothing => self.tanks[idx].record.decrement_cooldown(),
            ActionRequest::RotateLeft45
            | ActionRequest::RotateRight45
            | ActionRequest::RotateLeft90
            | ActionRequest::RotateRight90 => {
                self.rotate(idx, action);
                self.tanks[idx].record.decrement_cooldown();
            }
        }

        true
    }

    fn is_valid_action(&self, idx: usize, action: ActionRequest) -> bool {
        match action {
            ActionRequest::MoveForward => self.is_valid_move(idx, false),
            ActionRequest::MoveBackward => self.is_valid_move(idx, true),
            ActionRequest::Shoot => {
                let record = &self.tanks[idx].record;
                record.ammo() > 0 && record.shoot_cooldown() == 0
            }
            _ => true,
        }
    }

    /// Walls block movement; everything else is resolved on entry.
    fn is_valid_move(&self, idx: usize, backward: bool) -> bool {
        let record = &self.tanks[idx].record;
        let Some(position) = record.position() else {
            return false;
        };
        let dir = if backward {
            record.facing().opposite()
        } else {
            record.facing()
        };
        !self.board.get(self.board.step(position, dir)).blocks_movement()
    }

    fn rotate(&mut self, idx: usize, action: ActionRequest) {
        let steps = match action {
            ActionRequest::RotateLeft45 => -1,
            ActionRequest::RotateRight45 => 1,
            ActionRequest::RotateLeft90 => -2,
            ActionRequest::RotateRight90 => 2,
            _ => 0,
        };
        let record = &mut self.tanks[idx].record;
        record.set_facing(record.facing().rotated(steps));
    }

    fn move_tank(&mut self, idx: usize, backward: bool) {
        let record = &self.tanks[idx].record;
        let Some(position) = record.position() else {
            return;
        };
        let owner = record.owner();
        let dir = if backward {
            record.facing().opposite()
        } else {
            record.facing()
        };

        self.board.set(position, Cell::Empty);
        let next = self.board.step(position, dir);

        match self.board.get(next) {
            Cell::Empty => {
                self.board.set(next, Cell::Tank(owner));
                self.tanks[idx].record.set_position(next);
            }
            Cell::Mine => {
                self.tanks[idx].record.mark_killed();
                self.board.set(next, Cell::Empty);
            }
            Cell::Shell => match self.shell_index_at(next) {
                Some(shell_idx) if dir.is_opposite_of(self.shells[shell_idx].direction) => {
                    self.tanks[idx].record.mark_killed();
                    self.shells.remove(shell_idx);
                    self.board.set(next, Cell::Empty);
                }
                _ => {
                    self.board.set(next, Cell::TankOnShell(owner));
                    self.tanks[idx].record.set_position(next);
                }
            },
            // Anything else is another tank (or its transient marker):
            // both tanks are destroyed.
            _ => {
                self.tanks[idx].record.mark_killed();
                if let Some(other) = self.tank_index_at(next) {
                    self.tanks[other].record.mark_killed();
                }
                self.board.set(next, Cell::Empty);
            }
        }
    }

    fn shoot(&mut self, idx: usize) {
        let record = &mut self.tanks[idx].record;
        record.reset_cooldown();
        record.decrement_ammo();

        let Some(position) = record.position() else {
            return;
        };
        let dir = record.facing();
        let next = self.board.step(position, dir);

        match self.board.get(next) {
            Cell::Wall => self.board.set(next, Cell::WeakWall),
            Cell::WeakWall => self.board.set(next, Cell::Empty),
            Cell::Tank(owner) => {
                // The shell spawns on the tank; the kill resolves on the
                // next substep.
                self.board.set(next, Cell::ShellOnTank(owner));
                self.shells.push(Shell::new(next, dir));
            }
            Cell::Shell => {
                self.board.set(next, Cell::Empty);
                if let Some(shell_idx) = self.shell_index_at(next) {
                    self.shells.remove(shell_idx);
                }
            }
            Cell::Mine => {
                self.board.set(next, Cell::Shell);
                let mut shell = Shell::new(next, dir);
                shell.above_mine = true;
                self.shells.push(shell);
            }
            _ => {
                self.board.set(next, Cell::Shell);
                self.shells.push(Shell::new(next, dir));
            }
        }
    }

    fn exchange_battle_info<'a>(
        &mut self,
        idx: usize,
        player1: &'a mut dyn Player,
        player2: &'a mut dyn Player,
    ) {
        let Some(position) = self.tanks[idx].record.position() else {
            return;
        };
        let owner = self.tanks[idx].record.owner();

        // Mark the observing tank on the snapshot, run the exchange, then
        // restore the cell.
        let previous = self.last_round_board.get(position);
        self.last_round_board.set(position, Cell::SelfMarker);
        let player = match owner {
            Owner::One => player1,
            Owner::Two => player2,
        };
        player.update_tank_with_battle_info(
            self.tanks[idx].algorithm.as_mut(),
            &self.last_round_board,
        );
        self.last_round_board.set(position, previous);
    }

    /// Advance every shell by one cell, resolving impacts.
    fn shell_substep(&mut self) {
        let mut i = 0;
        while i < self.shells.len() {
            let shell = self.shells[i];

            // A shell that spawned on a tank kills it before moving.
            if let Cell::ShellOnTank(_) = self.board.get(shell.position) {
                if let Some(tank_idx) = self.tank_index_at(shell.position) {
                    self.tanks[tank_idx].record.mark_killed();
                    self.board.set(shell.position, Cell::Empty);
                    self.shells.remove(i);
                    continue;
                }
            }

            self.clear_previous_shell_cell(i);

            let next = self.board.step(shell.position, shell.direction);
            match self.board.get(next) {
                Cell::Shell => {
                    let other = self.shell_index_at(next);
                    let opposite = other
                        .map(|o| shell.direction.is_opposite_of(self.shells[o].direction))
                        .unwrap_or(false);
                    if let (Some(other_idx), true) = (other, opposite) {
                        self.board.set(next, Cell::Empty);
                        if other_idx > i {
                            self.shells.remove(other_idx);
                            self.shells.remove(i);
                        } else {
                            self.shells.remove(i);
                            self.shells.remove(other_idx);
                            i -= 1;
                        }
                    } else {
                        // Non-opposite shells stack; they separate as the
                        // later one advances within this same substep.
                        self.shells[i].position = next;
                        self.board.set(next, Cell::ShellsStacked);
                        i += 1;
                    }
                }
                Cell::Wall => {
                    self.board.set(next, Cell::WeakWall);
                    self.shells.remove(i);
                }
                Cell::WeakWall => {
                    self.board.set(next, Cell::Empty);
                    self.shells.remove(i);
                }
                Cell::Tank(_) => {
                    if let Some(tank_idx) = self.tank_index_at(next) {
                        self.tanks[tank_idx].record.mark_killed();
                        self.board.set(next, Cell::Empty);
                        self.shells.remove(i);
                    } else {
                        i += 1;
                    }
                }
                Cell::Mine => {
                    self.shells[i].position = next;
                    self.shells[i].above_mine = true;
                    self.board.set(next, Cell::Shell);
                    i += 1;
                }
                Cell::Empty => {
                    self.shells[i].position = next;
                    self.board.set(next, Cell::Shell);
                    i += 1;
                }
                _ => i += 1,
            }
        }
    }

    /// Restore the cell a shell is leaving.
    fn clear_previous_shell_cell(&mut self, idx: usize) {
        let position = self.shells[idx].position;
        if self.shells[idx].above_mine {
            self.board.set(position, Cell::Mine);
            self.shells[idx].above_mine = false;
            return;
        }
        match self.board.get(position) {
            Cell::ShellsStacked => self.board.set(position, Cell::Shell),
            Cell::TankOnShell(owner) => self.board.set(position, Cell::Tank(owner)),
            Cell::Tank(_) | Cell::Mine => {}
            _ => self.board.set(position, Cell::Empty),
        }
    }

    /// Destroy every group of shells that ended a substep on the same cell.
    fn collapse_shells(&mut self) {
        use std::collections::HashMap;

        let mut per_cell: HashMap<Coord, usize> = HashMap::new();
        for shell in &self.shells {
            *per_cell.entry(shell.position).or_insert(0) += 1;
        }

        for (&coord, &count) in &per_cell {
            if count >= 2 {
                self.board.set(coord, Cell::Empty);
            }
        }
        self.shells.retain(|shell| per_cell[&shell.position] < 2);
    }

    fn tank_index_at(&self, coord: Coord) -> Option<usize> {
        self.tanks
            .iter()
            .position(|unit| unit.record.position() == Some(coord))
    }

    fn shell_index_at(&self, coord: Coord) -> Option<usize> {
        self.shells.iter().position(|shell| shell.position == coord)
    }

    /// Append this turn's action summary to the match log.
    fn log_turn(&mut self) {
        let mut entries = Vec::with_capacity(self.tanks.len());
        for (unit, &(action, accepted)) in self.tanks.iter_mut().zip(self.actions.iter()) {
            let entry = match unit.record.turns_dead() {
                0 => {
                    if accepted {
                        action.to_string()
                    } else {
                        format!("{action} (ignored)")
                    }
                }
                1 => {
                    unit.record.age_death();
                    if accepted {
                        format!("{action} (killed)")
                    } else {
                        format!("{action} (ignored) (killed)")
                    }
                }
                _ => {
                    unit.record.age_death();
                    "killed".to_string()
                }
            };
            entries.push(entry);
        }
        self.log.push(entries.join(", "));
    }
}
