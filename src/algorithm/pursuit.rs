//! The per-tank decision core.
//!
//! The tank keeps a dead-reckoned copy of its own position and facing,
//! refreshed through battle-info exchanges. Each call works down a fixed
//! ladder: finish a pending backward move, refresh battle info, evade an
//! incoming shell, shoot an enemy in the line of fire, or follow a BFS
//! path toward the nearest enemy.

use std::collections::VecDeque;

use crate::game::{
    ActionRequest, BattleInfo, Board, Cell, Coord, Direction, Owner, TankAlgorithm,
    BACKWARD_WAIT_TURNS, SHOOT_COOLDOWN_TURNS,
};

/// Planned actions kept ahead of time; the plan is rebuilt whenever it runs dry.
const PLANNED_ACTIONS_MAX: usize = 5;

/// Chebyshev radius within which a shell counts as a threat.
const SHELL_DANGER_RANGE: i64 = 5;

/// A tank that chases the nearest enemy and shoots on sight.
pub struct PursuitTank {
    owner: Owner,
    tank_index: usize,
    location: Coord,
    direction: Direction,
    ammo: usize,
    shoot_cooldown: u8,
    evade_turns: u8,
    shot_direction: Option<Direction>,
    shot_direction_cooldown: u8,
    backward_pending: bool,
    just_moved_backward: bool,
    backward_timer: u8,
    just_got_battle_info: bool,
    first_battle_info: bool,
    board: Option<Board>,
    shell_positions: Vec<Coord>,
    planned: VecDeque<ActionRequest>,
}

impl PursuitTank {
    /// Create the decision core for one tank.
    #[must_use]
    pub fn new(owner: Owner, tank_index: usize) -> Self {
        Self {
            owner,
            tank_index,
            location: Coord::new(0, 0),
            direction: owner.initial_facing(),
            ammo: 0,
            shoot_cooldown: 0,
            evade_turns: 0,
            shot_direction: None,
            shot_direction_cooldown: 0,
            backward_pending: false,
            just_moved_backward: false,
            backward_timer: 0,
            just_got_battle_info: false,
            first_battle_info: true,
            board: None,
            shell_positions: Vec::new(),
            planned: VecDeque::with_capacity(PLANNED_ACTIONS_MAX + 3),
        }
    }

    /// Direction from a (current − target) coordinate difference.
    ///
    /// With `wrap` dimensions, a difference that can only come from crossing
    /// a board edge is rotated to point the short way around the torus.
    fn diff_to_dir(dx: i64, dy: i64, wrap: Option<(i64, i64)>) -> Direction {
        let mut extra = 0;
        if let Some((rows, cols)) = wrap {
            if (dx == 1 - cols && dy == -1)
                || (dx == cols - 1 && dy == 1)
                || (dx == 1 && dy == 1 - rows)
                || (dx == -1 && dy == rows - 1)
            {
                extra = 2;
            } else if (dx == 1 - cols && dy == 0)
                || (dx == cols - 1 && dy == 0)
                || (dx == 0 && dy == 1 - rows)
                || (dx == 0 && dy == rows - 1)
                || (dx.abs() == cols - 1 && dy.abs() == rows - 1)
            {
                extra = 4;
            } else if (dx == 1 - cols && dy == 1)
                || (dx == cols - 1 && dy == -1)
                || (dx == -1 && dy == 1 - rows)
                || (dx == 1 && dy == rows - 1)
            {
                extra = 6;
            }
        }

        let mut dir = Direction::Up;
        if dx == 0 && dy > 0 {
            dir = Direction::Up;
        }
        if dx < 0 && dy > 0 {
            dir = Direction::UpRight;
        }
        if dx < 0 && dy == 0 {
            dir = Direction::Right;
        }
        if dx < 0 && dy < 0 {
            dir = Direction::DownRight;
        }
        if dx == 0 && dy < 0 {
            dir = Direction::Down;
        }
        if dx > 0 && dy < 0 {
            dir = Direction::DownLeft;
        }
        if dx > 0 && dy == 0 {
            dir = Direction::Left;
        }
        if dx > 0 && dy > 0 {
            dir = Direction::UpLeft;
        }

        dir.rotated(extra)
    }

    /// Queue the minimal-rotation action sequence from `curr` toward `next`.
    ///
    /// Returns the facing after the queued rotations, if it changes.
    fn plan_route_step(
        &mut self,
        curr: Coord,
        next: Coord,
        dir: Direction,
        is_evade: bool,
    ) -> Option<Direction> {
        let Some(board) = &self.board else {
            return None;
        };
        let dims = (board.height() as i64, board.width() as i64);
        let dx = curr.x as i64 - next.x as i64;
        let dy = curr.y as i64 - next.y as i64;
        let target = Self::diff_to_dir(dx, dy, Some(dims));

        match (dir.index() - target.index()).rem_euclid(8) {
            0 => {
                self.planned.push_back(ActionRequest::MoveForward);
                if is_evade {
                    self.evade_turns = 1;
                }
                None
            }
            1 => {
                self.planned.push_back(ActionRequest::RotateLeft45);
                self.planned.push_back(ActionRequest::MoveForward);
                if is_evade {
                    self.evade_turns = 2;
                }
                Some(dir.rotated(-1))
            }
            2 => {
                self.planned.push_back(ActionRequest::RotateLeft90);
                self.planned.push_back(ActionRequest::MoveForward);
                if is_evade {
                    self.evade_turns = 2;
                }
                Some(dir.rotated(-2))
            }
            3 => {
                self.planned.push_back(ActionRequest::RotateLeft90);
                self.planned.push_back(ActionRequest::RotateLeft45);
                self.planned.push_back(ActionRequest::MoveForward);
                if is_evade {
                    self.evade_turns = 3;
                }
                Some(dir.rotated(-3))
            }
            4 => {
                // Directly behind. While evading, shooting beats turning
                // the tank around.
                if is_evade && self.evade_turns == 0 && self.ammo > 0 && self.shoot_cooldown == 0 {
                    self.planned.push_back(ActionRequest::Shoot);
                    self.evade_turns = 1;
                } else {
                    self.planned.push_back(ActionRequest::MoveBackward);
                }
                None
            }
            5 => {
                self.planned.push_back(ActionRequest::RotateRight90);
                self.planned.push_back(ActionRequest::RotateRight45);
                self.planned.push_back(ActionRequest::MoveForward);
                if is_evade {
                    self.evade_turns = 3;
                }
                Some(dir.rotated(3))
            }
            6 => {
                self.planned.push_back(ActionRequest::RotateRight90);
                self.planned.push_back(ActionRequest::MoveForward);
                if is_evade {
                    self.evade_turns = 2;
                }
                Some(dir.rotated(2))
            }
            _ => {
                self.planned.push_back(ActionRequest::RotateRight45);
                self.planned.push_back(ActionRequest::MoveForward);
                if is_evade {
                    self.evade_turns = 2;
                }
                Some(dir.rotated(1))
            }
        }
    }

    /// Rebuild the plan with a single sidestep off the danger axis.
    fn plan_evasion(&mut self, danger_dir: Direction) {
        self.planned.clear();
        let Some(board) = self.board.clone() else {
            return;
        };

        let opposite = danger_dir.opposite();
        for dir in Direction::ALL {
            if dir == danger_dir || dir == opposite {
                continue;
            }
            let candidate = board.step(self.location, dir);
            if board.get(candidate) == Cell::Empty {
                self.plan_route_step(self.location, candidate, self.direction, true);
                break;
            }
        }
    }

    /// Rebuild the plan from a BFS path toward the nearest enemy.
    fn plan_pursuit(&mut self) {
        self.planned.clear();

        let path = self.bfs_path();

        // No reachable enemy: try to shoot a corridor open.
        if path.is_empty()
            && self.ammo > 0
            && self.shoot_cooldown == 0
            && !self.friendly_in_line(self.direction)
        {
            self.planned.push_back(ActionRequest::Shoot);
        }

        let mut curr = self.location;
        let mut dir = self.direction;
        for next in path {
            if self.planned.len() >= PLANNED_ACTIONS_MAX {
                break;
            }
            if let Some(new_dir) = self.plan_route_step(curr, next, dir, false) {
                dir = new_dir;
            }
            curr = next;
        }
    }

    /// Breadth-first search to the closest enemy tank.
    ///
    /// Walls, weakened walls, mines, and own-side tanks block; the search
    /// wraps around the board. Returns the cell path excluding the start,
    /// ending on the enemy's cell, or an empty path when unreachable.
    fn bfs_path(&self) -> Vec<Coord> {
        let Some(board) = &self.board else {
            return Vec::new();
        };
        let width = board.width();
        let index = |c: Coord| c.y * width + c.x;

        let start = self.location;
        let mut visited = vec![false; width * board.height()];
        let mut parent: Vec<Option<Coord>> = vec![None; width * board.height()];
        let mut queue = VecDeque::new();

        visited[index(start)] = true;
        queue.push_back(start);
        let mut target = None;

        'search: while let Some(curr) = queue.pop_front() {
            for dir in Direction::ALL {
                let next = board.step(curr, dir);
                let cell = board.get(next);

                if cell == Cell::Tank(self.owner.opponent()) {
                    visited[index(next)] = true;
                    parent[index(next)] = Some(curr);
                    target = Some(next);
                    break 'search;
                }

                if !visited[index(next)] {
                    visited[index(next)] = true;
                    if matches!(cell, Cell::Wall | Cell::WeakWall | Cell::Mine)
                        || cell == Cell::Tank(self.owner)
                    {
                        continue;
                    }
                    parent[index(next)] = Some(curr);
                    queue.push_back(next);
                }
            }
        }

        let Some(end) = target else {
            return Vec::new();
        };

        let mut path = Vec::new();
        let mut curr = end;
        while curr != start {
            path.push(curr);
            match parent[index(curr)] {
                Some(prev) => curr = prev,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Whether an enemy tank sits in the current line of fire.
    fn enemy_in_line(&self) -> bool {
        let Some(board) = &self.board else {
            return false;
        };
        for (coord, cell) in board.iter() {
            if cell != Cell::Tank(self.owner.opponent()) {
                continue;
            }
            let dx = self.location.x as i64 - coord.x as i64;
            let dy = self.location.y as i64 - coord.y as i64;
            let dir_to = Self::diff_to_dir(dx, dy, None);
            if self.direction == dir_to
                && (dx == 0 || dy == 0 || dx.abs() == dy.abs())
                && !self.friendly_in_line(dir_to)
            {
                return true;
            }
        }
        false
    }

    /// Raycast along `dir` and report whether a same-side tank would be hit
    /// before any enemy. Cardinal rays wrap around the board; diagonal rays
    /// stop at the edge.
    fn friendly_in_line(&self, dir: Direction) -> bool {
        let Some(board) = &self.board else {
            return false;
        };
        let start = self.location;

        if dir.is_cardinal() {
            let mut pos = start;
            loop {
                pos = board.step(pos, dir);
                match board.get(pos) {
                    Cell::Tank(owner) if owner != self.owner => return false,
                    Cell::Tank(_) => return true,
                    _ => {}
                }
                if pos == start {
                    // Wrapped all the way around: the ray hits the tank itself.
                    return true;
                }
            }
        }

        let (dx, dy) = dir.offset();
        let mut x = start.x as i64;
        let mut y = start.y as i64;
        loop {
            x += i64::from(dx);
            y += i64::from(dy);
            if x < 0 || x >= board.width() as i64 || y < 0 || y >= board.height() as i64 {
                return false;
            }
            match board.object_at(x as usize, y as usize) {
                Cell::Tank(owner) if owner != self.owner => return false,
                Cell::Tank(_) => return true,
                _ => {}
            }
        }
    }

    /// The incoming direction of the nearest threatening shell, if any.
    ///
    /// A shell threatens when it is within the danger radius on the same
    /// row, column, or diagonal. Shells arriving from the tank's own recent
    /// shot direction are ignored while that shot is still in flight.
    fn incoming_shell_direction(&self) -> Option<Direction> {
        for &shell in &self.shell_positions {
            let dx = self.location.x as i64 - shell.x as i64;
            let dy = self.location.y as i64 - shell.y as i64;
            if dx.abs() > SHELL_DANGER_RANGE || dy.abs() > SHELL_DANGER_RANGE {
                continue;
            }
            if shell == self.location {
                continue;
            }
            let danger = Self::diff_to_dir(dx, dy, None);
            if self.shot_direction == Some(danger) && self.shot_direction_cooldown > 0 {
                continue;
            }
            if dx == 0 || dy == 0 || dx.abs() == dy.abs() {
                return Some(danger);
            }
        }
        None
    }

    /// Account for a shot: spend ammo, restart both shot cooldowns.
    fn register_shot(&mut self) {
        self.ammo = self.ammo.saturating_sub(1);
        self.shoot_cooldown = SHOOT_COOLDOWN_TURNS;
        self.shot_direction = Some(self.direction);
        self.shot_direction_cooldown = SHOOT_COOLDOWN_TURNS;
    }

    /// Update the dead-reckoned position and facing for an emitted action.
    fn apply_self_move(&mut self, action: ActionRequest) {
        match action {
            ActionRequest::MoveForward => {
                self.backward_pending = false;
                if let Some(board) = &self.board {
                    self.location = board.step(self.location, self.direction);
                }
            }
            ActionRequest::MoveBackward => {
                self.backward_pending = true;
                if let Some(board) = &self.board {
                    self.location = board.step(self.location, self.direction.opposite());
                }
            }
            ActionRequest::RotateLeft45 => self.direction = self.direction.rotated(-1),
            ActionRequest::RotateRight45 => self.direction = self.direction.rotated(1),
            ActionRequest::RotateLeft90 => self.direction = self.direction.rotated(-2),
            ActionRequest::RotateRight90 => self.direction = self.direction.rotated(2),
            _ => {}
        }
    }

    fn tick_timers(&mut self, action: ActionRequest) {
        if self.evade_turns > 0 {
            self.evade_turns -= 1;
        }
        if self.shoot_cooldown > 0 && action != ActionRequest::Shoot {
            self.shoot_cooldown -= 1;
        }
        if self.shot_direction_cooldown > 0 {
            self.shot_direction_cooldown -= 1;
        }
    }
}

impl TankAlgorithm for PursuitTank {
    fn next_action(&mut self) -> ActionRequest {
        let danger = self.incoming_shell_direction();

        // Mid-backward wait: hold still until the engine executes the move.
        if self.backward_timer > 0 && self.backward_pending {
            self.backward_timer -= 1;
            self.tick_timers(ActionRequest::DoNothing);
            return ActionRequest::DoNothing;
        }

        // The backward step executed last turn: catch the bookkeeping up.
        if self.backward_pending && !self.just_moved_backward {
            self.apply_self_move(ActionRequest::MoveBackward);
            self.backward_pending = false;
            self.just_moved_backward = true;
        }

        if self.planned.is_empty() && !self.just_got_battle_info {
            self.planned.push_back(ActionRequest::GetBattleInfo);
            self.just_got_battle_info = true;
        } else {
            self.just_got_battle_info = false;

            if danger.is_some() && self.evade_turns == 0 {
                if let Some(danger_dir) = danger {
                    self.plan_evasion(danger_dir);
                }
            } else if self.enemy_in_line() && self.shoot_cooldown == 0 && self.ammo > 0 {
                self.register_shot();
                return ActionRequest::Shoot;
            } else if self.planned.is_empty() {
                self.plan_pursuit();
            }
        }

        let action = self
            .planned
            .front()
            .copied()
            .unwrap_or(ActionRequest::DoNothing);

        if action == ActionRequest::Shoot {
            self.register_shot();
        } else if action == ActionRequest::MoveBackward {
            if !self.just_moved_backward {
                self.backward_timer = BACKWARD_WAIT_TURNS;
            }
            self.backward_pending = true;
        } else {
            self.backward_pending = false;
            self.just_moved_backward = false;
        }

        if self.backward_timer == 0 && action != ActionRequest::GetBattleInfo {
            self.apply_self_move(action);
        }
        self.tick_timers(action);
        self.planned.pop_front();

        action
    }

    fn update_battle_info(&mut self, info: &mut BattleInfo) {
        if self.first_battle_info {
            self.first_battle_info = false;
            self.ammo = info.initial_ammo;
            self.location = info.initial_position;
        }

        self.board = Some(info.board.clone());
        self.shell_positions = info.shell_positions.clone();

        info.tank_index = self.tank_index;
        info.current_ammo = self.ammo;
    }
}
