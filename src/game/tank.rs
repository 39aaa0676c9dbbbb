//! The per-tank record kept by the engine.

use crate::game::{Coord, Direction, Owner, BACKWARD_WAIT_TURNS, SHOOT_COOLDOWN_TURNS};

/// State of the delayed backward-move protocol.
///
/// A backward request waits two turns before executing. Immediately after a
/// backward step the tank may chain another backward move without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackwardState {
    /// No backward move pending.
    Idle,
    /// Backward requested; executes when the counter reaches 1 again.
    Requested(u8),
    /// A backward step executed last turn; another one is immediate.
    JustMoved,
}

/// A tank's engine-side record.
///
/// A tank is alive iff `turns_dead == 0`. Killing a tank clears its
/// position; the record is kept so the match log can keep reporting it.
#[derive(Debug, Clone)]
pub struct Tank {
    id: usize,
    owner: Owner,
    position: Option<Coord>,
    facing: Direction,
    ammo: usize,
    shoot_cooldown: u8,
    backward: BackwardState,
    turns_dead: usize,
}

impl Tank {
    /// Create a tank at its spawn cell with the side's initial facing.
    #[must_use]
    pub fn new(id: usize, owner: Owner, position: Coord, ammo: usize) -> Self {
        Self {
            id,
            owner,
            position: Some(position),
            facing: owner.initial_facing(),
            ammo,
            shoot_cooldown: 0,
            backward: BackwardState::Idle,
            turns_dead: 0,
        }
    }

    /// Per-owner tank index, assigned in row-major spawn order.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Owning side.
    #[must_use]
    pub const fn owner(&self) -> Owner {
        self.owner
    }

    /// Current cell, or `None` once killed.
    #[must_use]
    pub const fn position(&self) -> Option<Coord> {
        self.position
    }

    /// Current facing.
    #[must_use]
    pub const fn facing(&self) -> Direction {
        self.facing
    }

    /// Remaining ammo.
    #[must_use]
    pub const fn ammo(&self) -> usize {
        self.ammo
    }

    /// Turns left until the tank may shoot again.
    #[must_use]
    pub const fn shoot_cooldown(&self) -> u8 {
        self.shoot_cooldown
    }

    /// Backward-protocol state.
    #[must_use]
    pub const fn backward_state(&self) -> BackwardState {
        self.backward
    }

    /// Turns since the tank died; 0 means alive, 1 means killed this turn.
    #[must_use]
    pub const fn turns_dead(&self) -> usize {
        self.turns_dead
    }

    /// Whether the tank is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.turns_dead == 0
    }

    /// Move the tank to a new cell.
    pub fn set_position(&mut self, position: Coord) {
        self.position = Some(position);
    }

    /// Point the tank in a new direction.
    pub fn set_facing(&mut self, facing: Direction) {
        self.facing = facing;
    }

    /// Tick the shoot cooldown down by one turn.
    pub fn decrement_cooldown(&mut self) {
        self.shoot_cooldown = self.shoot_cooldown.saturating_sub(1);
    }

    /// Restart the shoot cooldown after a shot.
    pub fn reset_cooldown(&mut self) {
        self.shoot_cooldown = SHOOT_COOLDOWN_TURNS;
    }

    /// Spend one shell.
    pub fn decrement_ammo(&mut self) {
        self.ammo = self.ammo.saturating_sub(1);
    }

    /// Enter the backward wait.
    pub fn request_backward(&mut self) {
        self.backward = BackwardState::Requested(BACKWARD_WAIT_TURNS);
    }

    /// Cancel a pending backward request.
    pub fn cancel_backward(&mut self) {
        self.backward = BackwardState::Idle;
    }

    /// Tick a pending backward request down by one turn.
    pub fn tick_backward(&mut self) {
        if let BackwardState::Requested(n) = self.backward {
            self.backward = BackwardState::Requested(n.saturating_sub(1));
        }
    }

    /// Latch that a backward step just executed.
    pub fn mark_just_moved_backward(&mut self) {
        self.backward = BackwardState::JustMoved;
    }

    /// Kill the tank: the position is cleared and the death counter starts.
    pub fn mark_killed(&mut self) {
        if self.turns_dead == 0 {
            self.turns_dead = 1;
            self.position = None;
        }
    }

    /// Advance the death counter for a tank that is already dead.
    pub fn age_death(&mut self) {
        if self.turns_dead > 0 {
            self.turns_dead += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank() -> Tank {
        Tank::new(0, Owner::One, Coord::new(3, 2), 16)
    }

    #[test]
    fn test_spawn_state() {
        let t = tank();
        assert!(t.is_alive());
        assert_eq!(t.facing(), Direction::Left);
        assert_eq!(t.shoot_cooldown(), 0);
        assert_eq!(t.backward_state(), BackwardState::Idle);
    }

    #[test]
    fn test_cooldown_saturates() {
        let mut t = tank();
        t.decrement_cooldown();
        assert_eq!(t.shoot_cooldown(), 0);
        t.reset_cooldown();
        assert_eq!(t.shoot_cooldown(), SHOOT_COOLDOWN_TURNS);
        t.decrement_cooldown();
        assert_eq!(t.shoot_cooldown(), SHOOT_COOLDOWN_TURNS - 1);
    }

    #[test]
    fn test_backward_protocol_states() {
        let mut t = tank();
        t.request_backward();
        assert_eq!(t.backward_state(), BackwardState::Requested(2));
        t.tick_backward();
        assert_eq!(t.backward_state(), BackwardState::Requested(1));
        t.mark_just_moved_backward();
        assert_eq!(t.backward_state(), BackwardState::JustMoved);
        t.cancel_backward();
        assert_eq!(t.backward_state(), BackwardState::Idle);
    }

    #[test]
    fn test_kill_clears_position() {
        let mut t = tank();
        t.mark_killed();
        assert!(!t.is_alive());
        assert_eq!(t.turns_dead(), 1);
        assert_eq!(t.position(), None);

        // A second kill event in the same turn must not restart the counter.
        t.mark_killed();
        assert_eq!(t.turns_dead(), 1);

        t.age_death();
        assert_eq!(t.turns_dead(), 2);
    }
}
