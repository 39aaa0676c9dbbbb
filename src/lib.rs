// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Salvo: a deterministic tank-battle engine and tournament runner.
//!
//! This crate provides:
//! - A per-turn grid simulator with shells, mines, and destructible walls
//! - A BFS pursuit algorithm driving each tank
//! - Two batch orchestrators: comparative (one map, many game managers)
//!   and competition (many maps, round-robin algorithm pairing)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Tournament Orchestrators        │
//! ├─────────────────────────────────────┤
//! │     Game Engine (turn loop)         │
//! ├─────────────────────────────────────┤
//! │     Tank Algorithms / Players       │
//! └─────────────────────────────────────┘
//! ```

pub mod algorithm;
pub mod game;
pub mod logging;
pub mod tournament;

// Re-export key game types at crate root for convenience
pub use game::{
    ActionRequest, Board, Cell, Direction, GameResult, GameResultReason, MatchSettings, Owner,
};
