//! The pursuit algorithm: a player collaborator plus the per-tank
//! decision core that chases the nearest enemy by BFS.

pub mod player;
pub mod pursuit;

pub use player::PursuitPlayer;
pub use pursuit::PursuitTank;
