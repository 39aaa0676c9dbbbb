//! The factory registrar shared by plugin loaders.
//!
//! Plugins register up to three factories under their name: a player
//! factory and a tank-algorithm factory (together forming an algorithm
//! entry), or a game-manager factory. The registrar is shared across
//! loader threads; every operation serializes on an internal mutex.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::game::{
    GameManagerFactory, MatchSettings, Owner, Player, PlayerFactory, TankAlgorithm,
    TankAlgorithmFactory,
};

/// A named set of factories contributed by one plugin.
#[derive(Clone)]
pub struct RegistrarEntry {
    name: String,
    player_factory: Option<PlayerFactory>,
    tank_factory: Option<TankAlgorithmFactory>,
    gm_factory: Option<GameManagerFactory>,
}

impl RegistrarEntry {
    fn new(name: String) -> Self {
        Self {
            name,
            player_factory: None,
            tank_factory: None,
            gm_factory: None,
        }
    }

    /// The plugin name this entry was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a player factory has been set.
    #[must_use]
    pub fn has_player_factory(&self) -> bool {
        self.player_factory.is_some()
    }

    /// Whether a tank-algorithm factory has been set.
    #[must_use]
    pub fn has_tank_factory(&self) -> bool {
        self.tank_factory.is_some()
    }

    /// Whether a game-manager factory has been set.
    #[must_use]
    pub fn has_gm_factory(&self) -> bool {
        self.gm_factory.is_some()
    }

    /// Create a player for one side of a match.
    ///
    /// Returns `None` if no player factory was registered.
    #[must_use]
    pub fn create_player(&self, owner: Owner, cols: usize, rows: usize, settings: &MatchSettings) -> Option<Box<dyn Player>> {
        self.player_factory
            .as_ref()
            .map(|f| f(owner, cols, rows, settings.max_steps, settings.num_shells))
    }

    /// Create a tank algorithm for (owner, per-owner index).
    #[must_use]
    pub fn create_tank_algorithm(&self, owner: Owner, tank_index: usize) -> Option<Box<dyn TankAlgorithm>> {
        self.tank_factory.as_ref().map(|f| f(owner, tank_index))
    }

    /// The tank-algorithm factory itself, for handing to a game manager.
    #[must_use]
    pub fn tank_factory(&self) -> Option<TankAlgorithmFactory> {
        self.tank_factory.clone()
    }

    /// Create a game manager instance.
    #[must_use]
    pub fn create_game_manager(&self, verbose: bool) -> Option<Box<dyn crate::game::GameManager>> {
        self.gm_factory.as_ref().map(|f| f(verbose))
    }
}

/// Why a registrar operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrarError {
    /// An operation targeting the last entry found the registrar empty.
    NoEntries,
    /// A factory slot was set twice on the same entry.
    FactoryAlreadySet {
        /// Entry name.
        name: String,
        /// Which factory slot was duplicated.
        factory: &'static str,
    },
    /// Validation found an empty name or a missing required factory.
    IncompleteRegistration {
        /// Entry name (possibly empty).
        name: String,
        /// Whether the name is non-empty.
        has_name: bool,
        /// Whether the player factory is present.
        has_player_factory: bool,
        /// Whether the tank-algorithm factory is present.
        has_tank_factory: bool,
        /// Whether the game-manager factory is present.
        has_gm_factory: bool,
    },
}

impl fmt::Display for RegistrarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrarError::NoEntries => write!(f, "registrar has no entries"),
            RegistrarError::FactoryAlreadySet { name, factory } => {
                write!(f, "{factory} factory already set for entry '{name}'")
            }
            RegistrarError::IncompleteRegistration {
                name,
                has_name,
                has_player_factory,
                has_tank_factory,
                has_gm_factory,
            } => write!(
                f,
                "incomplete registration for '{name}': has_name={has_name}, \
                 player={has_player_factory}, tank={has_tank_factory}, gm={has_gm_factory}"
            ),
        }
    }
}

impl std::error::Error for RegistrarError {}

/// The shared factory registry.
#[derive(Default)]
pub struct Registrar {
    entries: Mutex<Vec<RegistrarEntry>>,
}

impl Registrar {
    /// Create an empty registrar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RegistrarEntry>> {
        // A poisoned lock only means another loader panicked mid-operation;
        // the entry list itself is always in a consistent state.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a fresh entry for a plugin being loaded.
    pub fn create_entry(&self, name: &str) {
        self.lock().push(RegistrarEntry::new(name.to_string()));
    }

    /// Set the player factory on the entry being loaded.
    ///
    /// # Errors
    ///
    /// Fails when there is no entry or the slot is already set.
    pub fn set_player_factory(&self, factory: PlayerFactory) -> Result<(), RegistrarError> {
        let mut entries = self.lock();
        let entry = entries.last_mut().ok_or(RegistrarError::NoEntries)?;
        if entry.player_factory.is_some() {
            return Err(RegistrarError::FactoryAlreadySet {
                name: entry.name.clone(),
                factory: "player",
            });
        }
        entry.player_factory = Some(factory);
        Ok(())
    }

    /// Set the tank-algorithm factory on the entry being loaded.
    ///
    /// # Errors
    ///
    /// Fails when there is no entry or the slot is already set.
    pub fn set_tank_factory(&self, factory: TankAlgorithmFactory) -> Result<(), RegistrarError> {
        let mut entries = self.lock();
        let entry = entries.last_mut().ok_or(RegistrarError::NoEntries)?;
        if entry.tank_factory.is_some() {
            return Err(RegistrarError::FactoryAlreadySet {
                name: entry.name.clone(),
                factory: "tank",
            });
        }
        entry.tank_factory = Some(factory);
        Ok(())
    }

    /// Set the game-manager factory on the entry being loaded.
    ///
    /// # Errors
    ///
    /// Fails when there is no entry or the slot is already set.
    pub fn set_gm_factory(&self, factory: GameManagerFactory) -> Result<(), RegistrarError> {
        let mut entries = self.lock();
        let entry = entries.last_mut().ok_or(RegistrarError::NoEntries)?;
        if entry.gm_factory.is_some() {
            return Err(RegistrarError::FactoryAlreadySet {
                name: entry.name.clone(),
                factory: "game-manager",
            });
        }
        entry.gm_factory = Some(factory);
        Ok(())
    }

    fn incomplete(entry: &RegistrarEntry) -> RegistrarError {
        RegistrarError::IncompleteRegistration {
            name: entry.name.clone(),
            has_name: !entry.name.is_empty(),
            has_player_factory: entry.has_player_factory(),
            has_tank_factory: entry.has_tank_factory(),
            has_gm_factory: entry.has_gm_factory(),
        }
    }

    /// Check that the last entry is a complete algorithm registration:
    /// non-empty name, player factory, and tank-algorithm factory.
    ///
    /// # Errors
    ///
    /// Returns the validation failure; the caller is expected to roll the
    /// entry back with [`remove_last`](Registrar::remove_last).
    pub fn validate_last_algorithm(&self) -> Result<(), RegistrarError> {
        let entries = self.lock();
        let entry = entries.last().ok_or(RegistrarError::NoEntries)?;
        if entry.name.is_empty() || !entry.has_player_factory() || !entry.has_tank_factory() {
            return Err(Self::incomplete(entry));
        }
        Ok(())
    }

    /// Check that the last entry is a complete game-manager registration.
    ///
    /// # Errors
    ///
    /// Returns the validation failure; the caller is expected to roll the
    /// entry back with [`remove_last`](Registrar::remove_last).
    pub fn validate_last_game_manager(&self) -> Result<(), RegistrarError> {
        let entries = self.lock();
        let entry = entries.last().ok_or(RegistrarError::NoEntries)?;
        if entry.name.is_empty() || !entry.has_gm_factory() {
            return Err(Self::incomplete(entry));
        }
        Ok(())
    }

    /// Roll back the entry being loaded.
    pub fn remove_last(&self) {
        self.lock().pop();
    }

    /// Remove every entry registered under `name`.
    pub fn erase_by_name(&self, name: &str) {
        self.lock().retain(|entry| entry.name != name);
    }

    /// A clone of the entry registered under `name`, if present.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<RegistrarEntry> {
        self.lock().iter().find(|e| e.name == name).cloned()
    }

    /// Number of live entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
