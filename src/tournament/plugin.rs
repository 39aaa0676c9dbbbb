//! Plugin loading over a static registration table.
//!
//! A plugin is addressed by a file path; its file stem selects a
//! registration function from the library. Loading follows the same
//! three-step transaction a dynamic loader would: create a registrar
//! entry, run the plugin's registration, then validate it, rolling the
//! entry back on any failure. The returned [`PluginHandle`] stands in for
//! the open library handle; dropping it is the unload.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::algorithm::{PursuitPlayer, PursuitTank};
use crate::game::Engine;
use crate::tournament::registrar::{Registrar, RegistrarError};

/// Registration hook run while a plugin "loads": it installs factories on
/// the registrar's newest entry.
pub type RegistrationFn = Arc<dyn Fn(&Registrar) -> Result<(), RegistrarError> + Send + Sync>;

/// The built-in pursuit algorithm's plugin name.
pub const PURSUIT_PLUGIN: &str = "pursuit";
/// The built-in game manager's plugin name.
pub const STANDARD_GM_PLUGIN: &str = "standard";

/// Why a plugin failed to load.
#[derive(Debug)]
pub enum PluginError {
    /// The path has no usable file stem.
    BadPath(String),
    /// No registration is known for the file stem.
    UnknownPlugin(String),
    /// The plugin's registration was rejected.
    Registration(RegistrarError),
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::BadPath(path) => write!(f, "not a loadable plugin path: {path}"),
            PluginError::UnknownPlugin(name) => write!(f, "no plugin registered as '{name}'"),
            PluginError::Registration(e) => write!(f, "plugin registration failed: {e}"),
        }
    }
}

impl std::error::Error for PluginError {}

impl From<RegistrarError> for PluginError {
    fn from(e: RegistrarError) -> Self {
        PluginError::Registration(e)
    }
}

/// A loaded plugin. Dropping the handle is the unload.
#[derive(Debug)]
pub struct PluginHandle {
    name: String,
}

impl PluginHandle {
    /// The plugin's registrar name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The table of loadable plugins.
pub struct PluginLibrary {
    algorithms: HashMap<String, RegistrationFn>,
    game_managers: HashMap<String, RegistrationFn>,
}

impl PluginLibrary {
    /// An empty library.
    #[must_use]
    pub fn new() -> Self {
        Self {
            algorithms: HashMap::new(),
            game_managers: HashMap::new(),
        }
    }

    /// The library with the built-in plugins installed: the pursuit
    /// algorithm and the standard game manager.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut library = Self::new();
        library.register_algorithm(
            PURSUIT_PLUGIN,
            Arc::new(|registrar: &Registrar| {
                registrar.set_player_factory(Arc::new(|owner, cols, rows, max_steps, shells| {
                    Box::new(PursuitPlayer::new(owner, cols, rows, max_steps, shells))
                }))?;
                registrar.set_tank_factory(Arc::new(|owner, tank_index| {
                    Box::new(PursuitTank::new(owner, tank_index))
                }))?;
                Ok(())
            }),
        );
        library.register_game_manager(
            STANDARD_GM_PLUGIN,
            Arc::new(|registrar: &Registrar| {
                registrar.set_gm_factory(Arc::new(|verbose| Box::new(Engine::new(verbose))))
            }),
        );
        library
    }

    /// Install (or replace) an algorithm registration.
    pub fn register_algorithm(&mut self, name: &str, registration: RegistrationFn) {
        self.algorithms.insert(name.to_string(), registration);
    }

    /// Install (or replace) a game-manager registration.
    pub fn register_game_manager(&mut self, name: &str, registration: RegistrationFn) {
        self.game_managers.insert(name.to_string(), registration);
    }

    /// Resolve a file stem against the table.
    ///
    /// An exact name match wins; otherwise the longest registered name that
    /// prefixes the stem is used, so renamed copies of a plugin file
    /// (`pursuit_a.so`, `pursuit_b.so`) still resolve.
    fn resolve<'a>(
        table: &'a HashMap<String, RegistrationFn>,
        stem: &str,
    ) -> Option<&'a RegistrationFn> {
        if let Some(registration) = table.get(stem) {
            return Some(registration);
        }
        table
            .iter()
            .filter(|(name, _)| stem.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, registration)| registration)
    }

    fn stem_of(path: &Path) -> Result<String, PluginError> {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PluginError::BadPath(path.display().to_string()))
    }

    /// Load an algorithm plugin into `registrar`.
    ///
    /// # Errors
    ///
    /// On any failure the partially created registrar entry is rolled back
    /// and the error returned; the registrar is left as it was.
    pub fn load_algorithm(
        &self,
        path: &Path,
        registrar: &Registrar,
    ) -> Result<PluginHandle, PluginError> {
        let stem = Self::stem_of(path)?;
        registrar.create_entry(&stem);

        let Some(registration) = Self::resolve(&self.algorithms, &stem) else {
            registrar.remove_last();
            return Err(PluginError::UnknownPlugin(stem));
        };
        if let Err(e) = registration(registrar) {
            registrar.remove_last();
            return Err(e.into());
        }
        if let Err(e) = registrar.validate_last_algorithm() {
            registrar.remove_last();
            return Err(e.into());
        }

        debug!("loaded algorithm plugin '{stem}' from {}", path.display());
        Ok(PluginHandle { name: stem })
    }

    /// Load a game-manager plugin into `registrar`.
    ///
    /// # Errors
    ///
    /// On any failure the partially created registrar entry is rolled back
    /// and the error returned; the registrar is left as it was.
    pub fn load_game_manager(
        &self,
        path: &Path,
        registrar: &Registrar,
    ) -> Result<PluginHandle, PluginError> {
        let stem = Self::stem_of(path)?;
        registrar.create_entry(&stem);

        let Some(registration) = Self::resolve(&self.game_managers, &stem) else {
            registrar.remove_last();
            return Err(PluginError::UnknownPlugin(stem));
        };
        if let Err(e) = registration(registrar) {
            registrar.remove_last();
            return Err(e.into());
        }
        if let Err(e) = registrar.validate_last_game_manager() {
            registrar.remove_last();
            return Err(e.into());
        }

        debug!("loaded game-manager plugin '{stem}' from {}", path.display());
        Ok(PluginHandle { name: stem })
    }
}

impl Default for PluginLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_builtin_algorithm() {
        let library = PluginLibrary::with_builtins();
        let registrar = Registrar::new();
        let handle = library
            .load_algorithm(&PathBuf::from("/plugins/pursuit.so"), &registrar)
            .unwrap();
        assert_eq!(handle.name(), "pursuit");
        assert_eq!(registrar.count(), 1);
        assert!(registrar.entry("pursuit").unwrap().has_tank_factory());
    }

    #[test]
    fn test_renamed_copy_resolves_by_prefix() {
        let library = PluginLibrary::with_builtins();
        let registrar = Registrar::new();
        let handle = library
            .load_algorithm(&PathBuf::from("pursuit_b.so"), &registrar)
            .unwrap();
        // The entry keeps the file's own stem, as two copies must stay
        // distinguishable.
        assert_eq!(handle.name(), "pursuit_b");
        assert!(registrar.entry("pursuit_b").is_some());
    }

    #[test]
    fn test_unknown_plugin_rolls_back() {
        let library = PluginLibrary::with_builtins();
        let registrar = Registrar::new();
        let err = library
            .load_algorithm(&PathBuf::from("mystery.so"), &registrar)
            .unwrap_err();
        assert!(matches!(err, PluginError::UnknownPlugin(_)));
        assert_eq!(registrar.count(), 0);
    }

    #[test]
    fn test_incomplete_registration_rolls_back() {
        let mut library = PluginLibrary::new();
        // A bad plugin that only installs half of what an algorithm needs.
        library.register_algorithm(
            "half",
            Arc::new(|registrar: &Registrar| {
                registrar.set_tank_factory(Arc::new(|owner, tank_index| {
                    Box::new(crate::algorithm::PursuitTank::new(owner, tank_index))
                }))
            }),
        );
        let registrar = Registrar::new();
        let err = library
            .load_algorithm(&PathBuf::from("half.so"), &registrar)
            .unwrap_err();
        assert!(matches!(err, PluginError::Registration(_)));
        assert_eq!(registrar.count(), 0);
    }

    #[test]
    fn test_gm_plugin_is_not_an_algorithm() {
        let library = PluginLibrary::with_builtins();
        let registrar = Registrar::new();
        let err = library
            .load_algorithm(&PathBuf::from("standard.so"), &registrar)
            .unwrap_err();
        assert!(matches!(err, PluginError::UnknownPlugin(_)));
        assert_eq!(registrar.count(), 0);
    }
}
