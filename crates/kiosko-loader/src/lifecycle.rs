//! Per-module load state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, warn};

/// Load state of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// Known but not loaded.
    Registered,
    /// A load is in progress.
    Loading,
    /// Loaded and initialized; the instance is registered.
    Ready,
    /// The last load failed. A new load starts from scratch.
    Failed,
}

impl ModuleState {
    /// Checks if the module can transition to the given state.
    #[must_use]
    #[allow(clippy::match_same_arms)] // One arm per transition rule
    pub fn can_transition_to(&self, to: Self) -> bool {
        match (self, to) {
            (Self::Registered, Self::Loading) => true,
            // A markup-only load registers nothing and returns to Registered
            (Self::Loading, Self::Ready | Self::Failed | Self::Registered) => true,
            (Self::Failed, Self::Loading) => true,
            // Unload
            (Self::Ready, Self::Registered) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }
}

/// Tracks the load state of every module the manager has seen.
///
/// The lock is never held across an await, so transitions can also be made
/// from drop guards.
pub struct ModuleLifecycle {
    states: Arc<RwLock<HashMap<String, ModuleState>>>,
}

impl fmt::Debug for ModuleLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLifecycle")
            .field("module_count", &self.states.try_read().map(|s| s.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl ModuleLifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self { states: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Current state of `module`; untracked modules are `Registered`.
    pub fn get_state(&self, module: &str) -> ModuleState {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states.get(module).copied().unwrap_or(ModuleState::Registered)
    }

    /// Moves `module` to `new_state`.
    ///
    /// # Returns
    /// Returns `Ok` with the previous state if the transition is valid, or
    /// `Err` with the current state if it is not.
    pub fn set_state(&self, module: &str, new_state: ModuleState) -> Result<ModuleState, ModuleState> {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        let current = states.get(module).copied().unwrap_or(ModuleState::Registered);

        if !current.can_transition_to(new_state) {
            error!(module = %module, from = ?current, to = ?new_state, "Invalid state transition");
            return Err(current);
        }

        debug!(module = %module, from = ?current, to = ?new_state, "State transition");
        states.insert(module.to_string(), new_state);
        Ok(current)
    }

    /// Marks `module` failed if it is still `Loading`.
    ///
    /// # Returns
    /// Returns `true` if the state changed.
    pub fn abandon(&self, module: &str) -> bool {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        let Some(state) = states.get_mut(module) else {
            return false;
        };
        if *state != ModuleState::Loading {
            return false;
        }
        *state = ModuleState::Failed;
        warn!(module = %module, "Load abandoned before completion");
        true
    }

    /// Modules currently in `state`, sorted.
    pub fn modules_in(&self, state: ModuleState) -> Vec<String> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        let mut modules: Vec<String> =
            states.iter().filter(|(_, s)| **s == state).map(|(name, _)| name.clone()).collect();
        modules.sort();
        modules
    }
}

impl Default for ModuleLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
