//! Scenario registry
//!
//! Process-global map from scenario id to factory function. Scenario crates
//! register themselves at startup; tooling creates instances by id.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use tracing::warn;

use crate::error::ScenarioError;
use crate::scenario::Scenario;

/// Factory function type for creating scenario instances
pub type ScenarioFactory = fn() -> Result<Box<dyn Scenario>, ScenarioError>;

static REGISTRY: Lazy<Mutex<HashMap<String, ScenarioFactory>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn registry() -> MutexGuard<'static, HashMap<String, ScenarioFactory>> {
    // The map is never left half-updated, so a poisoned lock is still usable
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register a scenario with the global registry
///
/// Registering an id twice replaces the earlier factory.
///
/// # Arguments
///
/// * `scenario_id` - Unique scenario identifier (e.g., "arena")
/// * `factory` - Function that creates new instances of the scenario
pub fn register_scenario(scenario_id: String, factory: ScenarioFactory) {
    let mut registry = registry();
    if registry.contains_key(&scenario_id) {
        warn!("Overriding existing scenario registration for '{}'", scenario_id);
    }
    registry.insert(scenario_id, factory);
}

/// Create a new scenario instance by id
///
/// # Errors
///
/// Returns `ScenarioError::UnknownScenario` if the id is not registered, or
/// whatever error the factory reports.
pub fn create_scenario(scenario_id: &str) -> Result<Box<dyn Scenario>, ScenarioError> {
    // Copy the fn pointer out so the factory runs without holding the lock
    let factory = registry().get(scenario_id).copied();
    match factory {
        Some(factory) => factory(),
        None => Err(ScenarioError::UnknownScenario(scenario_id.to_string())),
    }
}

/// All registered scenario ids, sorted
pub fn list_registered_scenarios() -> Vec<String> {
    let mut ids: Vec<String> = registry().keys().cloned().collect();
    ids.sort();
    ids
}

pub fn is_registered(scenario_id: &str) -> bool {
    registry().contains_key(scenario_id)
}

/// Clear all registered scenarios (mainly for testing)
pub fn clear_registry() {
    registry().clear();
}

/// Convenience macro for registering scenarios that implement `Default`
///
/// # Example
///
/// ```ignore
/// register_scenario!(Arena, "arena");
/// ```
#[macro_export]
macro_rules! register_scenario {
    ($scenario_type:ty, $scenario_id:expr) => {{
        fn factory() -> Result<Box<dyn $crate::scenario::Scenario>, $crate::error::ScenarioError> {
            Ok(Box::new(<$scenario_type>::default()))
        }
        $crate::registry::register_scenario($scenario_id.to_string(), factory);
    }};
}
