//! Scenario registry initialization
//!
//! Registers every scenario compiled into the runner.

use realm_core::registry::list_registered_scenarios;
use tracing::info;

/// Initialize the scenario registry with all available scenarios
///
/// Must be called before any scenario is created by id.
pub fn initialize_registry() {
    realm_arena::register();

    info!("Registered scenarios: {:?}", list_registered_scenarios());
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_core::registry::{create_scenario, is_registered};

    #[test]
    fn test_arena_is_registered() {
        initialize_registry();

        assert!(is_registered(realm_arena::SCENARIO_ID));
        let scenario = create_scenario(realm_arena::SCENARIO_ID).unwrap();
        assert_eq!(scenario.scenario_id().scenario_id, "arena");
    }
}
