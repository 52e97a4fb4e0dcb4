//! Object-safe scenario interface
//!
//! A scenario owns a game world plus one [`crate::agent::RealmAgent`] and
//! exposes episodes through a uniform interface, so tooling can drive any
//! registered game by id without knowing its collider or state types.
//!
//! # Example Usage
//!
//! ```rust
//! # use realm_core::scenario::*;
//! # use realm_core::error::ScenarioError;
//! fn run_heuristic(scenario: &mut dyn Scenario, seed: u64) -> Result<f32, ScenarioError> {
//!     scenario.reset(seed)?;
//!     let mut total = 0.0;
//!     loop {
//!         let actions = scenario.heuristic();
//!         let outcome = scenario.step(&actions)?;
//!         total += outcome.reward;
//!         if outcome.done {
//!             return Ok(total);
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::action::ActionTensor;
use crate::agent::{AgentObservation, AgentSpec};
use crate::error::ScenarioError;

/// Scenario identification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioId {
    /// Registry key, e.g. "arena"
    pub scenario_id: String,
    pub build_id: String,
}

/// Result of one decision step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: AgentObservation,
    pub reward: f32,
    pub done: bool,
}

pub trait Scenario {
    fn scenario_id(&self) -> ScenarioId;

    /// Declared observation and action shapes, fixed for the scenario's
    /// lifetime
    fn agent_spec(&self) -> AgentSpec;

    /// Start a new episode, deterministic for a given `seed`
    fn reset(&mut self, seed: u64) -> Result<AgentObservation, ScenarioError>;

    /// Apply `actions`, advance the simulation and observe the result
    ///
    /// # Errors
    ///
    /// Returns `ScenarioError` if the tensor does not match the declared
    /// action shape, the episode has not been reset, or an observation cannot
    /// be encoded.
    fn step(&mut self, actions: &ActionTensor) -> Result<StepOutcome, ScenarioError>;

    /// Actions a scripted player would take in the current state
    fn heuristic(&self) -> ActionTensor;

    /// Text view of the agent's perception grid, if it has one
    fn render_grid(&self) -> Option<String> {
        None
    }
}
