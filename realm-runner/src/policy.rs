use anyhow::{anyhow, Result};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use realm_core::action::{ActionSpaceShape, ActionTensor};
use realm_core::agent::AgentObservation;
use realm_core::scenario::Scenario;

/// Range random continuous actions are drawn from
const CONTINUOUS_LOW: f32 = -1.0;
const CONTINUOUS_HIGH: f32 = 1.0;

/// Trait for action selection policies
pub trait Policy {
    /// Select the actions for the next step given the latest observation
    fn select_action(
        &mut self,
        scenario: &dyn Scenario,
        observation: &AgentObservation,
    ) -> Result<ActionTensor>;

    fn name(&self) -> &'static str;
}

/// Random policy that samples every branch uniformly at random
pub struct RandomPolicy {
    rng: ChaCha20Rng,
    shape: ActionSpaceShape,
}

impl RandomPolicy {
    pub fn with_seed(shape: ActionSpaceShape, seed: u64) -> Result<Self> {
        if shape.branches.iter().any(|&size| size == 0) {
            return Err(anyhow!("Discrete action branches must all have size > 0"));
        }
        Ok(Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            shape,
        })
    }
}

impl Policy for RandomPolicy {
    fn select_action(
        &mut self,
        _scenario: &dyn Scenario,
        _observation: &AgentObservation,
    ) -> Result<ActionTensor> {
        let continuous = (0..self.shape.continuous)
            .map(|_| self.rng.gen_range(CONTINUOUS_LOW..CONTINUOUS_HIGH))
            .collect();
        let mut discrete = Vec::with_capacity(self.shape.branches.len());
        for &size in &self.shape.branches {
            let size = i32::try_from(size)
                .map_err(|_| anyhow!("Discrete branch of size {} is too large", size))?;
            discrete.push(self.rng.gen_range(0..size));
        }
        Ok(ActionTensor::new(continuous, discrete))
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Replays the scenario's scripted controls
#[derive(Debug, Default)]
pub struct HeuristicPolicy;

impl Policy for HeuristicPolicy {
    fn select_action(
        &mut self,
        scenario: &dyn Scenario,
        _observation: &AgentObservation,
    ) -> Result<ActionTensor> {
        Ok(scenario.heuristic())
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use realm_arena::{Arena, ArenaConfig};

    fn arena() -> Arena {
        Arena::new(ArenaConfig::default()).unwrap()
    }

    #[test]
    fn test_random_policy_respects_shape() {
        let scenario = arena();
        let shape = ActionSpaceShape {
            continuous: 2,
            branches: vec![2, 3, 4],
        };
        let mut policy = RandomPolicy::with_seed(shape, 42).unwrap();

        for _ in 0..10 {
            let action = policy
                .select_action(&scenario, &AgentObservation::default())
                .unwrap();
            assert_eq!(action.continuous.len(), 2);
            assert_eq!(action.discrete.len(), 3);
            for value in &action.continuous {
                assert!(*value >= -1.0 && *value < 1.0);
            }
            assert!(action.discrete[0] < 2);
            assert!(action.discrete[1] < 3);
            assert!(action.discrete[2] < 4);
            assert!(action.discrete.iter().all(|&v| v >= 0));
        }
    }

    #[test]
    fn test_random_policy_is_deterministic_per_seed() {
        let scenario = arena();
        let shape = scenario.agent_spec().actions;
        let mut a = RandomPolicy::with_seed(shape.clone(), 7).unwrap();
        let mut b = RandomPolicy::with_seed(shape, 7).unwrap();
        let observation = AgentObservation::default();

        for _ in 0..5 {
            assert_eq!(
                a.select_action(&scenario, &observation).unwrap(),
                b.select_action(&scenario, &observation).unwrap()
            );
        }
    }

    #[test]
    fn test_random_policy_rejects_empty_branch() {
        let shape = ActionSpaceShape {
            continuous: 0,
            branches: vec![2, 0],
        };
        assert!(RandomPolicy::with_seed(shape, 1).is_err());
    }

    #[test]
    fn test_heuristic_policy_matches_scenario() {
        let mut scenario = arena();
        let observation = scenario.reset(3).unwrap();
        let mut policy = HeuristicPolicy;

        let action = policy.select_action(&scenario, &observation).unwrap();
        assert_eq!(action, scenario.heuristic());
        assert_eq!(policy.name(), "heuristic");
    }

    proptest! {
        #[test]
        fn prop_random_actions_fit_any_shape(
            continuous in 0usize..6,
            branches in prop::collection::vec(1usize..8, 0..5),
            seed in any::<u64>(),
        ) {
            let scenario = arena();
            let shape = ActionSpaceShape { continuous, branches: branches.clone() };
            let mut policy = RandomPolicy::with_seed(shape, seed).unwrap();
            let action = policy.select_action(&scenario, &AgentObservation::default()).unwrap();

            prop_assert_eq!(action.continuous.len(), continuous);
            prop_assert_eq!(action.discrete.len(), branches.len());
            for (value, size) in action.discrete.iter().zip(&branches) {
                prop_assert!(*value >= 0 && (*value as usize) < *size);
            }
        }
    }
}
