use anyhow::{anyhow, Result};
use realm_core::agent::SensorOutput;
use realm_core::registry::create_scenario;
use realm_core::scenario::Scenario;
use tracing::{debug, error, info};

use crate::config::{Config, PolicyKind};
use crate::policy::{HeuristicPolicy, Policy, RandomPolicy};

/// Outcome of a single episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub seed: u64,
    pub steps: u32,
    pub total_reward: f32,
    /// Whether the scenario ended the episode, as opposed to the step cap
    pub finished: bool,
}

pub struct Runner {
    config: Config,
    scenario: Box<dyn Scenario>,
    policy: Box<dyn Policy>,
}

impl Runner {
    /// Create the configured scenario from the registry
    pub fn new(config: Config) -> Result<Self> {
        let scenario = create_scenario(&config.env_id)
            .map_err(|e| anyhow!("Failed to create scenario {}: {}", config.env_id, e))?;
        Self::with_scenario(config, scenario)
    }

    pub fn with_scenario(config: Config, scenario: Box<dyn Scenario>) -> Result<Self> {
        let spec = scenario.agent_spec();
        let policy: Box<dyn Policy> = match config.policy {
            PolicyKind::Random => Box::new(
                RandomPolicy::with_seed(spec.actions.clone(), config.seed)
                    .map_err(|e| anyhow!("Failed to create policy: {}", e))?,
            ),
            PolicyKind::Heuristic => Box::new(HeuristicPolicy),
        };

        let id = scenario.scenario_id();
        info!(
            "Runner initialized for scenario {} ({}) with {} policy",
            id.scenario_id,
            id.build_id,
            policy.name()
        );
        for sensor in &spec.observations {
            info!(
                "Sensor {}: shape {:?}, compression {:?}",
                sensor.name, sensor.shape, sensor.compression
            );
        }
        info!(
            "Action space: {} continuous, branches {:?}",
            spec.actions.continuous, spec.actions.branches
        );

        Ok(Self {
            config,
            scenario,
            policy,
        })
    }

    /// Run every configured episode and return their summaries
    pub fn run(&mut self) -> Result<Vec<EpisodeSummary>> {
        let mut summaries = Vec::with_capacity(self.config.episodes as usize);

        for episode in 0..self.config.episodes {
            match self.run_episode(episode) {
                Ok(summary) => {
                    info!(
                        "Episode {} (seed {}): {} steps, reward {:.3}{}",
                        summary.episode + 1,
                        summary.seed,
                        summary.steps,
                        summary.total_reward,
                        if summary.finished { "" } else { ", step cap reached" }
                    );
                    summaries.push(summary);
                }
                Err(e) => {
                    error!("Episode {} failed: {}", episode + 1, e);
                    return Err(e);
                }
            }
        }

        if !summaries.is_empty() {
            let mean = summaries.iter().map(|s| s.total_reward).sum::<f32>() / summaries.len() as f32;
            let steps: u32 = summaries.iter().map(|s| s.steps).sum();
            info!(
                "Completed {} episodes, {} steps, mean reward {:.3}",
                summaries.len(),
                steps,
                mean
            );
        }

        Ok(summaries)
    }

    fn run_episode(&mut self, episode: u32) -> Result<EpisodeSummary> {
        let seed = self.config.episode_seed(episode);
        let mut observation = self.scenario.reset(seed)?;

        let mut steps = 0;
        let mut total_reward = 0.0;
        let mut finished = false;

        while steps < self.config.max_steps {
            let actions = self.policy.select_action(self.scenario.as_ref(), &observation)?;
            let outcome = self.scenario.step(&actions)?;

            total_reward += outcome.reward;
            steps += 1;
            observation = outcome.observation;

            if outcome.done {
                finished = true;
                break;
            }
        }

        let compressed_bytes: usize = observation
            .sensors
            .iter()
            .map(|sensor| match &sensor.output {
                SensorOutput::Compressed(bytes) => bytes.len(),
                SensorOutput::Raw(_) => 0,
            })
            .sum();
        debug!(
            "Episode {} final observation: {} sensors, {} compressed bytes",
            episode + 1,
            observation.sensors.len(),
            compressed_bytes
        );

        if self.config.show_grid {
            if let Some(view) = self.scenario.render_grid() {
                info!("Episode {} final grid:\n{}", episode + 1, view);
            }
        }

        Ok(EpisodeSummary {
            episode,
            seed,
            steps,
            total_reward,
            finished,
        })
    }
}
