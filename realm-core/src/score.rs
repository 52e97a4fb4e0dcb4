//! Reward shaping on top of the game's own score
//!
//! The game reports its score through a getter. [`ScoreKeeper`] adds reward
//! regions (a one-off reward on first entry and a per-second reward for
//! staying) and an existential penalty per second. The agent turns the total
//! into per-step rewards by differencing.

use serde::{Deserialize, Serialize};

use crate::callback::Getter;
use crate::geometry::{Rect, Vec2};

/// Stay rewards smaller than this are treated as absent
const STAY_REWARD_EPSILON: f32 = 1e-6;

/// Area of the map that rewards the agent for reaching or occupying it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardRegion {
    pub enabled: bool,
    /// The region covers the union of these rectangles
    pub rects: Vec<Rect>,
    /// Reward granted once, on first entry in an episode
    pub enter_reward: f32,
    /// Reward per second while inside, after the first entry
    pub stay_reward_per_second: f32,
}

impl Default for RewardRegion {
    fn default() -> Self {
        Self {
            enabled: true,
            rects: Vec::new(),
            enter_reward: 0.0,
            stay_reward_per_second: 0.0,
        }
    }
}

impl RewardRegion {
    pub fn contains(&self, position: Vec2) -> bool {
        self.rects.iter().any(|rect| rect.contains(position))
    }
}

/// Accumulates the shaped score for one agent
#[derive(Debug, Default)]
pub struct ScoreKeeper {
    reward_fn: Getter<f32>,
    regions: Vec<RewardRegion>,
    existential_penalty_per_second: f32,
    entered: Vec<bool>,
    base_score: f32,
    additional_score: f32,
}

impl ScoreKeeper {
    pub fn new(reward_fn: Getter<f32>, regions: Vec<RewardRegion>, existential_penalty_per_second: f32) -> Self {
        let entered = vec![false; regions.len()];
        Self {
            reward_fn,
            regions,
            existential_penalty_per_second,
            entered,
            base_score: 0.0,
            additional_score: 0.0,
        }
    }

    pub fn regions(&self) -> &[RewardRegion] {
        &self.regions
    }

    pub fn start_new_episode(&mut self) {
        self.base_score = 0.0;
        self.additional_score = 0.0;
        self.entered.fill(false);
    }

    /// Game score plus shaping
    ///
    /// When the reward getter is unbound the last known game score is used.
    pub fn score(&mut self) -> f32 {
        if let Some(base) = self.reward_fn.get() {
            self.base_score = base;
        }
        self.base_score + self.additional_score
    }

    /// Shaping accumulated on top of the game score
    pub fn additional_score(&self) -> f32 {
        self.additional_score
    }

    /// Advance shaping by `dt` seconds with the agent at `position`
    pub fn fixed_update(&mut self, position: Vec2, dt: f32) {
        self.additional_score -= self.existential_penalty_per_second * dt;

        for (region, entered) in self.regions.iter().zip(self.entered.iter_mut()) {
            if !region.enabled {
                continue;
            }
            if *entered && region.stay_reward_per_second.abs() < STAY_REWARD_EPSILON {
                continue;
            }
            if !region.contains(position) {
                continue;
            }

            if *entered {
                self.additional_score += region.stay_reward_per_second * dt;
            } else {
                self.additional_score += region.enter_reward;
                *entered = true;
            }
        }
    }
}
