//! Coin-collecting arena for the Realm codec
//!
//! This crate provides a small reference scenario that wires every codec
//! feature through typed callbacks: a walled room with coins to collect and
//! lava to avoid, perceived through a one-hot PNG grid and a vector sensor,
//! and controlled through a continuous move vector plus a sprint toggle.

pub mod world;

use std::cell::RefCell;
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use realm_core::action::{ActionSpec, ActionTensor, Actuator};
use realm_core::agent::{AgentObservation, AgentSpec, RealmAgent};
use realm_core::callback::{Getter, Invoker, Setter};
use realm_core::compression::CompressionType;
use realm_core::error::ScenarioError;
use realm_core::geometry::{Rect, Vec2};
use realm_core::grid::{GridEncoding, GridSensor, GridSpec};
use realm_core::observation::{ObservationSpec, VectorSensor};
use realm_core::registry::register_scenario;
use realm_core::scenario::{Scenario, ScenarioId, StepOutcome};
use realm_core::score::{RewardRegion, ScoreKeeper};
use realm_core::spatial::{EntityId, LayerMask};

use crate::world::{
    ArenaCollider, ArenaWorld, AGENT_LAYER, COIN_TAG, HAZARD_LAYER, LAVA_TAG, PICKUP_LAYER, PLAYER_TAG,
    STATIC_LAYER, WALL_TAG,
};

/// Registry key of the arena scenario
pub const SCENARIO_ID: &str = "arena";

/// Heuristic sprints toward coins farther away than this
const SPRINT_DISTANCE: f32 = 2.0;
/// Nothing spawns closer than this to the player start
const START_CLEARANCE: f32 = 2.0;
const PLACEMENT_ATTEMPTS: usize = 32;

/// Arena layout and tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Room size in world units; the room spans `(0, 0)..(width, height)`
    pub width: f32,
    pub height: f32,
    pub coin_count: usize,
    pub lava_count: usize,
    pub max_steps: u32,
    /// Simulated seconds per decision step
    pub time_step: f32,
    pub move_speed: f32,
    pub sprint_multiplier: f32,
    pub player_size: f32,
    pub coin_size: f32,
    pub lava_size: f32,
    pub coin_reward: f32,
    pub goal: RewardRegion,
    pub existential_penalty_per_second: f32,
    pub grid: GridSpec,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 24.0,
            height: 24.0,
            coin_count: 6,
            lava_count: 3,
            max_steps: 400,
            time_step: 0.1,
            move_speed: 3.0,
            sprint_multiplier: 1.8,
            player_size: 0.8,
            coin_size: 0.5,
            lava_size: 2.0,
            coin_reward: 1.0,
            goal: RewardRegion {
                rects: vec![Rect::new(21.0, 21.0, 3.0, 3.0)],
                enter_reward: 0.5,
                ..RewardRegion::default()
            },
            existential_penalty_per_second: 0.01,
            grid: GridSpec::new(20, 20, Vec2::new(1.0, 1.0))
                .with_tags([WALL_TAG, COIN_TAG, LAVA_TAG])
                .with_encoding(GridEncoding::OneHot)
                .with_compression(CompressionType::Png),
        }
    }
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let clearance = 2.0 * (START_CLEARANCE + 1.0);
        if !(self.width >= clearance && self.height >= clearance) {
            return Err(ScenarioError::InvalidSettings(format!(
                "room must be at least {}x{}, got {}x{}",
                clearance, clearance, self.width, self.height
            )));
        }

        if self.coin_count == 0 {
            return Err(ScenarioError::InvalidSettings(
                "coin_count must be greater than 0".to_string(),
            ));
        }

        if self.max_steps == 0 {
            return Err(ScenarioError::InvalidSettings(
                "max_steps must be greater than 0".to_string(),
            ));
        }

        if !(self.time_step > 0.0) {
            return Err(ScenarioError::InvalidSettings(
                "time_step must be greater than 0".to_string(),
            ));
        }

        for (name, size) in [
            ("player_size", self.player_size),
            ("coin_size", self.coin_size),
            ("lava_size", self.lava_size),
        ] {
            if !(size > 0.0) {
                return Err(ScenarioError::InvalidSettings(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        self.grid.validate()?;
        Ok(())
    }

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    fn start(&self) -> Vec2 {
        self.bounds().center()
    }
}

/// Game state shared with the agent's callbacks
#[derive(Debug, Default)]
struct ArenaState {
    position: Vec2,
    velocity: Vec2,
    move_command: Vec2,
    sprint_command: bool,
    /// Remaining coins and their centers
    coins: Vec<(EntityId, Vec2)>,
    coins_collected: i32,
    in_lava: bool,
    steps: u32,
}

impl ArenaState {
    fn nearest_coin(&self) -> Option<Vec2> {
        self.coins
            .iter()
            .map(|&(_, center)| center)
            .min_by(|a, b| {
                let da = (*a - self.position).length_squared();
                let db = (*b - self.position).length_squared();
                da.total_cmp(&db)
            })
    }

    /// Unit direction toward the nearest remaining coin
    fn heuristic_direction(&self) -> Vec2 {
        let Some(coin) = self.nearest_coin() else {
            return Vec2::ZERO;
        };
        let offset = coin - self.position;
        let length = offset.length();
        if length < 1e-6 {
            Vec2::ZERO
        } else {
            offset * (1.0 / length)
        }
    }

    fn heuristic_sprint(&self) -> bool {
        self.nearest_coin()
            .map(|coin| (coin - self.position).length() > SPRINT_DISTANCE)
            .unwrap_or(false)
    }
}

/// Getter reading one value out of the shared state
fn read<T: 'static>(state: &Rc<RefCell<ArenaState>>, f: fn(&ArenaState) -> T) -> Getter<T> {
    let state = Rc::clone(state);
    Getter::new(move || f(&state.borrow()))
}

fn square(center: Vec2, size: f32) -> Rect {
    Rect::from_center(center, Vec2::new(size * 0.5, size * 0.5))
}

/// Coin-collecting arena scenario
pub struct Arena {
    config: ArenaConfig,
    world: ArenaWorld,
    state: Rc<RefCell<ArenaState>>,
    score: Rc<RefCell<ScoreKeeper>>,
    agent: RealmAgent<ArenaCollider>,
    player: EntityId,
    rng: ChaCha20Rng,
    started: bool,
    finished: bool,
}

impl Arena {
    /// Create an arena; [`Scenario::reset`] must be called before stepping
    pub fn new(config: ArenaConfig) -> Result<Self, ScenarioError> {
        config.validate()?;

        let state = Rc::new(RefCell::new(ArenaState::default()));

        let coin_reward = config.coin_reward;
        let coins = Rc::clone(&state);
        let score = Rc::new(RefCell::new(ScoreKeeper::new(
            Getter::new(move || coins.borrow().coins_collected as f32 * coin_reward),
            vec![config.goal.clone()],
            config.existential_penalty_per_second,
        )));

        let mut world = ArenaWorld::new();
        let player = world.spawn(PLAYER_TAG, AGENT_LAYER, square(config.start(), config.player_size));

        let agent = Self::build_agent(&config, player, &state, &score)?;

        Ok(Self {
            config,
            world,
            state,
            score,
            agent,
            player,
            rng: ChaCha20Rng::seed_from_u64(0),
            started: false,
            finished: false,
        })
    }

    fn build_agent(
        config: &ArenaConfig,
        player: EntityId,
        state: &Rc<RefCell<ArenaState>>,
        score: &Rc<RefCell<ScoreKeeper>>,
    ) -> Result<RealmAgent<ArenaCollider>, ScenarioError> {
        let vector = VectorSensor::new(
            read(state, |s| s.position),
            config.bounds(),
            vec![
                ObservationSpec::int(
                    "coins",
                    read(state, |s| s.coins_collected),
                    0,
                    config.coin_count as i32,
                ),
                ObservationSpec::bool("sprinting", read(state, |s| s.sprint_command)),
                ObservationSpec::vector2("velocity", read(state, |s| s.velocity)),
            ],
        )?;

        let move_state = Rc::clone(state);
        let sprint_state = Rc::clone(state);
        let actuator = Actuator::new(vec![
            ActionSpec::vector2(
                "move",
                Setter::new(move |v: Vec2| move_state.borrow_mut().move_command = v.clamp_length(1.0)),
                read(state, ArenaState::heuristic_direction),
            ),
            ActionSpec::bool(
                "sprint",
                Setter::new(move |on: bool| sprint_state.borrow_mut().sprint_command = on),
                read(state, ArenaState::heuristic_sprint),
            ),
        ]);

        let max_steps = config.max_steps;
        let over_state = Rc::clone(state);
        let reward_score = Rc::clone(score);
        let reset_score = Rc::clone(score);

        Ok(RealmAgent::new(player, read(state, |s| s.position), vector, actuator)
            .with_grid(GridSensor::new(config.grid.clone())?)
            .with_reward(Getter::new(move || reward_score.borrow_mut().score()))
            .with_game_over(Getter::new(move || {
                let state = over_state.borrow();
                state.in_lava || state.coins.is_empty() || state.steps >= max_steps
            }))
            .on_reset(Invoker::new(move || reset_score.borrow_mut().start_new_episode())))
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn world(&self) -> &ArenaWorld {
        &self.world
    }

    pub fn player(&self) -> EntityId {
        self.player
    }

    pub fn player_position(&self) -> Vec2 {
        self.state.borrow().position
    }

    pub fn coins_collected(&self) -> i32 {
        self.state.borrow().coins_collected
    }

    pub fn coins_remaining(&self) -> usize {
        self.state.borrow().coins.len()
    }

    /// Rebuild walls, lava and coins for a new episode
    fn layout(&mut self) {
        let config = &self.config;
        let (width, height) = (config.width, config.height);
        let start = config.start();

        self.world.clear();
        let player = self
            .world
            .spawn(PLAYER_TAG, AGENT_LAYER, square(start, config.player_size));
        debug_assert_eq!(player, self.player);

        for wall in [
            Rect::new(-1.0, -1.0, width + 2.0, 1.0),
            Rect::new(-1.0, height, width + 2.0, 1.0),
            Rect::new(-1.0, 0.0, 1.0, height),
            Rect::new(width, 0.0, 1.0, height),
        ] {
            self.world.spawn(WALL_TAG, STATIC_LAYER, wall);
        }

        let mut occupied: Vec<Rect> = vec![square(start, 2.0 * START_CLEARANCE)];

        for _ in 0..config.lava_count {
            let bounds = Self::place(&mut self.rng, config, &occupied, config.lava_size);
            occupied.push(bounds);
            self.world.spawn(LAVA_TAG, HAZARD_LAYER, bounds);
        }

        let mut coins = Vec::with_capacity(config.coin_count);
        for _ in 0..config.coin_count {
            let bounds = Self::place(&mut self.rng, config, &occupied, config.coin_size);
            occupied.push(bounds);
            coins.push((self.world.spawn(COIN_TAG, PICKUP_LAYER, bounds), bounds.center()));
        }

        let mut state = self.state.borrow_mut();
        *state = ArenaState {
            position: start,
            coins,
            ..ArenaState::default()
        };
    }

    /// Random square of `size` inside the room, avoiding `occupied` if possible
    fn place(rng: &mut ChaCha20Rng, config: &ArenaConfig, occupied: &[Rect], size: f32) -> Rect {
        let margin = 1.0 + size * 0.5;
        let max_x = (config.width - margin).max(margin + 1e-3);
        let max_y = (config.height - margin).max(margin + 1e-3);
        let mut candidate = Rect::default();
        for _ in 0..PLACEMENT_ATTEMPTS {
            let center = Vec2::new(rng.gen_range(margin..max_x), rng.gen_range(margin..max_y));
            candidate = square(center, size);
            if !occupied.iter().any(|rect| rect.overlaps(&candidate)) {
                break;
            }
        }
        candidate
    }

    fn blocked(&self, center: Vec2) -> bool {
        let body = square(center, self.config.player_size);
        self.world
            .overlapping(body, LayerMask::layer(STATIC_LAYER), self.player)
            .next()
            .is_some()
    }

    /// Advance the physics by one time step
    fn simulate(&mut self) {
        let dt = self.config.time_step;
        let (start, desired) = {
            let state = self.state.borrow();
            let speed = if state.sprint_command {
                self.config.move_speed * self.config.sprint_multiplier
            } else {
                self.config.move_speed
            };
            (state.position, state.move_command.clamp_length(1.0) * speed * dt)
        };

        // Resolve each axis separately so the player slides along walls
        let mut position = start;
        let along_x = Vec2::new(position.x + desired.x, position.y);
        if !self.blocked(along_x) {
            position = along_x;
        }
        let along_y = Vec2::new(position.x, position.y + desired.y);
        if !self.blocked(along_y) {
            position = along_y;
        }
        self.world.move_to(self.player, position);

        let body = square(position, self.config.player_size);
        let collected: Vec<EntityId> = self
            .world
            .overlapping(body, LayerMask::layer(PICKUP_LAYER), self.player)
            .map(|coin| coin.owner)
            .collect();
        let in_lava = self
            .world
            .overlapping(body, LayerMask::layer(HAZARD_LAYER), self.player)
            .next()
            .is_some();
        for coin in &collected {
            self.world.despawn(*coin);
        }

        let mut state = self.state.borrow_mut();
        state.velocity = (position - start) * (1.0 / dt);
        state.position = position;
        state.coins.retain(|(owner, _)| !collected.contains(owner));
        state.coins_collected += collected.len() as i32;
        state.in_lava |= in_lava;
        state.steps += 1;
    }
}

impl Scenario for Arena {
    fn scenario_id(&self) -> ScenarioId {
        ScenarioId {
            scenario_id: SCENARIO_ID.to_string(),
            build_id: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn agent_spec(&self) -> AgentSpec {
        self.agent.agent_spec()
    }

    fn reset(&mut self, seed: u64) -> Result<AgentObservation, ScenarioError> {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
        self.layout();
        self.agent.begin_episode();
        self.started = true;
        self.finished = false;

        info!(
            "Arena reset with seed {}: {} coins, {} lava pools",
            seed, self.config.coin_count, self.config.lava_count
        );

        self.agent.observe(&self.world)
    }

    fn step(&mut self, actions: &ActionTensor) -> Result<StepOutcome, ScenarioError> {
        if !self.started {
            return Err(ScenarioError::NotReset);
        }
        if self.finished {
            return Err(ScenarioError::EpisodeFinished);
        }

        self.agent.act(actions)?;
        self.simulate();

        let position = self.player_position();
        self.score.borrow_mut().fixed_update(position, self.config.time_step);

        let update = self.agent.update(self.config.time_step);
        let observation = self.agent.observe(&self.world)?;

        if update.done {
            self.finished = true;
            let state = self.state.borrow();
            info!(
                "Arena episode {} finished after {} steps: {} coins, lava {}",
                self.agent.episode(),
                state.steps,
                state.coins_collected,
                state.in_lava
            );
        }

        Ok(StepOutcome {
            observation,
            reward: update.reward,
            done: update.done,
        })
    }

    fn heuristic(&self) -> ActionTensor {
        self.agent.heuristic()
    }

    fn render_grid(&self) -> Option<String> {
        self.agent.grid().map(|grid| grid.render_debug())
    }
}

fn arena_factory() -> Result<Box<dyn Scenario>, ScenarioError> {
    Ok(Box::new(Arena::new(ArenaConfig::default())?))
}

/// Register the arena under [`SCENARIO_ID`]
pub fn register() {
    register_scenario(SCENARIO_ID.to_string(), arena_factory);
}
