//! Per-decision-step agent glue
//!
//! [`RealmAgent`] wires the sensors and the actuator of one agent to the
//! game's callbacks and tracks the episode: reward deltas, duration and the
//! game-over flag. A host loop calls, every decision step:
//!
//! 1. [`RealmAgent::observe`] to sample all sensors
//! 2. [`RealmAgent::act`] with the policy's action tensor
//! 3. [`RealmAgent::update`] after the simulation advanced
//!
//! and [`RealmAgent::begin_episode`] whenever an episode starts.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::{ActionSpaceShape, ActionTensor, Actuator};
use crate::callback::{Getter, Invoker};
use crate::compression::{CompressionError, CompressionType, ImageEncoder, PngEncoder};
use crate::error::ScenarioError;
use crate::geometry::Vec2;
use crate::grid::GridSensor;
use crate::observation::VectorSensor;
use crate::sensor::{ObservationShape, Sensor};
use crate::spatial::{Collider, EntityId, SpatialQuery};

/// Reward changes smaller than this are not reported
const REWARD_EPSILON: f32 = 1e-7;

/// Declared observation of one sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
    pub shape: ObservationShape,
    pub compression: CompressionType,
}

/// Everything a trainer must know about an agent before the first step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub observations: Vec<SensorSpec>,
    pub actions: ActionSpaceShape,
}

/// Payload produced by one sensor for one step
#[derive(Debug, Clone, PartialEq)]
pub enum SensorOutput {
    Raw(Vec<f32>),
    Compressed(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorObservation {
    pub name: String,
    pub output: SensorOutput,
}

/// All sensor outputs for one step, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentObservation {
    pub sensors: Vec<SensorObservation>,
}

impl AgentObservation {
    pub fn get(&self, name: &str) -> Option<&SensorOutput> {
        self.sensors
            .iter()
            .find(|sensor| sensor.name == name)
            .map(|sensor| &sensor.output)
    }

    /// Raw floats of `name`, if that sensor delivered uncompressed
    pub fn raw(&self, name: &str) -> Option<&[f32]> {
        match self.get(name)? {
            SensorOutput::Raw(values) => Some(values),
            SensorOutput::Compressed(_) => None,
        }
    }
}

/// Result of advancing the agent by one step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentUpdate {
    /// Change in score since the last reported change
    pub reward: f32,
    pub done: bool,
}

/// One agent's sensors, actuator and episode bookkeeping
///
/// `S` is the collider type of the world the grid sensor samples.
pub struct RealmAgent<S> {
    entity: EntityId,
    position: Getter<Vec2>,
    grid: Option<GridSensor<S>>,
    vector: VectorSensor,
    actuator: Actuator,
    encoder: Box<dyn ImageEncoder>,
    reset: Invoker,
    reward: Getter<f32>,
    game_over: Getter<bool>,
    last_reward: f32,
    episode_duration: f32,
    episode: u64,
}

impl<S: Collider> RealmAgent<S> {
    /// Create an agent without a grid sensor
    ///
    /// # Arguments
    /// * `entity` - The agent's own entity, excluded from grid perception
    /// * `position` - Body position used to center the grid
    /// * `vector` - Scalar/vector observations
    /// * `actuator` - Action decoding and heuristic capture
    pub fn new(entity: EntityId, position: Getter<Vec2>, vector: VectorSensor, actuator: Actuator) -> Self {
        Self {
            entity,
            position,
            grid: None,
            vector,
            actuator,
            encoder: Box::new(PngEncoder),
            reset: Invoker::unbound(),
            reward: Getter::unbound(),
            game_over: Getter::unbound(),
            last_reward: 0.0,
            episode_duration: 0.0,
            episode: 0,
        }
    }

    pub fn with_grid(mut self, grid: GridSensor<S>) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_encoder(mut self, encoder: Box<dyn ImageEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Hook invoked at the start of every episode
    pub fn on_reset(mut self, reset: Invoker) -> Self {
        self.reset = reset;
        self
    }

    /// Total score, differenced into per-step rewards
    pub fn with_reward(mut self, reward: Getter<f32>) -> Self {
        self.reward = reward;
        self
    }

    pub fn with_game_over(mut self, game_over: Getter<bool>) -> Self {
        self.game_over = game_over;
        self
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn grid(&self) -> Option<&GridSensor<S>> {
        self.grid.as_ref()
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    /// Seconds elapsed in the current episode
    pub fn episode_duration(&self) -> f32 {
        self.episode_duration
    }

    pub fn agent_spec(&self) -> AgentSpec {
        let mut observations = Vec::with_capacity(2);
        if let Some(grid) = &self.grid {
            observations.push(sensor_spec(grid));
        }
        observations.push(sensor_spec(&self.vector));

        AgentSpec {
            observations,
            actions: self.actuator.shape().clone(),
        }
    }

    pub fn begin_episode(&mut self) {
        self.episode += 1;
        self.reset.invoke();
        self.last_reward = 0.0;
        self.episode_duration = 0.0;
        info!("Agent {} starting episode {}", self.entity, self.episode);
    }

    /// Sample every sensor against `world`
    pub fn observe<Q>(&mut self, world: &Q) -> Result<AgentObservation, ScenarioError>
    where
        Q: SpatialQuery<Shape = S>,
    {
        let position = self.position.get_or_default();
        let mut sensors = Vec::with_capacity(2);

        if let Some(grid) = self.grid.as_mut() {
            grid.sample(world, self.entity, position)?;
            sensors.push(collect(grid, self.encoder.as_ref())?);
        }

        self.vector.evaluate();
        sensors.push(collect(&mut self.vector, self.encoder.as_ref())?);

        Ok(AgentObservation { sensors })
    }

    /// Apply the policy's actions to the game
    pub fn act(&self, actions: &ActionTensor) -> Result<(), ScenarioError> {
        self.actuator.apply(actions)?;
        Ok(())
    }

    /// Actions the game's heuristic callbacks currently describe
    pub fn heuristic(&self) -> ActionTensor {
        self.actuator.heuristic()
    }

    /// Advance episode bookkeeping by `dt` seconds
    pub fn update(&mut self, dt: f32) -> AgentUpdate {
        let current = self.reward.get_or_default();
        let mut reward = 0.0;
        if (current - self.last_reward).abs() > REWARD_EPSILON {
            reward = current - self.last_reward;
            self.last_reward = current;
        }

        self.episode_duration += dt;
        let done = self.game_over.get_or_default();
        if done {
            debug!(
                "Agent {} finished episode {} after {:.2}s",
                self.entity, self.episode, self.episode_duration
            );
        }

        AgentUpdate { reward, done }
    }
}

fn sensor_spec<T: Sensor + ?Sized>(sensor: &T) -> SensorSpec {
    SensorSpec {
        name: sensor.name().to_string(),
        shape: sensor.observation_shape(),
        compression: sensor.compression(),
    }
}

fn collect<T: Sensor + ?Sized>(
    sensor: &mut T,
    encoder: &dyn ImageEncoder,
) -> Result<SensorObservation, CompressionError> {
    let output = match sensor.compressed_observation(encoder)? {
        Some(bytes) => SensorOutput::Compressed(bytes),
        None => SensorOutput::Raw(sensor.to_vec()),
    };
    Ok(SensorObservation {
        name: sensor.name().to_string(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionSpec;
    use crate::callback::Setter;
    use crate::geometry::Rect;
    use crate::grid::{GridEncoding, GridSpec};
    use crate::observation::ObservationSpec;
    use crate::test_util::{BoxShape, BoxWorld};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const AGENT: EntityId = EntityId(1);

    #[derive(Default)]
    struct Game {
        score: Cell<f32>,
        over: Cell<bool>,
        resets: Cell<u32>,
        speed: Cell<f32>,
    }

    fn agent(game: &Rc<Game>, grid: Option<GridSpec>) -> RealmAgent<BoxShape> {
        let speed = Rc::clone(game);
        let vector = VectorSensor::new(
            Getter::new(|| Vec2::new(0.0, 0.0)),
            Rect::default(),
            vec![ObservationSpec::float("speed", Getter::new(move || speed.speed.get()))],
        )
        .unwrap();

        let setter = Rc::clone(game);
        let actuator = Actuator::new(vec![ActionSpec::float(
            "speed",
            Setter::new(move |v| setter.speed.set(v)),
            Getter::new(|| 0.75),
        )]);

        let (score, over, resets) = (Rc::clone(game), Rc::clone(game), Rc::clone(game));
        let mut agent = RealmAgent::new(AGENT, Getter::new(|| Vec2::ZERO), vector, actuator)
            .with_reward(Getter::new(move || score.score.get()))
            .with_game_over(Getter::new(move || over.over.get()))
            .on_reset(Invoker::new(move || resets.resets.set(resets.resets.get() + 1)));
        if let Some(spec) = grid {
            agent = agent.with_grid(GridSensor::new(spec).unwrap());
        }
        agent
    }

    #[test]
    fn test_reward_delta_only_on_change() {
        let game = Rc::new(Game::default());
        let mut agent = agent(&game, None);
        agent.begin_episode();

        assert_eq!(agent.update(0.1).reward, 0.0);

        game.score.set(2.0);
        assert_eq!(agent.update(0.1).reward, 2.0);
        assert_eq!(agent.update(0.1).reward, 0.0);

        game.score.set(1.5);
        assert_eq!(agent.update(0.1).reward, -0.5);
        assert!((agent.episode_duration() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_game_over_propagates() {
        let game = Rc::new(Game::default());
        let mut agent = agent(&game, None);
        agent.begin_episode();

        assert!(!agent.update(0.1).done);
        game.over.set(true);
        assert!(agent.update(0.1).done);
    }

    #[test]
    fn test_begin_episode_resets_trackers() {
        let game = Rc::new(Game::default());
        let mut agent = agent(&game, None);

        agent.begin_episode();
        game.score.set(3.0);
        agent.update(1.0);

        game.score.set(0.0);
        agent.begin_episode();

        assert_eq!(game.resets.get(), 2);
        assert_eq!(agent.episode(), 2);
        assert_eq!(agent.episode_duration(), 0.0);
        // Score went back to 0 together with the tracker, so no spurious reward
        assert_eq!(agent.update(0.1).reward, 0.0);
    }

    #[test]
    fn test_act_and_heuristic_reach_callbacks() {
        let game = Rc::new(Game::default());
        let agent = agent(&game, None);

        agent.act(&agent.heuristic()).unwrap();
        assert_eq!(game.speed.get(), 0.75);

        let err = agent.act(&ActionTensor::default()).unwrap_err();
        assert!(matches!(err, ScenarioError::Config(_)));
    }

    #[test]
    fn test_agent_spec_lists_sensors_and_actions() {
        let game = Rc::new(Game::default());
        let spec = GridSpec::new(4, 2, Vec2::new(1.0, 1.0))
            .with_tags(["wall", "coin"])
            .with_encoding(GridEncoding::OneHot);
        let agent = agent(&game, Some(spec));

        let declared = agent.agent_spec();

        assert_eq!(declared.observations.len(), 2);
        assert_eq!(declared.observations[0].name, "one_hot_grid_sensor");
        assert_eq!(
            declared.observations[0].shape,
            ObservationShape::Visual {
                height: 2,
                width: 4,
                channels: 2
            }
        );
        assert_eq!(declared.observations[1].shape, ObservationShape::Vector { len: 3 });
        assert_eq!(declared.actions.continuous, 1);
    }

    #[test]
    fn test_observe_collects_raw_outputs() {
        let game = Rc::new(Game::default());
        game.speed.set(4.0);
        let mut world = BoxWorld::new();
        world.add(AGENT.0, "wall", 0.0, 0.0, 0.5).add(5, "coin", 1.0, 0.0, 0.5);
        let spec = GridSpec::new(3, 1, Vec2::new(1.0, 1.0)).with_tags(["wall", "coin"]);
        let mut agent = agent(&game, Some(spec));

        let observation = agent.observe(&world).unwrap();

        // The agent's own collider is invisible to its grid
        assert_eq!(observation.raw("grid_sensor"), Some(&[0.0, 0.0, 2.0][..]));
        assert_eq!(observation.raw("vector_sensor"), Some(&[0.0, 0.0, 4.0][..]));
    }

    #[test]
    fn test_observe_compresses_large_grids() {
        let game = Rc::new(Game::default());
        let encoded = Rc::new(RefCell::new(0));

        struct CountingEncoder(Rc<RefCell<u32>>);
        impl ImageEncoder for CountingEncoder {
            fn encode(&self, _w: u32, _h: u32, _rgb: &[u8]) -> Result<Vec<u8>, CompressionError> {
                *self.0.borrow_mut() += 1;
                Ok(vec![0xAB])
            }
        }

        let spec = GridSpec::new(20, 20, Vec2::new(1.0, 1.0))
            .with_tags(["a", "b", "c", "d"])
            .with_encoding(GridEncoding::OneHot)
            .with_compression(CompressionType::Png);
        let mut agent =
            agent(&game, Some(spec)).with_encoder(Box::new(CountingEncoder(Rc::clone(&encoded))));

        let observation = agent.observe(&BoxWorld::new()).unwrap();

        assert_eq!(
            observation.get("one_hot_grid_sensor"),
            Some(&SensorOutput::Compressed(vec![0xAB, 0xAB]))
        );
        assert_eq!(*encoded.borrow(), 2);
        assert!(observation.raw("one_hot_grid_sensor").is_none());
    }
}
