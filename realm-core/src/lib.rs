//! Perception and action codec for game-agent training
//!
//! This crate turns user-defined game state into fixed-shape observation
//! tensors and turns a policy's action tensors back into typed game
//! commands:
//! - `GridSensor`: spatial perception grid sampled through overlap queries
//! - `ImagePacker`: optional PNG packing of perception grids
//! - `VectorSensor`: scalar/vector observation codec
//! - `Actuator`: action tensor decoding and heuristic capture
//! - `RealmAgent`: per-step glue with reward and episode tracking
//! - `Scenario` and the registry: run any registered game by id

pub mod action;
pub mod agent;
pub mod callback;
pub mod compression;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod observation;
pub mod registry;
pub mod scenario;
pub mod score;
pub mod sensor;
pub mod spatial;
pub mod tags;

#[cfg(test)]
mod test_util;

// Re-export main types for convenience
pub use action::{ActionSpaceShape, ActionSpec, ActionTensor, Actuator};
pub use agent::{AgentObservation, AgentSpec, AgentUpdate, RealmAgent, SensorOutput, SensorSpec};
pub use callback::{Getter, Invoker, Setter};
pub use compression::{CompressionError, CompressionType, ImageEncoder, PngEncoder};
pub use error::{ConfigError, ScenarioError};
pub use geometry::{Rect, Vec2, Vec3};
pub use grid::{GridEncoding, GridSensor, GridSpec};
pub use observation::{ObservationSpec, VectorSensor};
pub use registry::{create_scenario, list_registered_scenarios, register_scenario, ScenarioFactory};
pub use scenario::{Scenario, ScenarioId, StepOutcome};
pub use score::{RewardRegion, ScoreKeeper};
pub use sensor::{ObservationShape, Sensor};
pub use spatial::{BoxQuery, Collider, EntityId, LayerMask, QueryBuffer, SpatialQuery};
pub use tags::TagRegistry;
