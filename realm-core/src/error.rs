//! Configuration errors raised by the codec
//!
//! `ConfigError` signals a setup mistake, not a runtime condition; callers
//! halt the run on it.

use crate::spatial::EntityId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid grid dimensions: {columns}x{rows} cells (both must be greater than 0)")]
    InvalidGridDimensions { columns: usize, rows: usize },
    #[error("Invalid cell size: {width}x{height} (both must be finite and greater than 0)")]
    InvalidCellSize { width: f32, height: f32 },
    #[error("Invalid collider query capacity: initial {initial}, max {max} (need 1 <= initial <= max)")]
    InvalidQueryCapacity { initial: usize, max: usize },
    #[error("One-hot grid encoding requires at least one detectable tag")]
    MissingDetectableTags,
    #[error("Invalid int range for observation '{label}': min {min}, max exclusive {max_exclusive}")]
    InvalidIntRange {
        label: String,
        min: i32,
        max_exclusive: i32,
    },
    #[error("Unnormalized feature for image compression: value {value} for entity {entity} (must be within 0..=1)")]
    UnnormalizedFeature { entity: EntityId, value: f32 },
    #[error("Action tensor shape mismatch: expected {expected_continuous} continuous and {expected_discrete} discrete values, got {actual_continuous} and {actual_discrete}")]
    ActionShapeMismatch {
        expected_continuous: usize,
        expected_discrete: usize,
        actual_continuous: usize,
        actual_discrete: usize,
    },
}

/// Failure while running a scenario step
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Compression error: {0}")]
    Compression(#[from] crate::compression::CompressionError),
    #[error("Scenario must be reset before stepping")]
    NotReset,
    #[error("Episode already finished, reset to start a new one")]
    EpisodeFinished,
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("Invalid scenario settings: {0}")]
    InvalidSettings(String),
}
