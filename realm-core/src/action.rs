//! Action codec
//!
//! An [`Actuator`] decodes a policy's [`ActionTensor`] into calls on typed
//! setters, and captures the inverse tensor from typed getters for
//! demonstrations and manual control.
//!
//! Bool and Int specs each occupy one discrete branch; Float, Vector2 and
//! Vector3 occupy 1, 2 and 3 continuous slots. Discrete and continuous slots
//! are consumed by independent cursors in spec order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::callback::{Getter, Setter};
use crate::error::ConfigError;
use crate::geometry::{Vec2, Vec3};

/// One typed command the policy controls
pub enum ActionSpec {
    Bool {
        label: String,
        apply: Setter<bool>,
        heuristic: Getter<bool>,
    },
    Int {
        label: String,
        apply: Setter<i32>,
        heuristic: Getter<i32>,
        max_exclusive: i32,
    },
    Float {
        label: String,
        apply: Setter<f32>,
        heuristic: Getter<f32>,
    },
    Vector2 {
        label: String,
        apply: Setter<Vec2>,
        heuristic: Getter<Vec2>,
    },
    Vector3 {
        label: String,
        apply: Setter<Vec3>,
        heuristic: Getter<Vec3>,
    },
}

impl ActionSpec {
    pub fn bool(label: impl Into<String>, apply: Setter<bool>, heuristic: Getter<bool>) -> Self {
        ActionSpec::Bool {
            label: label.into(),
            apply,
            heuristic,
        }
    }

    pub fn int(
        label: impl Into<String>,
        apply: Setter<i32>,
        heuristic: Getter<i32>,
        max_exclusive: i32,
    ) -> Self {
        ActionSpec::Int {
            label: label.into(),
            apply,
            heuristic,
            max_exclusive,
        }
    }

    pub fn float(label: impl Into<String>, apply: Setter<f32>, heuristic: Getter<f32>) -> Self {
        ActionSpec::Float {
            label: label.into(),
            apply,
            heuristic,
        }
    }

    pub fn vector2(label: impl Into<String>, apply: Setter<Vec2>, heuristic: Getter<Vec2>) -> Self {
        ActionSpec::Vector2 {
            label: label.into(),
            apply,
            heuristic,
        }
    }

    pub fn vector3(label: impl Into<String>, apply: Setter<Vec3>, heuristic: Getter<Vec3>) -> Self {
        ActionSpec::Vector3 {
            label: label.into(),
            apply,
            heuristic,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ActionSpec::Bool { label, .. }
            | ActionSpec::Int { label, .. }
            | ActionSpec::Float { label, .. }
            | ActionSpec::Vector2 { label, .. }
            | ActionSpec::Vector3 { label, .. } => label,
        }
    }

    /// Continuous slots consumed by this spec
    pub fn continuous_width(&self) -> usize {
        match self {
            ActionSpec::Bool { .. } | ActionSpec::Int { .. } => 0,
            ActionSpec::Float { .. } => 1,
            ActionSpec::Vector2 { .. } => 2,
            ActionSpec::Vector3 { .. } => 3,
        }
    }

    /// Branch size if this spec is discrete
    pub fn branch_size(&self) -> Option<usize> {
        match *self {
            ActionSpec::Bool { .. } => Some(2),
            ActionSpec::Int { max_exclusive, .. } => Some(max_exclusive.max(2) as usize),
            _ => None,
        }
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ActionSpec::Bool { .. } => "Bool",
            ActionSpec::Int { .. } => "Int",
            ActionSpec::Float { .. } => "Float",
            ActionSpec::Vector2 { .. } => "Vector2",
            ActionSpec::Vector3 { .. } => "Vector3",
        };
        write!(f, "{}({})", kind, self.label())
    }
}

/// Layout of the action tensor the policy must produce
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpaceShape {
    /// Number of continuous values
    pub continuous: usize,
    /// Size of each discrete branch, in spec order
    pub branches: Vec<usize>,
}

impl ActionSpaceShape {
    pub fn from_specs(specs: &[ActionSpec]) -> Self {
        Self {
            continuous: specs.iter().map(ActionSpec::continuous_width).sum(),
            branches: specs.iter().filter_map(ActionSpec::branch_size).collect(),
        }
    }

    pub fn discrete(&self) -> usize {
        self.branches.len()
    }
}

/// Actions for one decision step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionTensor {
    pub continuous: Vec<f32>,
    pub discrete: Vec<i32>,
}

impl ActionTensor {
    pub fn new(continuous: Vec<f32>, discrete: Vec<i32>) -> Self {
        Self { continuous, discrete }
    }

    /// All-zero tensor of the given shape
    pub fn zeros(shape: &ActionSpaceShape) -> Self {
        Self {
            continuous: vec![0.0; shape.continuous],
            discrete: vec![0; shape.discrete()],
        }
    }
}

/// Applies action tensors to game callbacks
#[derive(Debug)]
pub struct Actuator {
    specs: Vec<ActionSpec>,
    shape: ActionSpaceShape,
}

impl Actuator {
    pub fn new(specs: Vec<ActionSpec>) -> Self {
        let shape = ActionSpaceShape::from_specs(&specs);
        Self { specs, shape }
    }

    pub fn shape(&self) -> &ActionSpaceShape {
        &self.shape
    }

    pub fn specs(&self) -> &[ActionSpec] {
        &self.specs
    }

    /// Decode `actions` into setter calls
    ///
    /// Int values are passed through as received, without clamping to the
    /// branch size. Fails before calling any setter if the tensor is shorter
    /// than the declared shape.
    pub fn apply(&self, actions: &ActionTensor) -> Result<(), ConfigError> {
        if actions.continuous.len() < self.shape.continuous
            || actions.discrete.len() < self.shape.discrete()
        {
            return Err(ConfigError::ActionShapeMismatch {
                expected_continuous: self.shape.continuous,
                expected_discrete: self.shape.discrete(),
                actual_continuous: actions.continuous.len(),
                actual_discrete: actions.discrete.len(),
            });
        }

        let mut continuous = actions.continuous.iter().copied();
        let mut discrete = actions.discrete.iter().copied();
        // Length was checked above, so the cursors never run dry
        let mut next_continuous = || continuous.next().unwrap_or_default();

        for spec in &self.specs {
            match spec {
                ActionSpec::Bool { apply, .. } => {
                    let value = discrete.next().unwrap_or_default();
                    apply.set(value == 1);
                }
                ActionSpec::Int { apply, .. } => {
                    apply.set(discrete.next().unwrap_or_default());
                }
                ActionSpec::Float { apply, .. } => apply.set(next_continuous()),
                ActionSpec::Vector2 { apply, .. } => {
                    let x = next_continuous();
                    let y = next_continuous();
                    apply.set(Vec2::new(x, y));
                }
                ActionSpec::Vector3 { apply, .. } => {
                    let x = next_continuous();
                    let y = next_continuous();
                    let z = next_continuous();
                    apply.set(Vec3::new(x, y, z));
                }
            }
        }

        Ok(())
    }

    /// Capture the tensor the heuristic getters currently describe
    ///
    /// Int values are clamped to `[0, max_exclusive]`; unbound getters
    /// contribute zeros.
    pub fn heuristic(&self) -> ActionTensor {
        let mut actions = ActionTensor {
            continuous: Vec::with_capacity(self.shape.continuous),
            discrete: Vec::with_capacity(self.shape.discrete()),
        };

        for spec in &self.specs {
            match spec {
                ActionSpec::Bool { heuristic, .. } => {
                    actions.discrete.push(i32::from(heuristic.get_or_default()));
                }
                ActionSpec::Int {
                    heuristic,
                    max_exclusive,
                    ..
                } => {
                    let value = heuristic.get_or_default();
                    actions.discrete.push(value.clamp(0, (*max_exclusive).max(0)));
                }
                ActionSpec::Float { heuristic, .. } => {
                    actions.continuous.push(heuristic.get_or_default());
                }
                ActionSpec::Vector2 { heuristic, .. } => {
                    let v = heuristic.get_or_default();
                    actions.continuous.extend([v.x, v.y]);
                }
                ActionSpec::Vector3 { heuristic, .. } => {
                    let v = heuristic.get_or_default();
                    actions.continuous.extend([v.x, v.y, v.z]);
                }
            }
        }

        actions
    }
}
