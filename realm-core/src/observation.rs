//! Scalar/vector observation codec
//!
//! A [`VectorSensor`] reads the agent's 2D position and a list of typed
//! [`ObservationSpec`]s and flattens them into one `f32` vector per step.
//! The position is normalized into the approximate map bounds when those are
//! known; Int values are normalized linearly into `[0, 1]`; everything else
//! is emitted raw.

use std::fmt;

use crate::callback::Getter;
use crate::error::ConfigError;
use crate::geometry::{Rect, Vec2, Vec3};
use crate::sensor::{ObservationShape, Sensor};

/// Bounds thinner than this on either axis are treated as unknown
const BOUNDS_EPSILON: f32 = 1e-5;

/// One typed value observed every step
pub enum ObservationSpec {
    Bool {
        label: String,
        value: Getter<bool>,
    },
    Int {
        label: String,
        value: Getter<i32>,
        /// Inclusive lower bound
        min: i32,
        /// Exclusive upper bound
        max_exclusive: i32,
    },
    Float {
        label: String,
        value: Getter<f32>,
    },
    Vector2 {
        label: String,
        value: Getter<Vec2>,
    },
    Vector3 {
        label: String,
        value: Getter<Vec3>,
    },
}

impl ObservationSpec {
    pub fn bool(label: impl Into<String>, value: Getter<bool>) -> Self {
        ObservationSpec::Bool {
            label: label.into(),
            value,
        }
    }

    pub fn int(label: impl Into<String>, value: Getter<i32>, min: i32, max_exclusive: i32) -> Self {
        ObservationSpec::Int {
            label: label.into(),
            value,
            min,
            max_exclusive,
        }
    }

    pub fn float(label: impl Into<String>, value: Getter<f32>) -> Self {
        ObservationSpec::Float {
            label: label.into(),
            value,
        }
    }

    pub fn vector2(label: impl Into<String>, value: Getter<Vec2>) -> Self {
        ObservationSpec::Vector2 {
            label: label.into(),
            value,
        }
    }

    pub fn vector3(label: impl Into<String>, value: Getter<Vec3>) -> Self {
        ObservationSpec::Vector3 {
            label: label.into(),
            value,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ObservationSpec::Bool { label, .. }
            | ObservationSpec::Int { label, .. }
            | ObservationSpec::Float { label, .. }
            | ObservationSpec::Vector2 { label, .. }
            | ObservationSpec::Vector3 { label, .. } => label,
        }
    }

    /// Number of floats this spec contributes
    pub fn width(&self) -> usize {
        match self {
            ObservationSpec::Bool { .. } | ObservationSpec::Int { .. } | ObservationSpec::Float { .. } => 1,
            ObservationSpec::Vector2 { .. } => 2,
            ObservationSpec::Vector3 { .. } => 3,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            ObservationSpec::Int {
                ref label,
                min,
                max_exclusive,
                ..
            } if max_exclusive <= min => Err(ConfigError::InvalidIntRange {
                label: label.clone(),
                min,
                max_exclusive,
            }),
            _ => Ok(()),
        }
    }

    fn append(&self, out: &mut Vec<f32>) {
        match self {
            ObservationSpec::Bool { value, .. } => {
                out.push(if value.get_or_default() { 1.0 } else { 0.0 });
            }
            ObservationSpec::Int {
                value,
                min,
                max_exclusive,
                ..
            } => out.push(normalize_int(value.get_or_default(), *min, *max_exclusive)),
            ObservationSpec::Float { value, .. } => out.push(value.get_or_default()),
            ObservationSpec::Vector2 { value, .. } => {
                let v = value.get_or_default();
                out.extend([v.x, v.y]);
            }
            ObservationSpec::Vector3 { value, .. } => {
                let v = value.get_or_default();
                out.extend([v.x, v.y, v.z]);
            }
        }
    }
}

impl fmt::Debug for ObservationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ObservationSpec::Bool { .. } => "Bool",
            ObservationSpec::Int { .. } => "Int",
            ObservationSpec::Float { .. } => "Float",
            ObservationSpec::Vector2 { .. } => "Vector2",
            ObservationSpec::Vector3 { .. } => "Vector3",
        };
        write!(f, "{}({})", kind, self.label())
    }
}

/// Map `value` from `[min, max_exclusive]` onto `[0, 1]`, clamping first
fn normalize_int(value: i32, min: i32, max_exclusive: i32) -> f32 {
    let clamped = value.clamp(min, max_exclusive);
    // i64 so ranges spanning most of i32 do not overflow
    let offset = i64::from(clamped) - i64::from(min);
    let span = i64::from(max_exclusive) - i64::from(min);
    offset as f32 / span as f32
}

/// Vector observation of the agent position plus typed values
#[derive(Debug)]
pub struct VectorSensor {
    position: Getter<Vec2>,
    approximate_bounds: Rect,
    specs: Vec<ObservationSpec>,
    observation: Vec<f32>,
}

impl VectorSensor {
    /// Create a sensor, rejecting Int specs with an empty range
    ///
    /// # Arguments
    /// * `position` - Agent position in world units
    /// * `approximate_bounds` - Playable area used to normalize the position;
    ///   a degenerate rectangle leaves the position raw
    /// * `specs` - Values appended after the position, in order
    pub fn new(
        position: Getter<Vec2>,
        approximate_bounds: Rect,
        specs: Vec<ObservationSpec>,
    ) -> Result<Self, ConfigError> {
        for spec in &specs {
            spec.validate()?;
        }

        let len = 2 + specs.iter().map(ObservationSpec::width).sum::<usize>();
        Ok(Self {
            position,
            approximate_bounds,
            specs,
            observation: Vec::with_capacity(len),
        })
    }

    pub fn specs(&self) -> &[ObservationSpec] {
        &self.specs
    }

    pub fn bounds_known(&self) -> bool {
        self.approximate_bounds.width.abs() > BOUNDS_EPSILON
            && self.approximate_bounds.height.abs() > BOUNDS_EPSILON
    }

    /// Read every getter and rebuild the observation vector
    pub fn evaluate(&mut self) -> &[f32] {
        self.observation.clear();

        let position = self.normalize_position(self.position.get_or_default());
        self.observation.extend([position.x, position.y]);

        for spec in &self.specs {
            spec.append(&mut self.observation);
        }

        &self.observation
    }

    /// Latest evaluated observation
    pub fn observation(&self) -> &[f32] {
        &self.observation
    }

    fn normalize_position(&self, position: Vec2) -> Vec2 {
        if !self.bounds_known() {
            return position;
        }

        let min = self.approximate_bounds.min();
        let max = self.approximate_bounds.max();
        (position - min) / (max - min)
    }
}

impl Sensor for VectorSensor {
    fn name(&self) -> &str {
        "vector_sensor"
    }

    fn observation_shape(&self) -> ObservationShape {
        ObservationShape::Vector {
            len: 2 + self.specs.iter().map(ObservationSpec::width).sum::<usize>(),
        }
    }

    fn write(&self, out: &mut [f32]) -> usize {
        let len = self.observation.len();
        out[..len].copy_from_slice(&self.observation);
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant<T: Clone + 'static>(value: T) -> Getter<T> {
        Getter::new(move || value.clone())
    }

    #[test]
    fn test_int_is_normalized_into_unit_range() {
        let mut sensor = VectorSensor::new(
            Getter::unbound(),
            Rect::default(),
            vec![ObservationSpec::int("coins", constant(5), 0, 10)],
        )
        .unwrap();

        assert_eq!(sensor.evaluate(), &[0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_int_is_clamped_before_normalizing() {
        let mut sensor = VectorSensor::new(
            Getter::unbound(),
            Rect::default(),
            vec![
                ObservationSpec::int("high", constant(42), 2, 6),
                ObservationSpec::int("low", constant(-3), 2, 6),
            ],
        )
        .unwrap();

        assert_eq!(&sensor.evaluate()[2..], &[1.0, 0.0]);
    }

    #[test]
    fn test_every_kind_in_order() {
        let mut sensor = VectorSensor::new(
            constant(Vec2::new(3.0, -1.0)),
            Rect::default(),
            vec![
                ObservationSpec::bool("flag", constant(true)),
                ObservationSpec::float("speed", constant(2.5)),
                ObservationSpec::vector2("velocity", constant(Vec2::new(0.25, -0.75))),
                ObservationSpec::vector3("aim", constant(Vec3::new(1.0, 2.0, 3.0))),
            ],
        )
        .unwrap();

        assert_eq!(
            sensor.evaluate(),
            &[3.0, -1.0, 1.0, 2.5, 0.25, -0.75, 1.0, 2.0, 3.0]
        );
        assert_eq!(sensor.observation_shape(), ObservationShape::Vector { len: 9 });
    }

    #[test]
    fn test_unbound_getters_emit_zero() {
        let mut sensor = VectorSensor::new(
            Getter::unbound(),
            Rect::default(),
            vec![
                ObservationSpec::bool("flag", Getter::unbound()),
                ObservationSpec::int("count", Getter::unbound(), -4, 4),
                ObservationSpec::vector3("aim", Getter::unbound()),
            ],
        )
        .unwrap();

        // Unbound int reads as 0, which sits halfway through -4..4
        assert_eq!(sensor.evaluate(), &[0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_position_normalized_with_known_bounds() {
        // Corners given in reverse order still resolve to min (0, 10), max (20, 30)
        let bounds = Rect::new(20.0, 30.0, -20.0, -20.0);
        let mut sensor = VectorSensor::new(constant(Vec2::new(5.0, 25.0)), bounds, Vec::new()).unwrap();

        assert!(sensor.bounds_known());
        assert_eq!(sensor.evaluate(), &[0.25, 0.75]);
    }

    #[test]
    fn test_position_raw_with_unknown_bounds() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 0.0);
        let mut sensor = VectorSensor::new(constant(Vec2::new(5.0, 25.0)), bounds, Vec::new()).unwrap();

        assert!(!sensor.bounds_known());
        assert_eq!(sensor.evaluate(), &[5.0, 25.0]);
    }

    #[test]
    fn test_degenerate_int_range_rejected() {
        let result = VectorSensor::new(
            Getter::unbound(),
            Rect::default(),
            vec![ObservationSpec::int("empty", constant(1), 3, 3)],
        );

        match result.unwrap_err() {
            ConfigError::InvalidIntRange {
                label,
                min,
                max_exclusive,
            } => {
                assert_eq!(label, "empty");
                assert_eq!((min, max_exclusive), (3, 3));
            }
            other => panic!("Expected InvalidIntRange error, got {:?}", other),
        }
    }

    #[test]
    fn test_int_spanning_full_range() {
        let mut sensor = VectorSensor::new(
            Getter::unbound(),
            Rect::default(),
            vec![
                ObservationSpec::int("low", constant(i32::MIN), i32::MIN, i32::MAX),
                ObservationSpec::int("mid", constant(0), i32::MIN, i32::MAX),
                ObservationSpec::int("high", constant(i32::MAX), i32::MIN, i32::MAX),
            ],
        )
        .unwrap();

        let values = sensor.evaluate();
        assert_eq!(values[2], 0.0);
        assert!((values[3] - 0.5).abs() < 1e-6);
        assert_eq!(values[4], 1.0);
    }

    #[test]
    fn test_evaluate_rereads_getters() {
        use std::cell::Cell;
        use std::rc::Rc;

        let count = Rc::new(Cell::new(0));
        let reader = Rc::clone(&count);
        let mut sensor = VectorSensor::new(
            Getter::unbound(),
            Rect::default(),
            vec![ObservationSpec::int("count", Getter::new(move || reader.get()), 0, 4)],
        )
        .unwrap();

        assert_eq!(sensor.evaluate()[2], 0.0);
        count.set(2);
        assert_eq!(sensor.evaluate()[2], 0.5);

        let mut out = [0.0; 3];
        assert_eq!(sensor.write(&mut out), 3);
        assert_eq!(out, [0.0, 0.0, 0.5]);
    }
}
