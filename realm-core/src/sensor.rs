//! Sensor trait shared by every observation producer
//!
//! Each sensor owns its scratch buffer and is refreshed by its own typed
//! update method (grid sampling needs the physics world, the vector codec
//! does not). Once refreshed, the agent collects every sensor's output
//! through this common interface.

use serde::{Deserialize, Serialize};

use crate::compression::{CompressionError, CompressionType, ImageEncoder};

/// Declared shape of one sensor's observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationShape {
    /// Flat vector of `len` floats
    Vector { len: usize },
    /// Image-like tensor in (height, width, channel) order
    Visual {
        height: usize,
        width: usize,
        channels: usize,
    },
}

impl ObservationShape {
    /// Total number of floats in the observation
    pub fn len(&self) -> usize {
        match *self {
            ObservationShape::Vector { len } => len,
            ObservationShape::Visual {
                height,
                width,
                channels,
            } => height * width * channels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensions as a list, outermost first
    pub fn dims(&self) -> Vec<usize> {
        match *self {
            ObservationShape::Vector { len } => vec![len],
            ObservationShape::Visual {
                height,
                width,
                channels,
            } => vec![height, width, channels],
        }
    }
}

/// Producer of one observation tensor per decision step
pub trait Sensor {
    /// Stable name used in logs and declared specs
    fn name(&self) -> &str;

    /// Shape the trainer should expect, fixed at construction
    fn observation_shape(&self) -> ObservationShape;

    /// Delivery format, fixed at construction
    fn compression(&self) -> CompressionType {
        CompressionType::None
    }

    /// Write the latest observation into `out` and return the count written
    ///
    /// `out` must hold at least `observation_shape().len()` values.
    fn write(&self, out: &mut [f32]) -> usize;

    /// Latest observation as compressed bytes, if this sensor compresses
    fn compressed_observation(
        &mut self,
        _encoder: &dyn ImageEncoder,
    ) -> Result<Option<Vec<u8>>, CompressionError> {
        Ok(None)
    }

    /// Latest observation collected into a new vector
    fn to_vec(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.observation_shape().len()];
        let written = self.write(&mut out);
        out.truncate(written);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantSensor(Vec<f32>);

    impl Sensor for ConstantSensor {
        fn name(&self) -> &str {
            "constant"
        }

        fn observation_shape(&self) -> ObservationShape {
            ObservationShape::Vector { len: self.0.len() }
        }

        fn write(&self, out: &mut [f32]) -> usize {
            out[..self.0.len()].copy_from_slice(&self.0);
            self.0.len()
        }
    }

    #[test]
    fn test_shape_len_and_dims() {
        let visual = ObservationShape::Visual {
            height: 4,
            width: 3,
            channels: 2,
        };
        assert_eq!(visual.len(), 24);
        assert_eq!(visual.dims(), vec![4, 3, 2]);
        assert_eq!(ObservationShape::Vector { len: 5 }.dims(), vec![5]);
        assert!(ObservationShape::Vector { len: 0 }.is_empty());
    }

    #[test]
    fn test_default_methods() {
        let mut sensor = ConstantSensor(vec![1.0, 2.0]);
        assert_eq!(sensor.compression(), CompressionType::None);
        assert_eq!(sensor.to_vec(), vec![1.0, 2.0]);
        let compressed = sensor
            .compressed_observation(&crate::compression::PngEncoder)
            .unwrap();
        assert!(compressed.is_none());
    }
}
