//! Image compression of perception grids
//!
//! A grid observation with `n` channels per cell is split into
//! `ceil(n / 3)` RGB planes and each plane is handed to an [`ImageEncoder`].
//! Channel values must already lie in `[0, 1]`; the grid sensor validates
//! them while sampling.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

/// How a sensor delivers its observation to the trainer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionType {
    /// Raw `f32` values
    #[default]
    None,
    /// One PNG image per group of three channels
    Png,
}

/// Error type for image compression
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("Pixel buffer has {actual} bytes but a {width}x{height} RGB image needs {expected}")]
    PixelBufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Feature buffer has {actual} values but a {columns}x{rows} grid of width {feature_width} needs {expected}")]
    FeatureBufferSize {
        columns: usize,
        rows: usize,
        feature_width: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Failed to encode image: {0}")]
    Encoding(String),
}

/// External image codec
pub trait ImageEncoder {
    /// Encode a `width` x `height` RGB24 image
    ///
    /// `rgb` holds `width * height * 3` bytes, rows top to bottom.
    fn encode(&self, width: u32, height: u32, rgb: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

/// Lossless PNG encoder backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn encode(&self, width: u32, height: u32, rgb: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let expected = width as usize * height as usize * 3;
        let image = RgbImage::from_raw(width, height, rgb.to_vec()).ok_or(
            CompressionError::PixelBufferSize {
                width,
                height,
                expected,
                actual: rgb.len(),
            },
        )?;

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| CompressionError::Encoding(e.to_string()))?;
        Ok(bytes)
    }
}

/// Number of RGB images needed for `feature_width` channels
pub fn image_count(feature_width: usize) -> usize {
    feature_width.div_ceil(3)
}

/// Repacks perception buffers into RGB planes
///
/// Owns the intermediate pixel array so repeated packing of the same grid
/// does not allocate.
#[derive(Debug, Default)]
pub struct ImagePacker {
    pixels: Vec<u8>,
}

impl ImagePacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `buffer` as one image per three channels
    ///
    /// `buffer` is in cell-index order (`column + row * columns`, row 0 at
    /// the bottom) with `feature_width` values per cell. Images are written
    /// top row first, matching the layout of [`crate::grid::GridSensor::write`].
    pub fn pack(
        &mut self,
        buffer: &[f32],
        columns: usize,
        rows: usize,
        feature_width: usize,
        encoder: &dyn ImageEncoder,
    ) -> Result<Vec<Vec<u8>>, CompressionError> {
        let cell_count = columns * rows;
        let expected = cell_count * feature_width;
        if buffer.len() != expected {
            return Err(CompressionError::FeatureBufferSize {
                columns,
                rows,
                feature_width,
                expected,
                actual: buffer.len(),
            });
        }

        let mut images = Vec::with_capacity(image_count(feature_width));
        for image_index in 0..image_count(feature_width) {
            let first_channel = image_index * 3;
            let channels = (feature_width - first_channel).min(3);

            self.pixels.clear();
            self.pixels.resize(cell_count * 3, 0);
            for (pixel_row, row) in (0..rows).rev().enumerate() {
                for column in 0..columns {
                    let cell = column + row * columns;
                    let pixel = (pixel_row * columns + column) * 3;
                    for channel in 0..channels {
                        let value = buffer[cell * feature_width + first_channel + channel];
                        self.pixels[pixel + channel] = to_byte(value);
                    }
                }
            }

            images.push(encoder.encode(columns as u32, rows as u32, &self.pixels)?);
        }
        Ok(images)
    }
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
