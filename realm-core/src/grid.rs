//! Grid-based spatial perception
//!
//! A [`GridSensor`] lays a fixed grid of cells around the agent, asks the
//! physics engine which shapes overlap each cell, and records the category of
//! the detectable shape nearest to the agent. The result is a small
//! image-like tensor the policy can convolve over.
//!
//! Two encodings are supported:
//!
//! - [`GridEncoding::ScalarIndex`]: one value per cell, `tag index + 1`, or 0
//!   for an empty cell.
//! - [`GridEncoding::OneHot`]: one channel per detectable tag, with a single
//!   1 in the channel of the detected tag.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::compression::{CompressionError, CompressionType, ImageEncoder, ImagePacker};
use crate::error::ConfigError;
use crate::geometry::Vec2;
use crate::sensor::{ObservationShape, Sensor};
use crate::spatial::{BoxQuery, Collider, EntityId, LayerMask, QueryBuffer, SpatialQuery};
use crate::tags::TagRegistry;

/// Per-cell feature encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridEncoding {
    #[default]
    ScalarIndex,
    OneHot,
}

impl GridEncoding {
    /// Number of values written per cell
    pub fn feature_width(self, tag_count: usize) -> usize {
        match self {
            GridEncoding::ScalarIndex => 1,
            GridEncoding::OneHot => tag_count,
        }
    }

    fn encode(self, tag_index: usize, cell: &mut [f32]) {
        match self {
            GridEncoding::ScalarIndex => cell[0] = (tag_index + 1) as f32,
            GridEncoding::OneHot => cell[tag_index] = 1.0,
        }
    }

    fn decode(self, cell: &[f32]) -> Option<usize> {
        match self {
            GridEncoding::ScalarIndex => {
                let value = cell[0].round();
                (value >= 1.0).then(|| value as usize - 1)
            }
            GridEncoding::OneHot => cell.iter().position(|&v| v >= 0.5),
        }
    }
}

/// Grid sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Size of one cell in world units
    pub cell_size: Vec2,
    /// Number of cells along x
    pub columns: usize,
    /// Number of cells along y
    pub rows: usize,
    pub detectable_tags: TagRegistry,
    pub collider_mask: LayerMask,
    pub encoding: GridEncoding,
    pub compression: CompressionType,
    pub initial_query_capacity: usize,
    pub max_query_capacity: usize,
    /// Grids narrower or shorter than this are never image-compressed
    pub min_compressed_extent: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cell_size: Vec2::new(1.0, 1.0),
            columns: 16,
            rows: 16,
            detectable_tags: TagRegistry::default(),
            collider_mask: LayerMask::ALL,
            encoding: GridEncoding::ScalarIndex,
            compression: CompressionType::None,
            initial_query_capacity: 10,
            max_query_capacity: 500,
            min_compressed_extent: 20,
        }
    }
}

impl GridSpec {
    pub fn new(columns: usize, rows: usize, cell_size: Vec2) -> Self {
        Self {
            columns,
            rows,
            cell_size,
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.detectable_tags = TagRegistry::new(tags);
        self
    }

    pub fn with_encoding(mut self, encoding: GridEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.collider_mask = mask;
        self
    }

    pub fn cell_count(&self) -> usize {
        self.columns * self.rows
    }

    pub fn feature_width(&self) -> usize {
        self.encoding.feature_width(self.detectable_tags.len())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigError::InvalidGridDimensions {
                columns: self.columns,
                rows: self.rows,
            });
        }

        let size = self.cell_size;
        if !(size.x.is_finite() && size.y.is_finite() && size.x > 0.0 && size.y > 0.0) {
            return Err(ConfigError::InvalidCellSize {
                width: size.x,
                height: size.y,
            });
        }

        if self.encoding == GridEncoding::OneHot && self.detectable_tags.is_empty() {
            return Err(ConfigError::MissingDetectableTags);
        }

        if self.initial_query_capacity == 0 || self.initial_query_capacity > self.max_query_capacity {
            return Err(ConfigError::InvalidQueryCapacity {
                initial: self.initial_query_capacity,
                max: self.max_query_capacity,
            });
        }

        Ok(())
    }

    /// Local offset of every cell center from the grid anchor
    ///
    /// Indexed by `column + row * columns`, row 0 lowest in world y.
    pub fn cell_offsets(&self) -> Vec<Vec2> {
        let mut offsets = Vec::with_capacity(self.cell_count());
        let half_columns = (self.columns as f32 - 1.0) / 2.0;
        let half_rows = (self.rows as f32 - 1.0) / 2.0;
        for row in 0..self.rows {
            for column in 0..self.columns {
                offsets.push(Vec2::new(
                    (column as f32 - half_columns) * self.cell_size.x,
                    (row as f32 - half_rows) * self.cell_size.y,
                ));
            }
        }
        offsets
    }
}

/// Perception grid sampled around an agent
///
/// `S` is the shape type of the physics world the sensor samples.
#[derive(Debug)]
pub struct GridSensor<S> {
    spec: GridSpec,
    name: String,
    feature_width: usize,
    compression: CompressionType,
    cell_offsets: Vec<Vec2>,
    perception: Vec<f32>,
    cell_data: Vec<f32>,
    queries: QueryBuffer<S>,
    packer: ImagePacker,
}

impl<S: Collider> GridSensor<S> {
    pub fn new(spec: GridSpec) -> Result<Self, ConfigError> {
        spec.validate()?;

        let name = match spec.encoding {
            GridEncoding::ScalarIndex => "grid_sensor",
            GridEncoding::OneHot => "one_hot_grid_sensor",
        };

        let mut compression = spec.compression;
        if compression == CompressionType::Png
            && (spec.columns < spec.min_compressed_extent || spec.rows < spec.min_compressed_extent)
        {
            warn!(
                "Grid {}x{} is too small for PNG compression (minimum {}), using no compression",
                spec.columns, spec.rows, spec.min_compressed_extent
            );
            compression = CompressionType::None;
        }

        let feature_width = spec.feature_width();
        Ok(Self {
            name: name.to_string(),
            feature_width,
            compression,
            cell_offsets: spec.cell_offsets(),
            perception: vec![0.0; spec.cell_count() * feature_width],
            cell_data: vec![0.0; feature_width],
            queries: QueryBuffer::new(spec.initial_query_capacity, spec.max_query_capacity),
            packer: ImagePacker::new(),
            spec,
        })
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn feature_width(&self) -> usize {
        self.feature_width
    }

    pub fn cell_offsets(&self) -> &[Vec2] {
        &self.cell_offsets
    }

    /// Latest samples in cell-index order
    pub fn perception_buffer(&self) -> &[f32] {
        &self.perception
    }

    /// Current collider query limit
    pub fn query_capacity(&self) -> usize {
        self.queries.capacity()
    }

    pub fn reset(&mut self) {
        self.perception.fill(0.0);
        self.cell_data.fill(0.0);
    }

    /// Sample the grid centered on `position`
    ///
    /// Shapes owned by `agent` are ignored. Returns the perception buffer in
    /// cell-index order.
    pub fn sample<Q>(&mut self, world: &Q, agent: EntityId, position: Vec2) -> Result<&[f32], ConfigError>
    where
        Q: SpatialQuery<Shape = S>,
    {
        self.reset();

        let half_extent = self.spec.cell_size * 0.5;
        for cell in 0..self.cell_offsets.len() {
            let query = BoxQuery {
                center: position + self.cell_offsets[cell],
                half_extent,
                mask: self.spec.collider_mask,
            };

            let shapes = self.queries.query_with_growth(world, &query);
            let Some((owner, tag_index)) =
                closest_detectable(shapes, &self.spec.detectable_tags, agent, query.center, position)
            else {
                continue;
            };

            self.cell_data.fill(0.0);
            self.spec.encoding.encode(tag_index, &mut self.cell_data);
            self.validate_values(owner)?;

            let start = cell * self.feature_width;
            self.perception[start..start + self.feature_width].copy_from_slice(&self.cell_data);
        }

        Ok(&self.perception)
    }

    fn validate_values(&self, entity: EntityId) -> Result<(), ConfigError> {
        if self.compression != CompressionType::Png {
            return Ok(());
        }

        match self.cell_data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            Some(&value) => Err(ConfigError::UnnormalizedFeature { entity, value }),
            None => Ok(()),
        }
    }

    /// Tag index detected in each cell, in cell-index order
    pub fn detections(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.perception
            .chunks(self.feature_width.max(1))
            .map(move |cell| self.spec.encoding.decode(cell))
    }

    /// Text view of the latest samples, top row first
    ///
    /// Empty cells are `.`, detected cells show their 1-based tag index
    /// (`#` past 9).
    pub fn render_debug(&self) -> String {
        let detections: Vec<Option<usize>> = self.detections().collect();
        let columns = self.spec.columns;
        let mut out = String::with_capacity((columns + 1) * self.spec.rows);
        for row in (0..self.spec.rows).rev() {
            for column in 0..columns {
                out.push(match detections.get(column + row * columns).copied().flatten() {
                    None => '.',
                    Some(index) if index < 9 => char::from(b'1' + index as u8),
                    Some(_) => '#',
                });
            }
            out.push('\n');
        }
        out
    }

    /// Encode the latest samples as one image per three channels
    pub fn compressed_images(&mut self, encoder: &dyn ImageEncoder) -> Result<Vec<Vec<u8>>, CompressionError> {
        self.packer.pack(
            &self.perception,
            self.spec.columns,
            self.spec.rows,
            self.feature_width,
            encoder,
        )
    }
}

/// Nearest detectable shape to the agent among `shapes`
///
/// Strictly closer shapes win, so at an exactly tied distance the shape the
/// engine reported first is kept.
fn closest_detectable<S: Collider>(
    shapes: &[S],
    tags: &TagRegistry,
    agent: EntityId,
    cell_center: Vec2,
    agent_position: Vec2,
) -> Option<(EntityId, usize)> {
    let mut closest = None;
    let mut min_distance = f32::MAX;

    for shape in shapes {
        if shape.owner() == agent {
            continue;
        }

        let distance = (shape.closest_point(cell_center) - agent_position).length_squared();
        if distance >= min_distance {
            continue;
        }

        if let Some(tag_index) = tags.index_of(shape.tag()) {
            min_distance = distance;
            closest = Some((shape.owner(), tag_index));
        }
    }

    closest
}

impl<S: Collider> Sensor for GridSensor<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn observation_shape(&self) -> ObservationShape {
        ObservationShape::Visual {
            height: self.spec.rows,
            width: self.spec.columns,
            channels: self.feature_width,
        }
    }

    fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Rows from the top of the grid down, columns left to right, channels
    /// innermost.
    fn write(&self, out: &mut [f32]) -> usize {
        let row_len = self.spec.columns * self.feature_width;
        let mut index = 0;
        for row in (0..self.spec.rows).rev() {
            let start = row * row_len;
            out[index..index + row_len].copy_from_slice(&self.perception[start..start + row_len]);
            index += row_len;
        }
        index
    }

    fn compressed_observation(
        &mut self,
        encoder: &dyn ImageEncoder,
    ) -> Result<Option<Vec<u8>>, CompressionError> {
        if self.compression != CompressionType::Png {
            return Ok(None);
        }
        Ok(Some(self.compressed_images(encoder)?.concat()))
    }
}
