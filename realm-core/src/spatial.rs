//! Spatial query seam to the host physics engine
//!
//! The grid sensor only needs one primitive from the physics engine: "which
//! shapes overlap this axis-aligned box". The engine writes results into a
//! caller-owned buffer with a fixed limit, so the caller can detect
//! truncation and retry with a larger buffer. [`QueryBuffer`] owns that
//! grow-and-retry policy.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::Vec2;

/// Identity of the game object owning a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bit set of physics layers a query should consider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    /// Mask containing only `layer` (0..32)
    pub const fn layer(layer: u32) -> Self {
        LayerMask(1 << layer)
    }

    pub const fn contains(self, layer: u32) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// Axis-aligned box overlap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxQuery {
    pub center: Vec2,
    pub half_extent: Vec2,
    pub mask: LayerMask,
}

/// A shape returned by an overlap query
pub trait Collider {
    /// Entity the shape belongs to
    fn owner(&self) -> EntityId;

    /// Category label of the owning entity
    fn tag(&self) -> &str;

    /// Point on or inside the shape closest to `point`
    fn closest_point(&self, point: Vec2) -> Vec2;
}

/// Overlap queries provided by the host physics engine
pub trait SpatialQuery {
    type Shape: Collider;

    /// Collect shapes overlapping `query` into `out`
    ///
    /// Implementations append at most `limit` shapes and return the number
    /// appended. A return value equal to `limit` means the result may have
    /// been truncated.
    fn overlap_box(&self, query: &BoxQuery, limit: usize, out: &mut Vec<Self::Shape>) -> usize;
}

/// Capacity-tracked scratch buffer for overlap queries
///
/// The capacity starts at `initial` and doubles, capped at `max`, every time
/// a query fills it completely. Growth is sticky for the lifetime of the
/// buffer so steady-state sampling allocates nothing.
#[derive(Debug)]
pub struct QueryBuffer<S> {
    shapes: Vec<S>,
    capacity: usize,
    max_capacity: usize,
    grow_count: usize,
}

impl<S> QueryBuffer<S> {
    pub fn new(initial: usize, max: usize) -> Self {
        let capacity = initial.min(max).max(1);
        Self {
            shapes: Vec::with_capacity(capacity),
            capacity,
            max_capacity: max.max(capacity),
            grow_count: 0,
        }
    }

    /// Current query limit
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Number of times the buffer has grown
    pub fn grow_count(&self) -> usize {
        self.grow_count
    }

    /// Run `query` against `world`, growing and retrying on truncation
    ///
    /// Returns the shapes from the final attempt. If the buffer is already at
    /// its maximum capacity the (possibly truncated) result is returned as is.
    pub fn query_with_growth<Q>(&mut self, world: &Q, query: &BoxQuery) -> &[S]
    where
        Q: SpatialQuery<Shape = S>,
    {
        loop {
            self.shapes.clear();
            let found = world.overlap_box(query, self.capacity, &mut self.shapes);
            // Guard against engines that ignore the limit
            self.shapes.truncate(found.min(self.capacity));

            if found >= self.capacity && self.capacity < self.max_capacity {
                let grown = (self.capacity * 2).min(self.max_capacity);
                debug!(
                    "Collider query buffer full at {}, growing to {}",
                    self.capacity, grown
                );
                self.capacity = grown;
                self.shapes.reserve(grown);
                self.grow_count += 1;
            } else {
                break;
            }
        }
        &self.shapes
    }
}
