//! Shared fixtures for unit tests.

use crate::geometry::{Rect, Vec2};
use crate::spatial::{BoxQuery, Collider, EntityId, SpatialQuery};

/// Axis-aligned box collider.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    pub owner: EntityId,
    pub tag: String,
    pub layer: u32,
    pub bounds: Rect,
}

impl Collider for BoxShape {
    fn owner(&self) -> EntityId {
        self.owner
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn closest_point(&self, point: Vec2) -> Vec2 {
        self.bounds.closest_point(point)
    }
}

/// Brute-force world of box colliders.
///
/// `reversed` flips the order shapes are reported in, to check that results
/// do not depend on query order.
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    pub shapes: Vec<BoxShape>,
    pub reversed: bool,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a square of side `size` centered at `(x, y)` on layer 0.
    pub fn add(&mut self, owner: u64, tag: &str, x: f32, y: f32, size: f32) -> &mut Self {
        self.add_on_layer(owner, tag, x, y, size, 0)
    }

    pub fn add_on_layer(
        &mut self,
        owner: u64,
        tag: &str,
        x: f32,
        y: f32,
        size: f32,
        layer: u32,
    ) -> &mut Self {
        self.shapes.push(BoxShape {
            owner: EntityId(owner),
            tag: tag.to_string(),
            layer,
            bounds: Rect::from_center(Vec2::new(x, y), Vec2::new(size * 0.5, size * 0.5)),
        });
        self
    }
}

impl SpatialQuery for BoxWorld {
    type Shape = BoxShape;

    fn overlap_box(&self, query: &BoxQuery, limit: usize, out: &mut Vec<BoxShape>) -> usize {
        let area = Rect::from_center(query.center, query.half_extent);
        let hits = |shape: &&BoxShape| query.mask.contains(shape.layer) && shape.bounds.overlaps(&area);

        let before = out.len();
        if self.reversed {
            out.extend(self.shapes.iter().rev().filter(hits).take(limit).cloned());
        } else {
            out.extend(self.shapes.iter().filter(hits).take(limit).cloned());
        }
        out.len() - before
    }
}
