//! Axis-aligned box physics for the arena
//!
//! Just enough of a physics world for the arena: static and movable box
//! colliders on a handful of layers, answering overlap queries by brute
//! force in insertion order.

use realm_core::geometry::{Rect, Vec2};
use realm_core::spatial::{BoxQuery, Collider, EntityId, LayerMask, SpatialQuery};

pub const WALL_TAG: &str = "wall";
pub const COIN_TAG: &str = "coin";
pub const LAVA_TAG: &str = "lava";
pub const PLAYER_TAG: &str = "player";

pub const STATIC_LAYER: u32 = 0;
pub const PICKUP_LAYER: u32 = 1;
pub const HAZARD_LAYER: u32 = 2;
pub const AGENT_LAYER: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ArenaCollider {
    pub owner: EntityId,
    pub tag: &'static str,
    pub layer: u32,
    pub bounds: Rect,
}

impl Collider for ArenaCollider {
    fn owner(&self) -> EntityId {
        self.owner
    }

    fn tag(&self) -> &str {
        self.tag
    }

    fn closest_point(&self, point: Vec2) -> Vec2 {
        self.bounds.closest_point(point)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArenaWorld {
    colliders: Vec<ArenaCollider>,
    next_entity: u64,
}

impl ArenaWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collider for a fresh entity and return the entity
    pub fn spawn(&mut self, tag: &'static str, layer: u32, bounds: Rect) -> EntityId {
        self.next_entity += 1;
        let owner = EntityId(self.next_entity);
        self.colliders.push(ArenaCollider {
            owner,
            tag,
            layer,
            bounds,
        });
        owner
    }

    /// Remove every collider owned by `owner`
    pub fn despawn(&mut self, owner: EntityId) {
        self.colliders.retain(|collider| collider.owner != owner);
    }

    /// Move the colliders of `owner` so they are centered on `center`
    pub fn move_to(&mut self, owner: EntityId, center: Vec2) {
        for collider in self.colliders.iter_mut().filter(|c| c.owner == owner) {
            let half = Vec2::new(collider.bounds.width.abs(), collider.bounds.height.abs()) * 0.5;
            collider.bounds = Rect::from_center(center, half);
        }
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
        self.next_entity = 0;
    }

    pub fn colliders(&self) -> &[ArenaCollider] {
        &self.colliders
    }

    /// Colliders overlapping `area` on layers in `mask`, skipping `ignore`
    pub fn overlapping<'a>(
        &'a self,
        area: Rect,
        mask: LayerMask,
        ignore: EntityId,
    ) -> impl Iterator<Item = &'a ArenaCollider> + 'a {
        self.colliders.iter().filter(move |collider| {
            collider.owner != ignore && mask.contains(collider.layer) && collider.bounds.overlaps(&area)
        })
    }
}

impl SpatialQuery for ArenaWorld {
    type Shape = ArenaCollider;

    fn overlap_box(&self, query: &BoxQuery, limit: usize, out: &mut Vec<ArenaCollider>) -> usize {
        let area = Rect::from_center(query.center, query.half_extent);
        let before = out.len();
        out.extend(
            self.colliders
                .iter()
                .filter(|collider| query.mask.contains(collider.layer) && collider.bounds.overlaps(&area))
                .take(limit)
                .cloned(),
        );
        out.len() - before
    }
}
