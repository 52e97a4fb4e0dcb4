//! Plain 2D/3D value types shared by sensors, actuators and scenarios

use std::ops::{Add, AddAssign, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Two-component vector in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns the vector scaled down to length `max` if it is longer
    pub fn clamp_length(self, max: f32) -> Self {
        let len = self.length();
        if len > max && len > 0.0 {
            self * (max / len)
        } else {
            self
        }
    }

    /// Component-wise minimum
    pub fn min(self, other: Vec2) -> Self {
        Vec2::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum
    pub fn max(self, other: Vec2) -> Self {
        Vec2::new(self.x.max(other.x), self.y.max(other.y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Component-wise division
impl Div for Vec2 {
    type Output = Vec2;

    fn div(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x / rhs.x, self.y / rhs.y)
    }
}

/// Three-component vector, only ever passed through to and from callbacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Rectangle given by a corner and a signed size
///
/// Width and height may be negative, in which case `x`/`y` is not the minimum
/// corner. Use [`Rect::min`] and [`Rect::max`] to get ordered corners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle centered on `center` spanning `2 * half_extent`
    pub fn from_center(center: Vec2, half_extent: Vec2) -> Self {
        Self::new(
            center.x - half_extent.x,
            center.y - half_extent.y,
            half_extent.x * 2.0,
            half_extent.y * 2.0,
        )
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x.min(self.x + self.width), self.y.min(self.y + self.height))
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x.max(self.x + self.width), self.y.max(self.y + self.height))
    }

    pub fn center(&self) -> Vec2 {
        let (min, max) = (self.min(), self.max());
        Vec2::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5)
    }

    /// Inclusive containment test (points on the edge are inside)
    pub fn contains(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Whether the two rectangles share any area or edge
    pub fn overlaps(&self, other: &Rect) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x <= b_max.x && b_min.x <= a_max.x && a_min.y <= b_max.y && b_min.y <= a_max.y
    }

    /// Closest point inside the rectangle to `point`
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.max(self.min()).min(self.max())
    }
}
