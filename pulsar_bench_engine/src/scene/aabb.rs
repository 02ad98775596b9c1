/// Axis-aligned bounding box in world space.

use glam::{Vec3, Vec4};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    /// Create an AABB from min/max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted AABB that expands to fit the first point added.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Grow to contain a point.
    pub fn expand(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// The eight corner points.
    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Minimum and maximum signed distance of the corners from a plane
    /// (plane as (A, B, C, D), distance = dot(normal, p) + D).
    ///
    /// Used to stretch the camera depth range over visible geometry.
    pub fn distance_range_from_plane(&self, plane: Vec4) -> (f32, f32) {
        let mut min_d = f32::MAX;
        let mut max_d = f32::MIN;
        for corner in self.corners() {
            let d = plane.dot(corner.extend(1.0));
            min_d = min_d.min(d);
            max_d = max_d.max(d);
        }
        (min_d, max_d)
    }
}

#[cfg(test)]
#[path = "aabb_tests.rs"]
mod tests;
