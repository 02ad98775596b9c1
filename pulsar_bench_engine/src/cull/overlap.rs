/// 3-way AABB test against a convex set of outward-pointing planes.
///
/// Convention here is the opposite of the camera frustum: normals point
/// out of the volume, a point is inside when dot(n, p) + d <= 0. The
/// portal cull negates camera frustum planes on entry and builds portal
/// planes directly in this convention.

use glam::{Vec3, Vec4};
use crate::scene::AABB;

/// Result of an AABB/plane-set overlap test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// Entirely outside at least one plane
    Outside,
    /// Straddles at least one plane
    Intersect,
    /// Entirely inside all planes
    Inside,
}

/// Classify an AABB against outward planes.
///
/// Per plane, the corner closest to the inside (n-vertex) and the corner
/// furthest out (p-vertex) are tested; if even the closest corner is
/// outside one plane the box is out.
pub fn overlap_aabb(planes: &[Vec4], aabb: &AABB) -> Overlap {
    let mut result = Overlap::Inside;

    for plane in planes {
        let vmin = Vec3::new(
            if plane.x > 0.0 { aabb.min.x } else { aabb.max.x },
            if plane.y > 0.0 { aabb.min.y } else { aabb.max.y },
            if plane.z > 0.0 { aabb.min.z } else { aabb.max.z },
        );
        let vmax = Vec3::new(
            if plane.x > 0.0 { aabb.max.x } else { aabb.min.x },
            if plane.y > 0.0 { aabb.max.y } else { aabb.min.y },
            if plane.z > 0.0 { aabb.max.z } else { aabb.min.z },
        );

        if plane.dot(vmin.extend(1.0)) > 0.0 {
            return Overlap::Outside;
        }
        if plane.dot(vmax.extend(1.0)) >= 0.0 {
            result = Overlap::Intersect;
        }
    }

    result
}

#[cfg(test)]
#[path = "overlap_tests.rs"]
mod tests;
