/// Camera — self-contained view/projection state.
///
/// A camera owns its placement (position, target, up) and projection
/// parameters. `update()` recomputes the derived state: view matrix,
/// projection matrix (OpenGL depth range, -1..1), view-projection and
/// frustum. Callers mutate parameters and call `update()` once before
/// using the derived state; the cull and shadow passes do this for the
/// cameras they build internally.

use glam::{Mat4, Vec3};
use crate::scene::AABB;
use super::frustum::Frustum;

/// Projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y_radians: f32,
        width: f32,
        height: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    /// Near plane distance
    pub fn near(&self) -> f32 {
        match *self {
            Projection::Perspective { near, .. } => near,
            Projection::Orthographic { near, .. } => near,
        }
    }

    /// Far plane distance
    pub fn far(&self) -> f32 {
        match *self {
            Projection::Perspective { far, .. } => far,
            Projection::Orthographic { far, .. } => far,
        }
    }

    fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective { fov_y_radians, width, height, near, far } => {
                // Degenerate viewport clamps to a square aspect
                let aspect = if height > 0.0 { width / height } else { 1.0 };
                Mat4::perspective_rh_gl(fov_y_radians, aspect, near, far)
            }
            Projection::Orthographic { left, right, bottom, top, near, far } => {
                Mat4::orthographic_rh_gl(left, right, bottom, top, near, far)
            }
        }
    }
}

/// A computing camera.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    projection: Projection,

    // Derived by update()
    view_matrix: Mat4,
    projection_matrix: Mat4,
    view_projection_matrix: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Create a perspective camera at the origin looking down -Z.
    pub fn perspective(fov_y_radians: f32, width: f32, height: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Perspective { fov_y_radians, width, height, near, far })
    }

    /// Create an orthographic camera at the origin looking down -Z.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Orthographic { left, right, bottom, top, near, far })
    }

    fn new(projection: Projection) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            projection,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
            frustum: Frustum::from_view_projection(&Mat4::IDENTITY),
        };
        camera.update();
        camera
    }

    /// Place the camera. Recomputes the derived state.
    pub fn look_at(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.position = position;
        self.target = target;
        self.up = up;
        self.update();
    }

    /// Replace the projection parameters. Recomputes the derived state.
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.update();
    }

    /// Recompute view, projection, view-projection and frustum from
    /// the current parameters.
    pub fn update(&mut self) {
        self.view_matrix = Mat4::look_at_rh(self.position, self.target, self.up);
        self.projection_matrix = self.projection.matrix();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_view_projection(&self.view_projection_matrix);
    }

    // ===== GETTERS =====

    /// Camera position (world space)
    pub fn eye(&self) -> Vec3 {
        self.position
    }

    /// Normalized view direction
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// Up vector
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Projection parameters
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Near plane distance
    pub fn near(&self) -> f32 {
        self.projection.near()
    }

    /// Far plane distance
    pub fn far(&self) -> f32 {
        self.projection.far()
    }

    /// View matrix (inverse of the camera's world transform)
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix (perspective or orthographic, GL depth range)
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view)
    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection_matrix
    }

    /// Frustum planes for culling
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Conservative frustum visibility test for an AABB.
    pub fn is_visible(&self, aabb: &AABB) -> bool {
        self.frustum.intersects_aabb(aabb)
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
