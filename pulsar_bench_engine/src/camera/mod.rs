//! Camera module — computing camera and frustum.
//!
//! Cameras here are self-contained: they own their placement and
//! projection parameters and recompute view/projection/frustum on
//! `update()`. The visibility and shadow passes build and drive their
//! own cameras, so nothing in the engine stores them globally.

mod camera;
mod frustum;

pub use camera::{Camera, Projection};
pub use frustum::{
    Frustum, FrustumTest,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
