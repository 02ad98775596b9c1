//! Cascaded shadow mapping module
//!
//! Slices the view frustum into depth cascades, fits a directional
//! light's orthographic camera to each slice, records one depth-only
//! job per cascade, and exposes the bias matrices and split distances
//! the lighting shaders consume.

mod cascaded_shadow_map;
mod shadow_mesh_filter;

pub use cascaded_shadow_map::{
    CascadeFit, CascadedShadowMap, SelectionMode, MAX_CASCADES,
};
pub use shadow_mesh_filter::ShadowMeshFilter;
