//! Visibility determination module
//!
//! Room/portal frustum culling with PVS pruning, pluggable mesh
//! bucketing/sorting policy, and a bounded pool of cull instances.

mod frustum_cull;
mod instance_pool;
mod mesh_filter;
mod overlap;

pub use frustum_cull::FrustumCull;
pub use instance_pool::{CullInstancePool, MAX_CULL_INSTANCES};
pub use mesh_filter::{
    depth_compare, depth_compare_alpha_test, reverse_depth_compare,
    MeshCompare, MeshFilter, MeshSortInfo, PassthroughMeshFilter,
};
pub use overlap::{overlap_aabb, Overlap};
