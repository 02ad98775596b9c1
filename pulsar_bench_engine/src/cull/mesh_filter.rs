/// MeshFilter — bucketing and sorting policy for culled meshes.
///
/// Passes customize what the cull collects: a filter assigns every
/// non-culled mesh to a bucket ("mesh type") or rejects it, and picks a
/// comparator per bucket. The shadow pass uses this to keep only
/// shadow casters; a G-buffer pass would split opaque from transparent.

use std::cmp::Ordering;
use crate::camera::Camera;
use crate::scene::{Mesh, MeshKey};
use super::overlap::Overlap;

/// Sort record for one visible mesh.
#[derive(Debug, Clone, Copy)]
pub struct MeshSortInfo {
    pub mesh: MeshKey,
    /// Alpha-tested materials sort after opaque ones in some buckets
    pub alpha_tested: bool,
    /// Signed distance of the mesh center from the camera near plane
    pub depth: f32,
}

/// Comparator for one bucket.
pub type MeshCompare = fn(&MeshSortInfo, &MeshSortInfo) -> Ordering;

/// Front-to-back.
pub fn depth_compare(a: &MeshSortInfo, b: &MeshSortInfo) -> Ordering {
    a.depth.total_cmp(&b.depth)
}

/// Opaque before alpha-tested, front-to-back within each group.
pub fn depth_compare_alpha_test(a: &MeshSortInfo, b: &MeshSortInfo) -> Ordering {
    a.alpha_tested
        .cmp(&b.alpha_tested)
        .then(a.depth.total_cmp(&b.depth))
}

/// Back-to-front (transparents, light shafts).
pub fn reverse_depth_compare(a: &MeshSortInfo, b: &MeshSortInfo) -> Ordering {
    b.depth.total_cmp(&a.depth)
}

/// Bucketing/sorting policy, shared between cull instances.
pub trait MeshFilter: Send + Sync {
    /// Assign a mesh to a bucket, or `None` to drop it from the output.
    fn filter_mesh(&self, camera: &Camera, mesh: &Mesh, overlap: Overlap) -> Option<usize>;

    /// Number of buckets the filter produces.
    fn max_mesh_types(&self) -> usize;

    /// Comparator for a bucket; `None` leaves it in visit order.
    fn sort_function(&self, mesh_type: usize) -> Option<MeshCompare>;
}

/// Accepts every mesh into a single unsorted bucket.
pub struct PassthroughMeshFilter;

impl MeshFilter for PassthroughMeshFilter {
    fn filter_mesh(&self, _camera: &Camera, _mesh: &Mesh, _overlap: Overlap) -> Option<usize> {
        Some(0)
    }

    fn max_mesh_types(&self) -> usize {
        1
    }

    fn sort_function(&self, _mesh_type: usize) -> Option<MeshCompare> {
        None
    }
}

#[cfg(test)]
#[path = "mesh_filter_tests.rs"]
mod tests;
