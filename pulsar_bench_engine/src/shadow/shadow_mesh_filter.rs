/// Mesh filter for the shadow passes: one bucket, shadow casters only.

use crate::camera::Camera;
use crate::cull::{depth_compare, MeshCompare, MeshFilter, Overlap};
use crate::scene::{Mesh, MeshFlags};

pub struct ShadowMeshFilter;

impl MeshFilter for ShadowMeshFilter {
    fn filter_mesh(&self, _camera: &Camera, mesh: &Mesh, _overlap: Overlap) -> Option<usize> {
        mesh.flags.contains(MeshFlags::CAST_SHADOW).then_some(0)
    }

    fn max_mesh_types(&self) -> usize {
        1
    }

    fn sort_function(&self, _mesh_type: usize) -> Option<MeshCompare> {
        // Front-to-back for depth-only rendering
        Some(depth_compare)
    }
}
