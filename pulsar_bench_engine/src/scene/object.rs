/// Renderable scene objects: meshes, actors, lights, probes.
///
/// All objects are plain data keyed by SlotMap keys; rooms reference them
/// by key. Keys stay valid while the object is in the SceneGraph.

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use slotmap::new_key_type;
use super::aabb::AABB;

new_key_type! {
    /// Stable key for a Mesh in the SceneGraph
    pub struct MeshKey;
    /// Stable key for an Actor in the SceneGraph
    pub struct ActorKey;
    /// Stable key for a Light in the SceneGraph
    pub struct LightKey;
    /// Stable key for a Probe in the SceneGraph
    pub struct ProbeKey;
    /// Stable key for a Portal in the SceneGraph
    pub struct PortalKey;
}

bitflags! {
    /// Mesh state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MeshFlags: u32 {
        /// Mesh is drawn into shadow maps
        const CAST_SHADOW = 1 << 0;
        /// Rasterize without backface culling
        const TWO_SIDED = 1 << 1;
    }
}

/// How the mesh's material treats alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpacityMode {
    Opaque,
    AlphaTest,
    Transparent,
}

/// A renderable mesh. Bounds and center are world space.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub aabb: AABB,
    /// World-space center used for depth sorting
    pub center: Vec3,
    pub world_transform: Mat4,
    pub visible: bool,
    pub flags: MeshFlags,
    pub opacity: OpacityMode,
    pub skinned: bool,
}

impl Mesh {
    pub fn new(aabb: AABB) -> Self {
        Self {
            aabb,
            center: aabb.center(),
            world_transform: Mat4::IDENTITY,
            visible: true,
            flags: MeshFlags::CAST_SHADOW,
            opacity: OpacityMode::Opaque,
            skinned: false,
        }
    }
}

/// A dynamic object grouping meshes and lights under one bounding box.
#[derive(Debug, Clone)]
pub struct Actor {
    pub aabb: AABB,
    pub meshes: Vec<MeshKey>,
    pub lights: Vec<LightKey>,
}

impl Actor {
    pub fn new(aabb: AABB) -> Self {
        Self {
            aabb,
            meshes: Vec::new(),
            lights: Vec::new(),
        }
    }
}

/// Light source kind.
///
/// A non-boxed directional light has no meaningful bounds and is always
/// treated as visible by the cull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional { boxed: bool },
    Spot,
    Omni,
}

/// A light source.
#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    pub aabb: AABB,
    pub visible: bool,
    /// Collected separately and sorted back-to-front for the shaft pass
    pub light_shaft: bool,
}

impl Light {
    pub fn new(kind: LightKind, aabb: AABB) -> Self {
        Self {
            kind,
            aabb,
            visible: true,
            light_shaft: false,
        }
    }

    /// Whether the light has bounds the cull can test.
    pub fn has_aabb(&self) -> bool {
        !matches!(self.kind, LightKind::Directional { boxed: false })
    }
}

/// An environment probe.
#[derive(Debug, Clone)]
pub struct Probe {
    pub aabb: AABB,
}

impl Probe {
    pub fn new(aabb: AABB) -> Self {
        Self { aabb }
    }
}
