//! Scene data module
//!
//! Passive input data for the visibility and shadow passes: meshes,
//! actors, lights and probes in SlotMaps, rooms and portals in an arena,
//! plus the optional PVS matrix. The scene computes nothing — the
//! FrustumCull and CascadedShadowMap consume it read-only.

mod aabb;
mod graph;
mod object;

pub use aabb::AABB;
pub use graph::{Connection, Portal, Pvs, Room, RoomId, SceneGraph};
pub use object::{
    Actor, ActorKey, Light, LightKey, LightKind, Mesh, MeshFlags, MeshKey,
    OpacityMode, PortalKey, Probe, ProbeKey,
};
