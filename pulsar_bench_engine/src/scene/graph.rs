/// SceneGraph — rooms, portals, objects and the PVS matrix.
///
/// Rooms live in an arena (`RoomId` is the index) because the portal
/// traversal keeps per-room path flags in a flat bit vector. Objects
/// live in SlotMaps with stable keys.

use glam::{Vec3, Vec4};
use slotmap::SlotMap;
use super::aabb::AABB;
use super::object::{
    Actor, ActorKey, Light, LightKey, Mesh, MeshKey, PortalKey, Probe, ProbeKey,
};
use crate::error::{Error, Result};

/// Arena index of a room.
pub type RoomId = usize;

/// A link from one room to another, optionally through a portal.
///
/// A connection without a portal ("plain" connection) is followed
/// whenever the target room's AABB overlaps the current plane set.
#[derive(Debug, Clone)]
pub struct Connection {
    pub other: RoomId,
    pub portal: Option<PortalKey>,
    pub enabled: bool,
}

/// A convex, ordered polygon between two rooms.
///
/// The plane is derived from the first three points; its facing only
/// matters relative to the camera eye (the cull picks the winding from
/// the eye's side).
#[derive(Debug, Clone)]
pub struct Portal {
    pub points: Vec<Vec3>,
    pub plane: Vec4,
}

impl Portal {
    /// Build a portal from its polygon points.
    ///
    /// # Errors
    ///
    /// `InvalidScene` when fewer than three points are given or the
    /// first three are collinear.
    pub fn new(points: Vec<Vec3>) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::InvalidScene(format!(
                "portal needs at least 3 points, got {}",
                points.len()
            )));
        }
        let normal = (points[1] - points[0]).cross(points[2] - points[0]);
        if normal.length_squared() <= f32::EPSILON {
            return Err(Error::InvalidScene(
                "portal points are collinear".to_string(),
            ));
        }
        let normal = normal.normalize();
        let plane = normal.extend(-normal.dot(points[0]));
        Ok(Self { points, plane })
    }
}

/// Potentially-visible-set matrix over room pairs.
///
/// `can_see(a, b)` answers "can any point of room `a` see room `b`".
/// The cull queries it with the camera room on the left.
#[derive(Debug, Clone)]
pub struct Pvs {
    room_count: usize,
    bits: Vec<bool>,
}

impl Pvs {
    /// A PVS where every room sees every room (the conservative default).
    pub fn all_visible(room_count: usize) -> Self {
        Self {
            room_count,
            bits: vec![true; room_count * room_count],
        }
    }

    pub fn set(&mut self, from: RoomId, to: RoomId, visible: bool) {
        self.bits[from * self.room_count + to] = visible;
    }

    /// Out-of-range queries answer true: missing data never culls.
    pub fn can_see(&self, from: RoomId, to: RoomId) -> bool {
        if from >= self.room_count || to >= self.room_count {
            return true;
        }
        self.bits[from * self.room_count + to]
    }
}

/// A room: bounds, membership planes, object keys and connections.
#[derive(Debug, Clone)]
pub struct Room {
    pub aabb: AABB,
    /// Convex membership planes with outward normals; a point is inside
    /// the room when dot(n, p) + d <= 0 for all of them. Empty means the
    /// room cannot be located by point queries.
    pub planes: Vec<Vec4>,
    pub meshes: Vec<MeshKey>,
    pub actors: Vec<ActorKey>,
    pub probes: Vec<ProbeKey>,
    pub connections: Vec<Connection>,
}

impl Room {
    pub fn new(aabb: AABB) -> Self {
        Self {
            aabb,
            planes: Vec::new(),
            meshes: Vec::new(),
            actors: Vec::new(),
            probes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Whether a point is inside the room's membership planes.
    ///
    /// Rooms without planes answer false.
    pub fn contains_point(&self, p: Vec3) -> bool {
        if self.planes.is_empty() {
            return false;
        }
        let hp = p.extend(1.0);
        self.planes.iter().all(|plane| plane.dot(hp) <= 0.0)
    }
}

/// The full scene the visibility passes consume.
pub struct SceneGraph {
    rooms: Vec<Room>,
    portals: SlotMap<PortalKey, Portal>,
    meshes: SlotMap<MeshKey, Mesh>,
    actors: SlotMap<ActorKey, Actor>,
    lights: SlotMap<LightKey, Light>,
    probes: SlotMap<ProbeKey, Probe>,
    pvs: Option<Pvs>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            rooms: Vec::new(),
            portals: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            actors: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            probes: SlotMap::with_key(),
            pvs: None,
        }
    }

    // ===== BUILDING =====

    pub fn add_room(&mut self, room: Room) -> RoomId {
        self.rooms.push(room);
        self.rooms.len() - 1
    }

    pub fn add_portal(&mut self, portal: Portal) -> PortalKey {
        self.portals.insert(portal)
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshKey {
        self.meshes.insert(mesh)
    }

    pub fn add_actor(&mut self, actor: Actor) -> ActorKey {
        self.actors.insert(actor)
    }

    pub fn add_light(&mut self, light: Light) -> LightKey {
        self.lights.insert(light)
    }

    pub fn add_probe(&mut self, probe: Probe) -> ProbeKey {
        self.probes.insert(probe)
    }

    /// Connect two rooms in both directions.
    pub fn connect_rooms(&mut self, a: RoomId, b: RoomId, portal: Option<PortalKey>) {
        self.rooms[a].connections.push(Connection {
            other: b,
            portal,
            enabled: true,
        });
        self.rooms[b].connections.push(Connection {
            other: a,
            portal,
            enabled: true,
        });
    }

    pub fn set_pvs(&mut self, pvs: Pvs) {
        self.pvs = Some(pvs);
    }

    // ===== QUERIES =====

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id]
    }

    pub fn room_mut(&mut self, id: RoomId) -> &mut Room {
        &mut self.rooms[id]
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// First room whose membership planes contain the point.
    pub fn room_containing(&self, p: Vec3) -> Option<RoomId> {
        self.rooms.iter().position(|room| room.contains_point(p))
    }

    pub fn portal(&self, key: PortalKey) -> Option<&Portal> {
        self.portals.get(key)
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut Mesh> {
        self.meshes.get_mut(key)
    }

    pub fn actor(&self, key: ActorKey) -> Option<&Actor> {
        self.actors.get(key)
    }

    pub fn actor_mut(&mut self, key: ActorKey) -> Option<&mut Actor> {
        self.actors.get_mut(key)
    }

    pub fn actor_keys(&self) -> impl Iterator<Item = ActorKey> + '_ {
        self.actors.keys()
    }

    pub fn light(&self, key: LightKey) -> Option<&Light> {
        self.lights.get(key)
    }

    pub fn light_mut(&mut self, key: LightKey) -> Option<&mut Light> {
        self.lights.get_mut(key)
    }

    pub fn probe(&self, key: ProbeKey) -> Option<&Probe> {
        self.probes.get(key)
    }

    pub fn pvs(&self) -> Option<&Pvs> {
        self.pvs.as_ref()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
