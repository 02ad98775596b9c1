/// FrustumCull — room/portal visibility determination.
///
/// One instance culls one view. Per frame it negates the camera frustum
/// into outward planes, walks the room graph through portals (clipping
/// each portal polygon and tightening the plane set), stamps every
/// object it touches so multi-path reachability cannot duplicate
/// output, derives a near/far range from visible bounds, and sorts the
/// mesh buckets with the MeshFilter's comparators.
///
/// Instances take an id from a CullInstancePool and return it on drop.

use std::sync::Arc;
use glam::{Vec3, Vec4};
use rustc_hash::FxHashSet;
use slotmap::SecondaryMap;
use crate::camera::{Camera, PLANE_NEAR};
use crate::scene::{
    AABB, Actor, ActorKey, Light, LightKey, MeshKey, OpacityMode, ProbeKey,
    RoomId, SceneGraph,
};
use super::instance_pool::CullInstancePool;
use super::mesh_filter::{MeshFilter, MeshSortInfo};
use super::overlap::{overlap_aabb, Overlap};

const DEFAULT_NEAR: f32 = 0.1;
const DEFAULT_FAR: f32 = 1000.0;

/// Extra slack added to the derived far distance.
const FAR_SLACK: f32 = 5.0;

/// Depth-first traversal step. `Leave` clears the path flag set by the
/// matching `Enter`, which keeps portal cycles from re-entering a room
/// that is on the current traversal path.
enum Step {
    Enter(RoomId, Vec<Vec4>),
    Leave(RoomId),
}

pub struct FrustumCull {
    instance_id: u32,
    pool: CullInstancePool,
    mesh_filter: Arc<dyn MeshFilter>,

    camera: Camera,
    frame_counter: u32,

    // Toggles
    partitions_enabled: bool,
    pvs_enabled: bool,
    cull_lights: bool,
    cull_actors: bool,
    cull_probes: bool,
    cull_with_near_far: bool,
    default_near: f32,
    default_far: f32,
    excluded_actors: FxHashSet<ActorKey>,

    // Per-frame stamps (valid when equal to frame_counter)
    mesh_stamps: SecondaryMap<MeshKey, u32>,
    actor_stamps: SecondaryMap<ActorKey, u32>,
    light_stamps: SecondaryMap<LightKey, u32>,
    probe_stamps: SecondaryMap<ProbeKey, u32>,
    room_on_path: Vec<bool>,

    // Outputs
    camera_room: Option<RoomId>,
    visible_rooms: Vec<RoomId>,
    visible_room_set: FxHashSet<RoomId>,
    visible_meshes: Vec<Vec<MeshKey>>,
    visible_lights: Vec<LightKey>,
    visible_light_shafts: Vec<LightKey>,
    visible_probes: Vec<ProbeKey>,
    visible_probes_inside: Vec<ProbeKey>,
    visible_probes_outside: Vec<ProbeKey>,
    visible_actor_count: u32,
    near: f32,
    far: f32,
}

impl FrustumCull {
    /// Take an instance from the pool.
    ///
    /// # Panics
    ///
    /// When the pool already has `MAX_CULL_INSTANCES` live instances.
    pub fn new(pool: &CullInstancePool, mesh_filter: Arc<dyn MeshFilter>) -> Self {
        let instance_id = pool.acquire();
        let bucket_count = mesh_filter.max_mesh_types();

        Self {
            instance_id,
            pool: pool.clone(),
            mesh_filter,
            camera: Camera::perspective(
                std::f32::consts::FRAC_PI_2,
                1.0,
                1.0,
                DEFAULT_NEAR,
                DEFAULT_FAR,
            ),
            frame_counter: 0,
            partitions_enabled: true,
            pvs_enabled: true,
            cull_lights: true,
            cull_actors: true,
            cull_probes: true,
            cull_with_near_far: false,
            default_near: DEFAULT_NEAR,
            default_far: DEFAULT_FAR,
            excluded_actors: FxHashSet::default(),
            mesh_stamps: SecondaryMap::new(),
            actor_stamps: SecondaryMap::new(),
            light_stamps: SecondaryMap::new(),
            probe_stamps: SecondaryMap::new(),
            room_on_path: Vec::new(),
            camera_room: None,
            visible_rooms: Vec::new(),
            visible_room_set: FxHashSet::default(),
            visible_meshes: vec![Vec::new(); bucket_count],
            visible_lights: Vec::new(),
            visible_light_shafts: Vec::new(),
            visible_probes: Vec::new(),
            visible_probes_inside: Vec::new(),
            visible_probes_outside: Vec::new(),
            visible_actor_count: 0,
            near: f32::MAX,
            far: f32::MIN,
        }
    }

    // ===== CONFIGURATION =====

    pub fn set_partitions_enabled(&mut self, value: bool) {
        self.partitions_enabled = value;
    }

    pub fn set_pvs_enabled(&mut self, value: bool) {
        self.pvs_enabled = value;
    }

    pub fn set_cull_lights(&mut self, value: bool) {
        self.cull_lights = value;
    }

    pub fn set_cull_actors(&mut self, value: bool) {
        self.cull_actors = value;
    }

    pub fn set_cull_probes(&mut self, value: bool) {
        self.cull_probes = value;
    }

    /// Include the far plane in the cull plane set (near is always used).
    pub fn set_cull_with_near_far(&mut self, value: bool) {
        self.cull_with_near_far = value;
    }

    /// Fallback depth range when no visible bounds contribute one.
    pub fn set_default_near_far(&mut self, near: f32, far: f32) {
        self.default_near = near;
        self.default_far = far;
    }

    /// Keep an actor out of this cull's output (e.g. sky in shadow passes).
    pub fn exclude_actor(&mut self, actor: ActorKey) {
        self.excluded_actors.insert(actor);
    }

    // ===== RESULTS =====

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    /// Derived near distance (valid after `cull`).
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Derived far distance (valid after `cull`).
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Room containing the camera, when partitions located one.
    pub fn camera_room(&self) -> Option<RoomId> {
        self.camera_room
    }

    /// Visible rooms in first-visit order.
    pub fn visible_rooms(&self) -> &[RoomId] {
        &self.visible_rooms
    }

    pub fn is_room_visible(&self, room: RoomId) -> bool {
        self.visible_room_set.contains(&room)
    }

    pub fn bucket_count(&self) -> usize {
        self.visible_meshes.len()
    }

    /// Visible meshes of one bucket, sorted by the filter's comparator.
    pub fn visible_meshes(&self, bucket: usize) -> &[MeshKey] {
        &self.visible_meshes[bucket]
    }

    pub fn visible_lights(&self) -> &[LightKey] {
        &self.visible_lights
    }

    /// Shaft-casting visible lights, back-to-front.
    pub fn visible_light_shafts(&self) -> &[LightKey] {
        &self.visible_light_shafts
    }

    pub fn visible_probes(&self) -> &[ProbeKey] {
        &self.visible_probes
    }

    /// Visible probes with a corner on the eye side of the near plane.
    pub fn visible_probes_inside(&self) -> &[ProbeKey] {
        &self.visible_probes_inside
    }

    pub fn visible_probes_outside(&self) -> &[ProbeKey] {
        &self.visible_probes_outside
    }

    pub fn visible_actor_count(&self) -> u32 {
        self.visible_actor_count
    }

    // ===== CULLING =====

    /// Cull the scene from a camera.
    ///
    /// Outputs replace the previous frame's; the instance can be reused
    /// every frame without reallocation.
    pub fn cull(&mut self, scene: &SceneGraph, camera: &Camera) {
        self.reset();
        self.camera = camera.clone();
        self.camera.update();

        // Outward planes: left, right, bottom, top, near[, far]
        let frustum_planes = self.camera.frustum().planes;
        let mut planes = [Vec4::ZERO; 6];
        for (out, inward) in planes.iter_mut().zip(frustum_planes.iter()) {
            *out = -*inward;
        }
        let plane_count = if self.cull_with_near_far { 6 } else { 5 };
        let planes = &planes[..plane_count];

        self.room_on_path.clear();
        self.room_on_path.resize(scene.room_count(), false);

        let mut partitioned = self.partitions_enabled && scene.room_count() > 1;
        if partitioned {
            self.camera_room = scene.room_containing(self.camera.eye());
            match self.camera_room {
                Some(room) => self.traverse(scene, room, planes, true),
                None => partitioned = false,
            }
        }

        if !partitioned {
            // Non-partitioned fallback: room 0 contents + brute-force actors
            if scene.room_count() > 0 {
                self.traverse(scene, 0, planes, false);
            }
            if self.cull_actors {
                self.cull_all_actors(scene);
            }
        }

        self.clamp_near_far();
        self.sort_buckets(scene);
        self.sort_light_shafts(scene);
    }

    fn reset(&mut self) {
        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.camera_room = None;
        self.visible_rooms.clear();
        self.visible_room_set.clear();
        for bucket in &mut self.visible_meshes {
            bucket.clear();
        }
        self.visible_lights.clear();
        self.visible_light_shafts.clear();
        self.visible_probes.clear();
        self.visible_probes_inside.clear();
        self.visible_probes_outside.clear();
        self.visible_actor_count = 0;
        self.near = f32::MAX;
        self.far = f32::MIN;
    }

    /// Depth-first room walk. With `partitioned` false only the start
    /// room's contents are visited.
    fn traverse(&mut self, scene: &SceneGraph, start: RoomId, planes: &[Vec4], partitioned: bool) {
        let mut stack = vec![Step::Enter(start, planes.to_vec())];

        while let Some(step) = stack.pop() {
            match step {
                Step::Leave(room) => self.room_on_path[room] = false,
                Step::Enter(room, planes) => {
                    self.visit_room(scene, room, &planes);
                    if !partitioned {
                        continue;
                    }

                    self.room_on_path[room] = true;
                    stack.push(Step::Leave(room));

                    let mut descents = Vec::new();
                    for conn in &scene.room(room).connections {
                        if !conn.enabled || self.room_on_path[conn.other] {
                            continue;
                        }
                        if !self.pvs_allows(scene, conn.other) {
                            continue;
                        }

                        match conn.portal.and_then(|key| scene.portal(key)) {
                            Some(portal) => {
                                let clipped = clip_polygon(&portal.points, &planes);
                                let new_planes =
                                    self.portal_planes(&clipped, portal.plane);
                                if !new_planes.is_empty() {
                                    descents.push(Step::Enter(conn.other, new_planes));
                                }
                            }
                            None => {
                                let other_aabb = &scene.room(conn.other).aabb;
                                if overlap_aabb(&planes, other_aabb) != Overlap::Outside {
                                    descents.push(Step::Enter(conn.other, planes.clone()));
                                }
                            }
                        }
                    }

                    // Reverse so the first connection is processed first
                    for step in descents.into_iter().rev() {
                        stack.push(step);
                    }
                }
            }
        }
    }

    fn pvs_allows(&self, scene: &SceneGraph, other: RoomId) -> bool {
        if !self.pvs_enabled {
            return true;
        }
        match (scene.pvs(), self.camera_room) {
            (Some(pvs), Some(camera_room)) => pvs.can_see(camera_room, other),
            // Missing PVS or unknown camera room never culls
            _ => true,
        }
    }

    /// Build the tightened plane set seen through a clipped portal: one
    /// plane per polygon edge, through the edge and the eye, wound by
    /// the eye's side of the portal plane.
    fn portal_planes(&self, clipped: &[Vec3], portal_plane: Vec4) -> Vec<Vec4> {
        if clipped.is_empty() {
            return Vec::new();
        }

        let eye = self.camera.eye();
        let eye_side = portal_plane.dot(eye.extend(1.0)) > 0.0;

        let mut planes = Vec::with_capacity(clipped.len());
        for j in 0..clipped.len() {
            let p0 = clipped[j];
            let p1 = clipped[(j + 1) % clipped.len()];

            let edge = p1 - p0;
            let to_eye = eye - p0;
            let normal = if eye_side {
                edge.cross(to_eye)
            } else {
                to_eye.cross(edge)
            };
            if normal.length_squared() <= f32::EPSILON {
                continue;
            }
            let normal = normal.normalize();
            planes.push(normal.extend(-normal.dot(p0)));
        }
        planes
    }

    fn visit_room(&mut self, scene: &SceneGraph, room_id: RoomId, planes: &[Vec4]) {
        if self.visible_room_set.insert(room_id) {
            self.visible_rooms.push(room_id);
        }
        let room = scene.room(room_id);

        for &key in &room.meshes {
            let Some(mesh) = scene.mesh(key) else { continue };
            if self.mesh_stamps.get(key) == Some(&self.frame_counter) {
                continue;
            }
            let overlap = overlap_aabb(planes, &mesh.aabb);
            if overlap != Overlap::Outside {
                self.mesh_stamps.insert(key, self.frame_counter);
                if let Some(bucket) = self.mesh_filter.filter_mesh(&self.camera, mesh, overlap) {
                    debug_assert!(bucket < self.visible_meshes.len());
                    self.visible_meshes[bucket].push(key);
                }
            }
        }

        if self.cull_actors {
            for &key in &room.actors {
                let Some(actor) = scene.actor(key) else { continue };
                if self.actor_stamps.get(key) == Some(&self.frame_counter) {
                    continue;
                }

                // Stamp only on acceptance: a rejection against this
                // path's plane set must not stop a wider portal path
                // from accepting the same actor later in the traversal
                if !self.excluded_actors.contains(&key)
                    && overlap_aabb(planes, &actor.aabb) != Overlap::Outside
                {
                    self.actor_stamps.insert(key, self.frame_counter);
                    if self.collect_actor_meshes(scene, actor) {
                        self.visible_actor_count += 1;
                    }
                    self.adjust_near_far(&actor.aabb);
                }

                // Actor lights are culled once per frame regardless of
                // the actor's own frustum result
                if self.cull_lights {
                    for &light_key in &actor.lights {
                        let Some(light) = scene.light(light_key) else { continue };
                        if light.visible {
                            self.cull_light(light_key, light);
                        }
                    }
                }
            }
        }

        if self.cull_probes {
            // Outward near plane: on/behind it means eye side
            let near_plane = -self.camera.frustum().planes[PLANE_NEAR];
            for &key in &room.probes {
                let Some(probe) = scene.probe(key) else { continue };
                if self.probe_stamps.get(key) == Some(&self.frame_counter) {
                    continue;
                }

                // Stamp only on acceptance, as for actors above
                if overlap_aabb(planes, &probe.aabb) != Overlap::Outside {
                    self.probe_stamps.insert(key, self.frame_counter);
                    self.visible_probes.push(key);
                    let inside = probe
                        .aabb
                        .corners()
                        .iter()
                        .any(|c| near_plane.dot(c.extend(1.0)) >= 0.0);
                    if inside {
                        self.visible_probes_inside.push(key);
                    } else {
                        self.visible_probes_outside.push(key);
                    }
                }
            }
        }

        self.adjust_near_far(&room.aabb);
    }

    /// Push an actor's visible meshes through the filter. Returns
    /// whether any mesh made it into a bucket.
    fn collect_actor_meshes(&mut self, scene: &SceneGraph, actor: &Actor) -> bool {
        let mut any = false;
        for &key in &actor.meshes {
            let Some(mesh) = scene.mesh(key) else { continue };
            if !mesh.visible {
                continue;
            }
            if let Some(bucket) =
                self.mesh_filter.filter_mesh(&self.camera, mesh, Overlap::Intersect)
            {
                debug_assert!(bucket < self.visible_meshes.len());
                self.visible_meshes[bucket].push(key);
                any = true;
            }
        }
        any
    }

    /// Brute-force actor pass for unpartitioned scenes.
    fn cull_all_actors(&mut self, scene: &SceneGraph) {
        for key in scene.actor_keys() {
            let Some(actor) = scene.actor(key) else { continue };
            if self.actor_stamps.get(key) == Some(&self.frame_counter) {
                continue;
            }
            self.actor_stamps.insert(key, self.frame_counter);

            if !self.excluded_actors.contains(&key) && self.camera.is_visible(&actor.aabb) {
                if self.collect_actor_meshes(scene, actor) {
                    self.visible_actor_count += 1;
                }
                self.adjust_near_far(&actor.aabb);
            }

            if self.cull_lights {
                for &light_key in &actor.lights {
                    let Some(light) = scene.light(light_key) else { continue };
                    if light.visible {
                        self.cull_light(light_key, light);
                    }
                }
            }
        }
    }

    fn cull_light(&mut self, key: LightKey, light: &Light) {
        if self.light_stamps.get(key) == Some(&self.frame_counter) {
            return;
        }
        self.light_stamps.insert(key, self.frame_counter);

        let has_aabb = light.has_aabb();
        if has_aabb && !self.camera.is_visible(&light.aabb) {
            return;
        }

        self.visible_lights.push(key);
        if has_aabb {
            self.adjust_near_far(&light.aabb);
        }
        if light.light_shaft {
            self.visible_light_shafts.push(key);
        }
    }

    /// Stretch the derived depth range over a visible bound.
    fn adjust_near_far(&mut self, aabb: &AABB) {
        let near_plane = self.camera.frustum().planes[PLANE_NEAR];
        let (min_d, max_d) = aabb.distance_range_from_plane(near_plane);
        self.near = self.near.min(min_d);
        self.far = self.far.max(max_d);
    }

    /// Degenerate ranges (nothing visible, bounds behind the camera)
    /// clamp to the configured defaults.
    fn clamp_near_far(&mut self) {
        if !self.near.is_finite() || self.near < 0.0 || self.near == f32::MAX {
            self.near = self.default_near;
        }
        if !self.far.is_finite() || self.far < 0.0 || self.far == f32::MIN {
            self.far = self.default_far;
        } else {
            self.far += FAR_SLACK;
        }
    }

    fn sort_buckets(&mut self, scene: &SceneGraph) {
        let near_plane = self.camera.frustum().planes[PLANE_NEAR];

        for bucket in 0..self.visible_meshes.len() {
            let Some(compare) = self.mesh_filter.sort_function(bucket) else { continue };

            let mut infos: Vec<MeshSortInfo> = self.visible_meshes[bucket]
                .iter()
                .map(|&key| {
                    let (alpha_tested, depth) = match scene.mesh(key) {
                        Some(mesh) => (
                            mesh.opacity == OpacityMode::AlphaTest,
                            near_plane.dot(mesh.center.extend(1.0)),
                        ),
                        None => (false, 0.0),
                    };
                    MeshSortInfo { mesh: key, alpha_tested, depth }
                })
                .collect();

            infos.sort_by(|a, b| compare(a, b));
            self.visible_meshes[bucket] = infos.into_iter().map(|info| info.mesh).collect();
        }
    }

    fn sort_light_shafts(&mut self, scene: &SceneGraph) {
        let near_plane = self.camera.frustum().planes[PLANE_NEAR];

        let mut infos: Vec<(LightKey, f32)> = self
            .visible_light_shafts
            .iter()
            .map(|&key| {
                let depth = match scene.light(key) {
                    Some(light) => near_plane.dot(light.aabb.center().extend(1.0)),
                    None => 0.0,
                };
                (key, depth)
            })
            .collect();

        // Back-to-front
        infos.sort_by(|a, b| b.1.total_cmp(&a.1));
        self.visible_light_shafts = infos.into_iter().map(|(key, _)| key).collect();
    }
}

impl Drop for FrustumCull {
    fn drop(&mut self) {
        self.pool.release(self.instance_id);
    }
}

/// Sutherland–Hodgman clip of a polygon against outward planes
/// (inside = dot + d <= 0).
fn clip_polygon(points: &[Vec3], planes: &[Vec4]) -> Vec<Vec3> {
    let mut current = points.to_vec();

    for plane in planes {
        if current.is_empty() {
            break;
        }
        let mut next = Vec::with_capacity(current.len() + 1);
        for j in 0..current.len() {
            let p0 = current[j];
            let p1 = current[(j + 1) % current.len()];
            let d0 = plane.dot(p0.extend(1.0));
            let d1 = plane.dot(p1.extend(1.0));

            if d0 <= 0.0 {
                next.push(p0);
                if d1 > 0.0 {
                    next.push(p0 + (p1 - p0) * (d0 / (d0 - d1)));
                }
            } else if d1 <= 0.0 {
                next.push(p0 + (p1 - p0) * (d0 / (d0 - d1)));
            }
        }
        current = next;
    }

    current
}

#[cfg(test)]
#[path = "frustum_cull_tests.rs"]
mod tests;
