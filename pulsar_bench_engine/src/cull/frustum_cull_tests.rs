use std::sync::Arc;
use glam::{Vec3, Vec4};
use crate::camera::Camera;
use crate::scene::{
    Actor, Light, LightKind, Mesh, MeshKey, Portal, Probe, Pvs, Room, RoomId,
    SceneGraph, AABB,
};
use crate::cull::mesh_filter::{depth_compare, MeshCompare, MeshFilter, PassthroughMeshFilter};
use crate::cull::overlap::Overlap;
use super::*;

// ============================================================================
// Helpers
// ============================================================================

fn camera_at(eye: Vec3, target: Vec3) -> Camera {
    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 0.1, 100.0);
    camera.look_at(eye, target, Vec3::Y);
    camera
}

fn box_planes(min: Vec3, max: Vec3) -> Vec<Vec4> {
    vec![
        Vec4::new(-1.0, 0.0, 0.0, min.x),
        Vec4::new(1.0, 0.0, 0.0, -max.x),
        Vec4::new(0.0, -1.0, 0.0, min.y),
        Vec4::new(0.0, 1.0, 0.0, -max.y),
        Vec4::new(0.0, 0.0, -1.0, min.z),
        Vec4::new(0.0, 0.0, 1.0, -max.z),
    ]
}

fn small_box(center: Vec3) -> AABB {
    AABB::new(center - Vec3::splat(0.5), center + Vec3::splat(0.5))
}

fn room_with_planes(min: Vec3, max: Vec3) -> Room {
    let mut room = Room::new(AABB::new(min, max));
    room.planes = box_planes(min, max);
    room
}

/// Two rooms sharing a portal window at x = 10, one mesh in each.
fn two_room_scene() -> (SceneGraph, RoomId, RoomId, MeshKey, MeshKey) {
    let mut scene = SceneGraph::new();

    let a = scene.add_room(room_with_planes(Vec3::ZERO, Vec3::splat(10.0)));
    let b = scene.add_room(room_with_planes(
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(20.0, 10.0, 10.0),
    ));

    let mesh_a = scene.add_mesh(Mesh::new(small_box(Vec3::new(8.0, 5.0, 5.0))));
    let mesh_b = scene.add_mesh(Mesh::new(small_box(Vec3::new(15.0, 5.0, 5.0))));
    scene.room_mut(a).meshes.push(mesh_a);
    scene.room_mut(b).meshes.push(mesh_b);

    let portal = scene
        .add_portal(
            Portal::new(vec![
                Vec3::new(10.0, 2.0, 2.0),
                Vec3::new(10.0, 8.0, 2.0),
                Vec3::new(10.0, 8.0, 8.0),
                Vec3::new(10.0, 2.0, 8.0),
            ])
            .unwrap(),
        );
    scene.connect_rooms(a, b, Some(portal));

    (scene, a, b, mesh_a, mesh_b)
}

fn passthrough_cull(pool: &CullInstancePool) -> FrustumCull {
    FrustumCull::new(pool, Arc::new(PassthroughMeshFilter))
}

/// Single sorted bucket, front-to-back.
struct SortedFilter;

impl MeshFilter for SortedFilter {
    fn filter_mesh(&self, _camera: &Camera, _mesh: &Mesh, _overlap: Overlap) -> Option<usize> {
        Some(0)
    }
    fn max_mesh_types(&self) -> usize {
        1
    }
    fn sort_function(&self, _mesh_type: usize) -> Option<MeshCompare> {
        Some(depth_compare)
    }
}

// ============================================================================
// Instance pool wiring
// ============================================================================

#[test]
fn test_drop_returns_instance_id() {
    let pool = CullInstancePool::new();
    let first = passthrough_cull(&pool);
    let second = passthrough_cull(&pool);
    assert_eq!(first.instance_id(), 0);
    assert_eq!(second.instance_id(), 1);

    drop(first);
    assert_eq!(pool.live_instances(), 1);

    let third = passthrough_cull(&pool);
    assert_eq!(third.instance_id(), 0);
}

// ============================================================================
// Portal traversal
// ============================================================================

#[test]
fn test_camera_room_is_located() {
    let (scene, a, _, _, _) = two_room_scene();
    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);

    cull.cull(&scene, &camera_at(Vec3::splat(5.0), Vec3::new(10.0, 5.0, 5.0)));
    assert_eq!(cull.camera_room(), Some(a));
}

#[test]
fn test_far_room_visible_through_portal() {
    let (scene, a, b, mesh_a, mesh_b) = two_room_scene();
    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);

    // Facing the portal
    cull.cull(&scene, &camera_at(Vec3::splat(5.0), Vec3::new(10.0, 5.0, 5.0)));

    assert!(cull.is_room_visible(a));
    assert!(cull.is_room_visible(b));
    assert!(cull.visible_meshes(0).contains(&mesh_a));
    assert!(cull.visible_meshes(0).contains(&mesh_b));
    // Visit order starts at the camera room
    assert_eq!(cull.visible_rooms()[0], a);
}

#[test]
fn test_far_room_hidden_when_facing_away() {
    let (scene, a, b, mesh_a, mesh_b) = two_room_scene();
    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);

    // Facing away from the portal: the portal polygon clips to nothing
    cull.cull(&scene, &camera_at(Vec3::splat(5.0), Vec3::new(0.0, 5.0, 5.0)));

    assert!(cull.is_room_visible(a));
    assert!(!cull.is_room_visible(b));
    assert!(!cull.visible_meshes(0).contains(&mesh_b));
    // mesh_a sits behind the camera here
    assert!(!cull.visible_meshes(0).contains(&mesh_a));
}

#[test]
fn test_portal_narrows_the_view() {
    // Mesh in room B hidden from the portal cone but inside the camera frustum
    let (mut scene, _, b, _, mesh_b) = two_room_scene();
    let hidden = scene.add_mesh(Mesh::new(small_box(Vec3::new(10.6, 9.5, 9.5))));
    scene.room_mut(b).meshes.push(hidden);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::splat(5.0), Vec3::new(10.0, 5.0, 5.0)));

    assert!(cull.visible_meshes(0).contains(&mesh_b));
    assert!(!cull.visible_meshes(0).contains(&hidden));
}

#[test]
fn test_disabled_connection_is_skipped() {
    let (mut scene, a, b, _, _) = two_room_scene();
    for conn in &mut scene.room_mut(a).connections {
        conn.enabled = false;
    }

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::splat(5.0), Vec3::new(10.0, 5.0, 5.0)));
    assert!(!cull.is_room_visible(b));
}

#[test]
fn test_portal_cycle_terminates() {
    // Three mutually connected rooms (plain connections, A↔B↔C↔A)
    let mut scene = SceneGraph::new();
    let a = scene.add_room(room_with_planes(Vec3::ZERO, Vec3::splat(10.0)));
    let b = scene.add_room(room_with_planes(
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(20.0, 10.0, 10.0),
    ));
    let c = scene.add_room(room_with_planes(
        Vec3::new(20.0, 0.0, 0.0),
        Vec3::new(30.0, 10.0, 10.0),
    ));
    scene.connect_rooms(a, b, None);
    scene.connect_rooms(b, c, None);
    scene.connect_rooms(c, a, None);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::splat(5.0), Vec3::new(30.0, 5.0, 5.0)));

    // Each room reported exactly once
    let mut rooms = cull.visible_rooms().to_vec();
    rooms.sort_unstable();
    assert_eq!(rooms, vec![a, b, c]);
}

#[test]
fn test_stamps_deduplicate_shared_meshes() {
    // One mesh listed by both rooms, both visible
    let (mut scene, a, b, _, _) = two_room_scene();
    let shared = scene.add_mesh(Mesh::new(small_box(Vec3::new(9.9, 5.0, 5.0))));
    scene.room_mut(a).meshes.push(shared);
    scene.room_mut(b).meshes.push(shared);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::splat(5.0), Vec3::new(10.0, 5.0, 5.0)));

    let hits = cull.visible_meshes(0).iter().filter(|&&m| m == shared).count();
    assert_eq!(hits, 1);
}

#[test]
fn test_wider_portal_path_retests_rejected_objects() {
    // Two portals from A to B, a narrow slit listed first and a wide
    // window second. Objects off to the side fail the slit's cone; the
    // rejection must not stick when the wide path reaches B afterwards.
    let mut scene = SceneGraph::new();
    let a = scene.add_room(room_with_planes(Vec3::ZERO, Vec3::splat(10.0)));
    let b = scene.add_room(room_with_planes(
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(20.0, 10.0, 10.0),
    ));

    let narrow = scene.add_portal(
        Portal::new(vec![
            Vec3::new(10.0, 4.9, 4.9),
            Vec3::new(10.0, 5.1, 4.9),
            Vec3::new(10.0, 5.1, 5.1),
            Vec3::new(10.0, 4.9, 5.1),
        ])
        .unwrap(),
    );
    let wide = scene.add_portal(
        Portal::new(vec![
            Vec3::new(10.0, 1.0, 1.0),
            Vec3::new(10.0, 9.0, 1.0),
            Vec3::new(10.0, 9.0, 9.0),
            Vec3::new(10.0, 1.0, 9.0),
        ])
        .unwrap(),
    );
    scene.connect_rooms(a, b, Some(narrow));
    scene.connect_rooms(a, b, Some(wide));

    let spot = small_box(Vec3::new(15.0, 5.0, 8.0));
    let mesh = scene.add_mesh(Mesh::new(spot));
    let body = scene.add_mesh(Mesh::new(spot));
    let mut walker = Actor::new(spot);
    walker.meshes.push(body);
    let walker = scene.add_actor(walker);
    let probe = scene.add_probe(Probe::new(spot));
    scene.room_mut(b).meshes.push(mesh);
    scene.room_mut(b).actors.push(walker);
    scene.room_mut(b).probes.push(probe);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::new(1.0, 5.0, 5.0), Vec3::new(10.0, 5.0, 5.0)));

    assert!(cull.visible_meshes(0).contains(&mesh));
    assert!(cull.visible_meshes(0).contains(&body));
    assert_eq!(cull.visible_actor_count(), 1);
    assert!(cull.visible_probes().contains(&probe));
}

#[test]
fn test_cull_is_idempotent_across_frames() {
    let (scene, _, _, _, _) = two_room_scene();
    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    let camera = camera_at(Vec3::splat(5.0), Vec3::new(10.0, 5.0, 5.0));

    cull.cull(&scene, &camera);
    let rooms_first = cull.visible_rooms().to_vec();
    let meshes_first = cull.visible_meshes(0).to_vec();
    let near_far_first = (cull.near(), cull.far());

    cull.cull(&scene, &camera);
    assert_eq!(cull.visible_rooms(), rooms_first.as_slice());
    assert_eq!(cull.visible_meshes(0), meshes_first.as_slice());
    assert_eq!((cull.near(), cull.far()), near_far_first);
}

// ============================================================================
// PVS
// ============================================================================

#[test]
fn test_pvs_prunes_unreachable_rooms() {
    let mut scene = SceneGraph::new();
    let a = scene.add_room(room_with_planes(Vec3::ZERO, Vec3::splat(10.0)));
    let b = scene.add_room(room_with_planes(
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(20.0, 10.0, 10.0),
    ));
    let c = scene.add_room(room_with_planes(
        Vec3::new(20.0, 0.0, 0.0),
        Vec3::new(30.0, 10.0, 10.0),
    ));
    scene.connect_rooms(a, b, None);
    scene.connect_rooms(b, c, None);

    let mut pvs = Pvs::all_visible(3);
    pvs.set(a, c, false);
    scene.set_pvs(pvs);

    let pool = CullInstancePool::new();
    let camera = camera_at(Vec3::splat(5.0), Vec3::new(30.0, 5.0, 5.0));

    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera);
    assert!(cull.is_room_visible(b));
    assert!(!cull.is_room_visible(c));

    // Disabling PVS yields a superset
    let mut unpruned = passthrough_cull(&pool);
    unpruned.set_pvs_enabled(false);
    unpruned.cull(&scene, &camera);
    assert!(unpruned.is_room_visible(c));
    for room in cull.visible_rooms() {
        assert!(unpruned.is_room_visible(*room));
    }
}

#[test]
fn test_missing_pvs_never_culls() {
    let (scene, _, b, _, _) = two_room_scene();
    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::splat(5.0), Vec3::new(10.0, 5.0, 5.0)));
    assert!(cull.is_room_visible(b));
}

// ============================================================================
// Fallback path and actors
// ============================================================================

#[test]
fn test_fallback_brute_forces_actors() {
    let mut scene = SceneGraph::new();
    // Single room without membership planes: camera room lookup fails
    scene.add_room(Room::new(AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0))));

    let front_mesh = scene.add_mesh(Mesh::new(small_box(Vec3::new(0.0, 0.0, -10.0))));
    let mut front = Actor::new(small_box(Vec3::new(0.0, 0.0, -10.0)));
    front.meshes.push(front_mesh);
    scene.add_actor(front);

    let behind_mesh = scene.add_mesh(Mesh::new(small_box(Vec3::new(0.0, 0.0, 10.0))));
    let mut behind = Actor::new(small_box(Vec3::new(0.0, 0.0, 10.0)));
    behind.meshes.push(behind_mesh);
    scene.add_actor(behind);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    assert_eq!(cull.visible_actor_count(), 1);
    assert!(cull.visible_meshes(0).contains(&front_mesh));
    assert!(!cull.visible_meshes(0).contains(&behind_mesh));
}

#[test]
fn test_excluded_actor_is_dropped() {
    let mut scene = SceneGraph::new();
    scene.add_room(Room::new(AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0))));

    let mesh = scene.add_mesh(Mesh::new(small_box(Vec3::new(0.0, 0.0, -10.0))));
    let mut actor = Actor::new(small_box(Vec3::new(0.0, 0.0, -10.0)));
    actor.meshes.push(mesh);
    let key = scene.add_actor(actor);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.exclude_actor(key);
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    assert_eq!(cull.visible_actor_count(), 0);
    assert!(cull.visible_meshes(0).is_empty());
}

#[test]
fn test_invisible_actor_mesh_is_skipped() {
    let mut scene = SceneGraph::new();
    scene.add_room(Room::new(AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0))));

    let mesh = scene.add_mesh(Mesh::new(small_box(Vec3::new(0.0, 0.0, -10.0))));
    scene.mesh_mut(mesh).unwrap().visible = false;
    let mut actor = Actor::new(small_box(Vec3::new(0.0, 0.0, -10.0)));
    actor.meshes.push(mesh);
    scene.add_actor(actor);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    assert_eq!(cull.visible_actor_count(), 0);
    assert!(cull.visible_meshes(0).is_empty());
}

// ============================================================================
// Lights and probes
// ============================================================================

#[test]
fn test_light_culling_and_shafts() {
    let mut scene = SceneGraph::new();
    scene.add_room(Room::new(AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0))));

    let visible_light = scene.add_light({
        let mut light = Light::new(LightKind::Omni, small_box(Vec3::new(0.0, 0.0, -10.0)));
        light.light_shaft = true;
        light
    });
    let hidden_light =
        scene.add_light(Light::new(LightKind::Spot, small_box(Vec3::new(0.0, 0.0, 20.0))));
    let sun = scene.add_light(Light::new(
        LightKind::Directional { boxed: false },
        small_box(Vec3::new(0.0, 0.0, 20.0)),
    ));

    let mut actor = Actor::new(AABB::new(Vec3::splat(-40.0), Vec3::splat(40.0)));
    actor.lights.extend([visible_light, hidden_light, sun]);
    scene.add_actor(actor);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    assert!(cull.visible_lights().contains(&visible_light));
    assert!(!cull.visible_lights().contains(&hidden_light));
    // Unbounded directional lights are always visible
    assert!(cull.visible_lights().contains(&sun));
    assert_eq!(cull.visible_light_shafts(), &[visible_light]);
}

#[test]
fn test_light_shafts_sort_back_to_front() {
    let mut scene = SceneGraph::new();
    scene.add_room(Room::new(AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0))));

    let near_shaft = scene.add_light({
        let mut light = Light::new(LightKind::Omni, small_box(Vec3::new(0.0, 0.0, -5.0)));
        light.light_shaft = true;
        light
    });
    let far_shaft = scene.add_light({
        let mut light = Light::new(LightKind::Omni, small_box(Vec3::new(0.0, 0.0, -30.0)));
        light.light_shaft = true;
        light
    });

    let mut actor = Actor::new(AABB::new(Vec3::splat(-40.0), Vec3::splat(40.0)));
    actor.lights.extend([near_shaft, far_shaft]);
    scene.add_actor(actor);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    assert_eq!(cull.visible_light_shafts(), &[far_shaft, near_shaft]);
}

#[test]
fn test_probe_inside_outside_split() {
    let mut scene = SceneGraph::new();
    let room = scene.add_room(Room::new(AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0))));

    // Probe surrounding the camera vs probe far in front
    let around = scene.add_probe(Probe::new(AABB::new(Vec3::splat(-2.0), Vec3::splat(2.0))));
    let ahead = scene.add_probe(Probe::new(small_box(Vec3::new(0.0, 0.0, -20.0))));
    let behind = scene.add_probe(Probe::new(small_box(Vec3::new(0.0, 0.0, 30.0))));
    scene.room_mut(room).probes.extend([around, ahead, behind]);

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    assert!(cull.visible_probes().contains(&around));
    assert!(cull.visible_probes().contains(&ahead));
    assert!(!cull.visible_probes().contains(&behind));
    assert!(cull.visible_probes_inside().contains(&around));
    assert!(cull.visible_probes_outside().contains(&ahead));
}

// ============================================================================
// Near/far derivation
// ============================================================================

#[test]
fn test_near_far_defaults_on_empty_scene() {
    let scene = SceneGraph::new();
    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.set_default_near_far(0.5, 300.0);
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    assert_eq!(cull.near(), 0.5);
    assert_eq!(cull.far(), 300.0);
}

#[test]
fn test_far_gets_slack_from_visible_bounds() {
    let mut scene = SceneGraph::new();
    scene.add_room(Room::new(AABB::new(
        Vec3::new(-10.0, -10.0, -40.0),
        Vec3::new(10.0, 10.0, -1.0),
    )));

    let pool = CullInstancePool::new();
    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    // Room depth reaches 40 in front of the camera, +5 slack, near plane offset small
    assert!(cull.far() > 40.0 && cull.far() < 50.0);
    assert!(cull.near() >= 0.0);
}

// ============================================================================
// Plane count and sorting
// ============================================================================

#[test]
fn test_far_plane_only_culls_when_enabled() {
    let mut scene = SceneGraph::new();
    let room = scene.add_room(Room::new(AABB::new(Vec3::splat(-500.0), Vec3::splat(500.0))));
    let distant = scene.add_mesh(Mesh::new(small_box(Vec3::new(0.0, 0.0, -200.0))));
    scene.room_mut(room).meshes.push(distant);

    let pool = CullInstancePool::new();
    let camera = camera_at(Vec3::ZERO, Vec3::NEG_Z); // far = 100

    let mut cull = passthrough_cull(&pool);
    cull.cull(&scene, &camera);
    assert!(cull.visible_meshes(0).contains(&distant));

    let mut strict = passthrough_cull(&pool);
    strict.set_cull_with_near_far(true);
    strict.cull(&scene, &camera);
    assert!(!strict.visible_meshes(0).contains(&distant));
}

#[test]
fn test_bucket_sorting_is_front_to_back() {
    let mut scene = SceneGraph::new();
    let room = scene.add_room(Room::new(AABB::new(Vec3::splat(-50.0), Vec3::splat(50.0))));

    let far = scene.add_mesh(Mesh::new(small_box(Vec3::new(0.0, 0.0, -30.0))));
    let near = scene.add_mesh(Mesh::new(small_box(Vec3::new(0.0, 0.0, -5.0))));
    let mid = scene.add_mesh(Mesh::new(small_box(Vec3::new(0.0, 0.0, -15.0))));
    scene.room_mut(room).meshes.extend([far, near, mid]);

    let pool = CullInstancePool::new();
    let mut cull = FrustumCull::new(&pool, Arc::new(SortedFilter));
    cull.cull(&scene, &camera_at(Vec3::ZERO, Vec3::NEG_Z));

    assert_eq!(cull.visible_meshes(0), &[near, mid, far]);
}
