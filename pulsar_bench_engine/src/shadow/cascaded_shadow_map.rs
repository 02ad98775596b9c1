/// CascadedShadowMap — directional light shadows over depth cascades.
///
/// The caller configures cascade count, map size and split distances,
/// then calls `finalize` once to create the GPU resources (a layered
/// depth texture, the depth shader variants, one job per cascade).
/// Per frame, `build_frustums` fits an orthographic light camera to
/// each view-frustum slice and `render_shadow` culls and records one
/// cascade's job. Submission order is the scheduler's business.

use std::sync::Arc;
use glam::{Mat4, Vec3, Vec4};
use crate::camera::Camera;
use crate::cull::{CullInstancePool, FrustumCull};
use crate::engine_error;
use crate::error::Result;
use crate::renderer::{
    CommandBufferId, CullMode, DepthMode, DrawCommand, JobDescriptor, JobId,
    RasterOrigin, RenderBackend, ShaderDescriptor, ShaderId, TextureDescriptor,
    TextureFormat, TextureId,
};
use crate::scene::{ActorKey, MeshFlags, OpacityMode, SceneGraph};
use super::shadow_mesh_filter::ShadowMeshFilter;

const LOG_SOURCE: &str = "pulsar::CascadedShadowMap";

/// Upper bound on cascades; split distances ship to shaders as a Vec4.
pub const MAX_CASCADES: usize = 4;

const DEFAULT_MAP_SIZE: u32 = 2048;
const DEFAULT_NEAR: f32 = 0.1;
const DEFAULT_FAR: f32 = 220.0;
/// Pulls the light camera back past the slice to catch casters behind it.
const DEFAULT_NEGATIVE_RANGE: f32 = 150.0;
/// Pushes the far plane out past the slice.
const DEFAULT_POSITIVE_RANGE: f32 = 50.0;
/// Far overshoot past the next cascade's near, hiding boundary cracks.
const SPLIT_OVERLAP: f32 = 1.005;
/// Logarithmic/uniform blend of the practical split scheme.
const SPLIT_LAMBDA: f32 = 0.5;

/// Per-cascade visualization colors, cycled.
const DEBUG_COLORS: [Vec4; 4] = [
    Vec4::new(1.0, 0.25, 0.25, 1.0),
    Vec4::new(0.25, 1.0, 0.25, 1.0),
    Vec4::new(0.25, 0.25, 1.0, 1.0),
    Vec4::new(1.0, 1.0, 0.25, 1.0),
];

/// How the light camera is fitted to a frustum slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeFit {
    /// Tight oriented box in light space, texel-snapped. Best density.
    OrientedBox,
    /// Bounding sphere, rotation-invariant. No shimmer under camera turn.
    Sphere,
}

/// How shaders pick a cascade per fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Sample the best map covering the fragment. Needs the extra
    /// positive depth range so neighbor cascades stay usable.
    MapBased,
    /// Pick by view depth against the split distances.
    DistanceBased,
}

struct Cascade {
    near: f32,
    far: f32,
    camera: Camera,
    cull: FrustumCull,
    job: JobId,
    /// World-space planes of the light volume, for external light culling
    cull_planes: Vec<Vec4>,
    /// NDC depth of the slice far plane in the scene camera
    split_distance: f32,
    /// Biased light view-projection for shadow lookups
    shadow_matrix: Mat4,
}

pub struct CascadedShadowMap {
    backend: Arc<dyn RenderBackend>,
    pool: CullInstancePool,

    cascade_count: usize,
    map_size: u32,
    format: TextureFormat,
    near: f32,
    far: f32,
    positive_range: f32,
    negative_range: f32,
    fit: CascadeFit,
    selection: SelectionMode,
    /// Cascade slice near distances, wired into far planes by `finalize`
    split_nears: [f32; MAX_CASCADES],
    /// False while the splits are the even-partition default
    splits_set: bool,
    excluded_actors: Vec<ActorKey>,

    texture: Option<TextureId>,
    /// Variants: base, alpha-test, skeletal, skeletal + alpha-test
    shaders: [ShaderId; 4],
    cascades: Vec<Cascade>,
    finalized: bool,
    built: bool,
}

impl CascadedShadowMap {
    pub fn new(backend: Arc<dyn RenderBackend>, pool: &CullInstancePool) -> Self {
        Self {
            backend,
            pool: pool.clone(),
            cascade_count: 0,
            map_size: DEFAULT_MAP_SIZE,
            format: TextureFormat::Depth32F,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            positive_range: DEFAULT_POSITIVE_RANGE,
            negative_range: DEFAULT_NEGATIVE_RANGE,
            fit: CascadeFit::OrientedBox,
            selection: SelectionMode::MapBased,
            split_nears: [0.0; MAX_CASCADES],
            splits_set: false,
            excluded_actors: Vec::new(),
            texture: None,
            shaders: [ShaderId(0); 4],
            cascades: Vec::new(),
            finalized: false,
            built: false,
        }
    }

    // ===== CONFIGURATION =====

    pub fn set_map_size(&mut self, size: u32) {
        self.check_not_finalized();
        self.map_size = size;
    }

    pub fn set_format(&mut self, format: TextureFormat) {
        self.check_not_finalized();
        self.format = format;
    }

    /// Shadowed depth range of the scene camera.
    pub fn set_range(&mut self, near: f32, far: f32) {
        self.check_not_finalized();
        self.near = near;
        self.far = far;
    }

    /// Far-plane slack past each slice (`MapBased` selection).
    pub fn set_positive_range(&mut self, range: f32) {
        self.positive_range = range;
    }

    /// Near-plane pull-back catching casters behind each slice.
    pub fn set_negative_range(&mut self, range: f32) {
        self.negative_range = range;
    }

    pub fn set_fit(&mut self, fit: CascadeFit) {
        self.fit = fit;
    }

    pub fn set_selection_mode(&mut self, selection: SelectionMode) {
        self.selection = selection;
    }

    /// Declare the next cascade with its slice near distance.
    ///
    /// # Panics
    ///
    /// When `MAX_CASCADES` cascades are already declared, or after
    /// `finalize`.
    pub fn add_cascade(&mut self, near: f32) {
        self.check_not_finalized();
        if self.cascade_count >= MAX_CASCADES {
            engine_error!(LOG_SOURCE, "cascade limit ({}) exceeded", MAX_CASCADES);
            panic!("too many cascades");
        }
        self.split_nears[self.cascade_count] = near;
        self.cascade_count += 1;
        self.splits_set = true;
    }

    /// Declare a cascade count with default (even partition) splits.
    pub fn set_cascade_count(&mut self, count: usize) {
        self.check_not_finalized();
        self.cascade_count = count.clamp(1, MAX_CASCADES);
    }

    /// Redistribute the slice nears with the practical split scheme: a
    /// blend of logarithmic and uniform partitions of the shadow range.
    pub fn split_frustums_logarithmic(&mut self) {
        self.check_not_finalized();
        self.check_has_cascades();
        let n = self.near.max(1e-3);
        let f = self.far;
        let count = self.cascade_count as f32;

        self.split_nears[0] = 0.0;
        for i in 1..self.cascade_count {
            let s = i as f32 / count;
            let log = n * (f / n).powf(s);
            let uniform = n + (f - n) * s;
            self.split_nears[i] = SPLIT_LAMBDA * log + (1.0 - SPLIT_LAMBDA) * uniform;
        }
        self.splits_set = true;
    }

    /// Keep an actor out of every cascade's shadow pass.
    pub fn exclude_actor(&mut self, actor: ActorKey) {
        self.excluded_actors.push(actor);
        for cascade in &mut self.cascades {
            cascade.cull.exclude_actor(actor);
        }
    }

    fn check_not_finalized(&self) {
        if self.finalized {
            engine_error!(LOG_SOURCE, "configuration change after finalize");
            panic!("cascaded shadow map already finalized");
        }
    }

    fn check_has_cascades(&self) {
        if self.cascade_count == 0 {
            engine_error!(LOG_SOURCE, "no cascades declared");
            panic!("no cascades declared");
        }
    }

    // ===== RESOURCES =====

    /// Create the GPU resources and freeze the configuration.
    ///
    /// # Panics
    ///
    /// When called twice.
    pub fn finalize(&mut self) -> Result<()> {
        self.check_not_finalized();
        self.check_has_cascades();

        if !self.splits_set {
            // Even partition of the shadow range
            for i in 1..self.cascade_count {
                self.split_nears[i] =
                    self.near + (self.far - self.near) * i as f32 / self.cascade_count as f32;
            }
        }

        let texture = self.backend.create_texture(&TextureDescriptor {
            name: "shadow_cascades".to_string(),
            width: self.map_size,
            height: self.map_size,
            layers: self.cascade_count as u32,
            format: self.format,
        })?;
        self.texture = Some(texture);

        let variants: [&[&str]; 4] = [
            &[],
            &["ALPHA_TEST"],
            &["SKELETAL"],
            &["SKELETAL", "ALPHA_TEST"],
        ];
        for (slot, defines) in self.shaders.iter_mut().zip(variants) {
            *slot = self.backend.create_shader(&ShaderDescriptor {
                name: "shadow_depth".to_string(),
                defines: defines.iter().map(|d| d.to_string()).collect(),
            })?;
        }

        for i in 0..self.cascade_count {
            let job = self.backend.create_job(&JobDescriptor {
                name: format!("shadow_cascade_{}", i),
                depth_target: Some((texture, i as u32)),
            })?;

            let mut cull = FrustumCull::new(&self.pool, Arc::new(ShadowMeshFilter));
            cull.set_cull_lights(false);
            cull.set_cull_probes(false);
            for &actor in &self.excluded_actors {
                cull.exclude_actor(actor);
            }

            let near = if i == 0 { 0.0 } else { self.split_nears[i] };
            // Slight far overshoot hides cracks at cascade boundaries
            let far = if i + 1 < self.cascade_count {
                self.split_nears[i + 1] * SPLIT_OVERLAP
            } else {
                self.far
            };

            self.cascades.push(Cascade {
                near,
                far,
                camera: Camera::orthographic(-1.0, 1.0, -1.0, 1.0, 0.0, 1.0),
                cull,
                job,
                cull_planes: Vec::new(),
                split_distance: 1.0,
                shadow_matrix: Mat4::IDENTITY,
            });
        }

        self.finalized = true;
        Ok(())
    }

    // ===== QUERIES =====

    pub fn cascade_count(&self) -> usize {
        self.cascade_count
    }

    pub fn fit(&self) -> CascadeFit {
        self.fit
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection
    }

    /// Shadowed (near, far) range of the scene camera.
    pub fn range(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Visualization color of a cascade, cycled through a fixed palette.
    pub fn debug_color(&self, cascade: usize) -> Vec4 {
        DEBUG_COLORS[cascade % DEBUG_COLORS.len()]
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn job(&self, cascade: usize) -> JobId {
        self.cascades[cascade].job
    }

    /// Slice (near, far) range of one cascade.
    pub fn cascade_range(&self, cascade: usize) -> (f32, f32) {
        let c = &self.cascades[cascade];
        (c.near, c.far)
    }

    /// Light camera of one cascade (valid after `build_frustums`).
    pub fn cascade_camera(&self, cascade: usize) -> &Camera {
        &self.cascades[cascade].camera
    }

    /// World-space planes of one cascade's light volume, outward
    /// normals (inside = dot + d <= 0).
    pub fn cull_planes(&self, cascade: usize) -> &[Vec4] {
        &self.cascades[cascade].cull_planes
    }

    pub fn shadow_matrix(&self, cascade: usize) -> Mat4 {
        self.cascades[cascade].shadow_matrix
    }

    /// Per-cascade NDC split depths, padded with 1.0. Shaders compare
    /// fragment depth against these to pick a cascade.
    pub fn split_distances(&self) -> Vec4 {
        let mut splits = [1.0; MAX_CASCADES];
        for (slot, cascade) in splits.iter_mut().zip(&self.cascades) {
            *slot = cascade.split_distance;
        }
        Vec4::from_array(splits)
    }

    // ===== PER-FRAME =====

    /// Fit each cascade's light camera to its view-frustum slice.
    ///
    /// `light_direction` is the direction the light travels.
    ///
    /// # Panics
    ///
    /// When the shadow map was not finalized.
    pub fn build_frustums(&mut self, scene_camera: &Camera, light_direction: Vec3) {
        if !self.finalized {
            engine_error!(LOG_SOURCE, "build_frustums before finalize");
            panic!("cascaded shadow map not finalized");
        }
        let light = light_direction.normalize_or_zero();
        if light == Vec3::ZERO {
            engine_error!(LOG_SOURCE, "degenerate light direction");
            return;
        }
        // Light frame; falls back when the light is vertical
        let right = Vec3::Y.cross(light).try_normalize().unwrap_or(Vec3::X);
        let up = light.cross(right).normalize();

        let mut camera = scene_camera.clone();
        camera.update();
        let view = *camera.view_matrix();
        let inv_vp = camera.view_projection_matrix().inverse();
        let projection = *camera.projection_matrix();

        // Scene frustum corners in view space, near quad then far quad
        let mut near_corners = [Vec3::ZERO; 4];
        let mut far_corners = [Vec3::ZERO; 4];
        for (j, (x, y)) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .into_iter()
            .enumerate()
        {
            for (z, corners) in [(-1.0, &mut near_corners), (1.0, &mut far_corners)] {
                let p = inv_vp * Vec4::new(x, y, z, 1.0);
                let world = p.truncate() / p.w;
                corners[j] = view.transform_point3(world);
            }
        }

        for i in 0..self.cascades.len() {
            let (near, far) = (self.cascades[i].near, self.cascades[i].far);

            // Slice the frustum along its corner rays at z = -near, -far
            let mut corners = [Vec3::ZERO; 8];
            for j in 0..4 {
                let p = near_corners[j];
                let dir = far_corners[j] - p;
                let tn = (-near - p.z) / dir.z;
                let tf = (-far - p.z) / dir.z;
                corners[j] = p + dir * tn;
                corners[j + 4] = p + dir * tf;
            }

            let light_camera = match self.fit {
                CascadeFit::Sphere => self.fit_sphere(&corners, &view, light, right, up),
                CascadeFit::OrientedBox => self.fit_oriented_box(&corners, &view, light, up),
            };

            let cascade = &mut self.cascades[i];
            cascade.camera = light_camera;
            cascade.cull_planes = cull_planes_of(&cascade.camera);
            cascade.shadow_matrix =
                bias_matrix(self.backend.depth_mode(), self.backend.raster_origin())
                    * *cascade.camera.view_projection_matrix();

            let clip = projection * Vec4::new(0.0, 0.0, -far, 1.0);
            cascade.split_distance = 0.5 * clip.z / clip.w + 0.5;
        }
        self.built = true;
    }

    /// Rotation-invariant fit: bounding sphere of the slice, with the
    /// target snapped to the shadow texel grid along the light frame.
    fn fit_sphere(
        &self,
        corners: &[Vec3; 8],
        view: &Mat4,
        light: Vec3,
        right: Vec3,
        up: Vec3,
    ) -> Camera {
        let mut center = Vec3::ZERO;
        for c in corners {
            center += *c;
        }
        center /= corners.len() as f32;
        // Zero-extent slices still get a valid (degenerate) camera
        let radius = corners
            .iter()
            .map(|c| (*c - center).length())
            .fold(0.0, f32::max)
            .max(1e-4);

        let mut target = view.inverse().transform_point3(center);
        let half_size = self.map_size as f32 * 0.5;
        let snap = |v: f32| (v * half_size / radius).ceil() * radius / half_size;
        let r = snap(target.dot(right));
        let u = snap(target.dot(up));
        target += right * (r - target.dot(right)) + up * (u - target.dot(up));

        let mut min_z = -radius;
        let mut max_z = radius;
        max_z += self.negative_range;
        if self.selection == SelectionMode::MapBased {
            min_z -= self.positive_range;
        }

        let mut camera = Camera::orthographic(-radius, radius, -radius, radius, -max_z, -min_z);
        camera.look_at(target + light, target - light, up);
        camera
    }

    /// Tight fit: light-space AABB of the slice, min/max snapped to
    /// whole texels so the map does not shimmer under camera motion.
    fn fit_oriented_box(
        &self,
        corners: &[Vec3; 8],
        view: &Mat4,
        light: Vec3,
        up: Vec3,
    ) -> Camera {
        let shadow_view = Mat4::look_at_rh(Vec3::ZERO, -light, up);
        let to_light = shadow_view * view.inverse();

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for c in corners {
            let p = to_light.transform_point3(*c);
            min = min.min(p);
            max = max.max(p);
        }

        let texel = (max - min) / self.map_size as f32;
        if texel.x > 0.0 {
            min.x = (min.x / texel.x).floor() * texel.x;
            max.x = (max.x / texel.x).floor() * texel.x;
        }
        if texel.y > 0.0 {
            min.y = (min.y / texel.y).floor() * texel.y;
            max.y = (max.y / texel.y).floor() * texel.y;
        }

        max.z += self.negative_range;
        if self.selection == SelectionMode::MapBased {
            min.z -= self.positive_range;
        }

        let mut camera = Camera::orthographic(min.x, max.x, min.y, max.y, -max.z, -min.z);
        camera.look_at(Vec3::ZERO, -light, up);
        camera
    }

    /// Cull the scene with a cascade's light camera and record its job.
    ///
    /// # Panics
    ///
    /// When the cascades were not built this frame.
    pub fn render_shadow(
        &mut self,
        scene: &SceneGraph,
        cascade: usize,
        command_buffer: CommandBufferId,
    ) -> JobId {
        if !self.built {
            engine_error!(LOG_SOURCE, "render_shadow before build_frustums");
            panic!("shadow cascades not built");
        }

        let backend = self.backend.clone();
        let shaders = self.shaders;
        let c = &mut self.cascades[cascade];
        c.cull.cull(scene, &c.camera);

        backend.begin_job(c.job, command_buffer);
        let view_projection = *c.camera.view_projection_matrix();
        for &key in c.cull.visible_meshes(0) {
            let Some(mesh) = scene.mesh(key) else { continue };

            let cull_mode = if mesh.flags.contains(MeshFlags::TWO_SIDED) {
                CullMode::None
            } else {
                CullMode::Back
            };
            let alpha_test = mesh.opacity == OpacityMode::AlphaTest;
            let shader = shaders[(mesh.skinned as usize) * 2 + alpha_test as usize];

            let mvp = view_projection * mesh.world_transform;
            backend.draw(
                c.job,
                &DrawCommand {
                    shader,
                    cull_mode,
                    constants: bytemuck::bytes_of(&mvp).to_vec(),
                },
            );
        }
        backend.end_job(c.job);
        c.job
    }
}

/// NDC-to-texture bias for the backend's clip and raster conventions.
fn bias_matrix(depth_mode: DepthMode, raster_origin: RasterOrigin) -> Mat4 {
    let tz = if depth_mode == DepthMode::NegativeOneToOne { 0.5 } else { 0.0 };
    let sy = if raster_origin == RasterOrigin::UpperLeft { -0.5 } else { 0.5 };
    let sz = if depth_mode == DepthMode::NegativeOneToOne { 0.5 } else { 1.0 };
    Mat4::from_translation(Vec3::new(0.5, 0.5, tz)) * Mat4::from_scale(Vec3::new(0.5, sy, sz))
}

/// World-space planes of an orthographic camera's box, outward normals
/// (inside = dot + d <= 0, the convention the overlap tests use).
fn cull_planes_of(camera: &Camera) -> Vec<Vec4> {
    let (left, right_e, bottom, top, near, far) = match *camera.projection() {
        crate::camera::Projection::Orthographic { left, right, bottom, top, near, far } => {
            (left, right, bottom, top, near, far)
        }
        crate::camera::Projection::Perspective { .. } => return Vec::new(),
    };

    let to_world = camera.view_matrix().inverse();
    let corner = |x: f32, y: f32, z: f32| to_world.transform_point3(Vec3::new(x, y, z));

    let c_min = corner(left, bottom, -near);
    let cx = corner(right_e, bottom, -near);
    let cy = corner(left, top, -near);
    let cz = corner(left, bottom, -far);

    [
        (c_min, cx),
        (cx, c_min),
        (c_min, cy),
        (cy, c_min),
        (c_min, cz),
        (cz, c_min),
    ]
    .iter()
    .map(|&(a, b)| create_plane(a, b))
    .collect()
}

/// Outward plane through `a`, facing away from `b`.
fn create_plane(a: Vec3, b: Vec3) -> Vec4 {
    let normal = (a - b).normalize();
    normal.extend(-normal.dot(a))
}

#[cfg(test)]
#[path = "cascaded_shadow_map_tests.rs"]
mod tests;
