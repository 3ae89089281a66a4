//! Detected planes drawn as a fading triangle grid.

use crate::{
    assets::{self, AssetSource},
    gpu::{
        BlendFactor, ColorFormat, DrawTarget, GpuBackend, IndexBufferId, MeshId, PipelineState,
        PrimitiveMode, ShaderId, UniformValue, VertexBufferId, WrapMode,
    },
    pose::Pose,
    tracking::{distance_to_plane, Plane, TrackableId, TrackingState},
    Result,
};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use std::collections::HashMap;

/// Width of the band over which a plane's edge fades out.
const FADE_RADIUS_M: f32 = 0.25;
const DOTS_PER_METER: f32 = 10.0;
const EQUILATERAL_TRIANGLE_SCALE: f32 = 0.577_350_26; // 1 / sqrt(3)
/// Grid rotation step between consecutive planes, in radians.
const GRID_ROTATION_STEP: f32 = 0.144;

/// Dot threshold, line threshold, line fade shrink, occlusion shrink.
const GRID_CONTROL: Vec4 = Vec4::new(0.2, 0.4, 2.0, 1.5);

#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PlaneVertex {
    pub x: f32,
    pub z: f32,
    pub alpha: f32,
}

/// Two concentric rings around the polygon: the outer one transparent, the
/// inner one pulled in by the fade radius and opaque.
pub fn plane_mesh(plane: &Plane) -> (Vec<PlaneVertex>, Vec<u32>) {
    let n = plane.polygon.len();
    if n < 3 {
        return (Vec::new(), Vec::new());
    }
    let shrink = |extent: f32| {
        if extent > 0.0 {
            ((extent - 2.0 * FADE_RADIUS_M) / extent).max(0.0)
        } else {
            0.0
        }
    };
    let (x_scale, z_scale) = (shrink(plane.extent_x), shrink(plane.extent_z));

    let mut vertices = Vec::with_capacity(n * 2);
    for p in &plane.polygon {
        vertices.push(PlaneVertex {
            x: p.x,
            z: p.y,
            alpha: 0.0,
        });
        vertices.push(PlaneVertex {
            x: p.x * x_scale,
            z: p.y * z_scale,
            alpha: 1.0,
        });
    }

    let n = n as u32;
    let mut indices = Vec::with_capacity(((n - 2) * 3 + n * 6) as usize);
    // Inner fan.
    for i in 1..n - 1 {
        indices.extend_from_slice(&[1, 2 * i + 1, 2 * (i + 1) + 1]);
    }
    // Fade band.
    for i in 0..n {
        let j = (i + 1) % n;
        let (outer_i, inner_i) = (2 * i, 2 * i + 1);
        let (outer_j, inner_j) = (2 * j, 2 * j + 1);
        indices.extend_from_slice(&[outer_i, outer_j, inner_j]);
        indices.extend_from_slice(&[outer_i, inner_j, inner_i]);
    }
    (vertices, indices)
}

/// Planes worth drawing, farthest first so the nearer ones blend on top.
/// Subsumed, non-tracking planes and planes seen from behind are left out.
pub fn visible_planes<'a>(planes: &'a [Plane], camera_pose: &Pose) -> Vec<(&'a Plane, f32)> {
    let mut visible: Vec<_> = planes
        .iter()
        .filter(|p| p.tracking_state == TrackingState::Tracking && p.subsumed_by.is_none())
        .map(|p| (p, distance_to_plane(&p.center_pose, camera_pose)))
        .filter(|(_, distance)| *distance > 0.0)
        .collect();
    visible.sort_by(|a, b| b.1.total_cmp(&a.1));
    visible
}

pub struct PlaneRenderer {
    shader: ShaderId,
    vertex_buffer: VertexBufferId,
    index_buffer: IndexBufferId,
    mesh: MeshId,
    /// Stable per-plane index; drives the grid rotation. Subsumed planes
    /// never come back, so their entries are dropped.
    plane_indices: HashMap<TrackableId, u32>,
    next_plane_index: u32,
}

impl PlaneRenderer {
    pub fn new(gpu: &mut dyn GpuBackend, assets: &dyn AssetSource) -> Result<Self> {
        let grid = gpu.create_texture_from_image(
            "Plane Grid",
            &assets::read(assets, assets::PLANE_GRID_TEXTURE)?,
            WrapMode::Repeat,
            ColorFormat::Linear,
        )?;
        let source = assets::shader_source(
            assets,
            assets::PLANE_VERT,
            assets::PLANE_FRAG,
            &[],
            PipelineState {
                depth_test: true,
                depth_write: false,
                blend: Some((
                    BlendFactor::DstAlpha,
                    BlendFactor::One,
                    BlendFactor::Zero,
                    BlendFactor::OneMinusSrcAlpha,
                )),
            },
        )?;
        let shader = gpu.create_shader("plane", &source)?;
        gpu.set_uniform(shader, "u_Texture", UniformValue::Texture(grid));
        gpu.set_uniform(shader, "u_GridControl", UniformValue::Vec4(GRID_CONTROL));

        // X, Z, alpha
        let vertex_buffer = gpu.create_vertex_buffer(3)?;
        let index_buffer = gpu.create_index_buffer()?;
        let mesh = gpu.create_mesh(
            PrimitiveMode::Triangles,
            Some(index_buffer),
            &[vertex_buffer],
        )?;

        Ok(Self {
            shader,
            vertex_buffer,
            index_buffer,
            mesh,
            plane_indices: HashMap::new(),
            next_plane_index: 0,
        })
    }

    fn plane_index(&mut self, id: TrackableId) -> u32 {
        let next = &mut self.next_plane_index;
        *self.plane_indices.entry(id).or_insert_with(|| {
            let index = *next;
            *next = next.wrapping_add(1);
            index
        })
    }

    /// Draw every visible plane. Returns how many were drawn.
    pub fn draw_planes(
        &mut self,
        gpu: &mut dyn GpuBackend,
        planes: &[Plane],
        camera_pose: &Pose,
        view: &Mat4,
        projection: &Mat4,
    ) -> Result<usize> {
        for plane in planes.iter().filter(|p| p.subsumed_by.is_some()) {
            self.plane_indices.remove(&plane.id);
        }

        let mut drawn = 0;
        for (plane, _) in visible_planes(planes, camera_pose) {
            let (vertices, indices) = plane_mesh(plane);
            if indices.is_empty() {
                continue;
            }
            gpu.set_vertex_data(self.vertex_buffer, bytemuck::cast_slice(&vertices))?;
            gpu.set_index_data(self.index_buffer, &indices)?;

            let model = plane.center_pose.to_matrix();
            let angle = self.plane_index(plane.id) as f32 * GRID_ROTATION_STEP;
            let (sin, cos) = angle.sin_cos();
            let (u_scale, v_scale) = (DOTS_PER_METER, DOTS_PER_METER * EQUILATERAL_TRIANGLE_SCALE);

            gpu.set_uniform(self.shader, "u_Model", UniformValue::Mat4(model));
            gpu.set_uniform(self.shader, "u_Normal", UniformValue::Vec3(plane.normal()));
            gpu.set_uniform(
                self.shader,
                "u_ModelViewProjection",
                UniformValue::Mat4(*projection * *view * model),
            );
            gpu.set_uniform(
                self.shader,
                "u_PlaneUvMatrix",
                UniformValue::Vec4(Vec4::new(
                    cos * u_scale,
                    -sin * v_scale,
                    sin * u_scale,
                    cos * v_scale,
                )),
            );
            gpu.draw(self.mesh, self.shader, DrawTarget::Screen);
            drawn += 1;
        }
        Ok(drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::MemoryAssets,
        gpu::{Command, RecordingBackend},
        tracking::PlaneType,
    };
    use glam::{Vec2, Vec3};

    fn square(id: u64, height: f32, half: f32) -> Plane {
        Plane {
            id: TrackableId(id),
            kind: PlaneType::HorizontalUpwardFacing,
            center_pose: Pose::from_translation(Vec3::new(0.0, height, 0.0)),
            extent_x: 2.0 * half,
            extent_z: 2.0 * half,
            polygon: vec![
                Vec2::new(-half, -half),
                Vec2::new(half, -half),
                Vec2::new(half, half),
                Vec2::new(-half, half),
            ],
            tracking_state: TrackingState::Tracking,
            subsumed_by: None,
        }
    }

    #[test]
    fn mesh_has_fading_outer_ring() {
        let (vertices, indices) = plane_mesh(&square(1, 0.0, 1.0));
        assert_eq!(vertices.len(), 8);
        assert_eq!(indices.len(), 2 * 3 + 4 * 6);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));

        assert_eq!(vertices[0].alpha, 0.0);
        assert_eq!(vertices[1].alpha, 1.0);
        // 2m wide, 0.25m fade on each side.
        assert!((vertices[1].x - -0.75).abs() < 1e-6);
        assert!((vertices[1].z - -0.75).abs() < 1e-6);
    }

    #[test]
    fn small_planes_collapse_inner_ring() {
        let (vertices, _) = plane_mesh(&square(1, 0.0, 0.2));
        assert_eq!(vertices[1].x, 0.0);
        assert_eq!(vertices[1].z, 0.0);
    }

    #[test]
    fn degenerate_polygon_has_no_mesh() {
        let mut plane = square(1, 0.0, 1.0);
        plane.polygon.truncate(2);
        assert_eq!(plane_mesh(&plane), (Vec::new(), Vec::new()));
    }

    #[test]
    fn visibility_filters_and_orders_far_to_near() {
        let camera = Pose::from_translation(Vec3::new(0.0, 1.5, 0.0));
        let mut subsumed = square(3, 0.5, 1.0);
        subsumed.subsumed_by = Some(TrackableId(1));
        let mut paused = square(4, 0.2, 1.0);
        paused.tracking_state = TrackingState::Paused;
        let planes = vec![
            square(1, 1.0, 1.0),
            square(2, 0.0, 1.0),
            subsumed,
            paused,
            // Ceiling seen from below its upward-facing side.
            square(5, 2.0, 1.0),
        ];

        let ids: Vec<u64> = visible_planes(&planes, &camera)
            .iter()
            .map(|(p, _)| p.id.0)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn grid_rotation_is_stable_per_plane() {
        let mut assets = MemoryAssets::new();
        for path in [assets::PLANE_VERT, assets::PLANE_FRAG] {
            assets.insert(path, "void main() {}");
        }
        assets.insert(assets::PLANE_GRID_TEXTURE, vec![1u8; 4]);
        let mut gpu = RecordingBackend::new();
        let mut renderer = PlaneRenderer::new(&mut gpu, &assets).unwrap();
        let camera = Pose::from_translation(Vec3::new(0.0, 1.5, 0.0));

        let drawn = renderer
            .draw_planes(
                &mut gpu,
                &[square(7, 0.0, 1.0), square(9, 1.0, 1.0)],
                &camera,
                &Mat4::IDENTITY,
                &Mat4::IDENTITY,
            )
            .unwrap();
        assert_eq!(drawn, 2);
        assert_eq!(gpu.draws_with("plane"), 2);
        assert!(gpu
            .commands()
            .iter()
            .any(|c| matches!(c, Command::SetIndexData { count: 30, .. })));

        // Plane 9 was seen second and keeps its index on later frames.
        renderer
            .draw_planes(
                &mut gpu,
                &[square(9, 1.0, 1.0)],
                &camera,
                &Mat4::IDENTITY,
                &Mat4::IDENTITY,
            )
            .unwrap();
        let Some(UniformValue::Vec4(uv)) = gpu.uniform(renderer.shader, "u_PlaneUvMatrix")
        else {
            panic!("uv matrix not set");
        };
        let (sin, cos) = GRID_ROTATION_STEP.sin_cos();
        assert!((uv.x - cos * DOTS_PER_METER).abs() < 1e-5);
        assert!((uv.z - sin * DOTS_PER_METER).abs() < 1e-5);
    }

    #[test]
    fn subsumed_planes_release_their_index() {
        let mut assets = MemoryAssets::new();
        for path in [assets::PLANE_VERT, assets::PLANE_FRAG] {
            assets.insert(path, "void main() {}");
        }
        assets.insert(assets::PLANE_GRID_TEXTURE, vec![1u8; 4]);
        let mut gpu = RecordingBackend::new();
        let mut renderer = PlaneRenderer::new(&mut gpu, &assets).unwrap();
        let camera = Pose::from_translation(Vec3::new(0.0, 1.5, 0.0));

        renderer
            .draw_planes(
                &mut gpu,
                &[square(7, 0.0, 1.0), square(9, 1.0, 1.0)],
                &camera,
                &Mat4::IDENTITY,
                &Mat4::IDENTITY,
            )
            .unwrap();
        let mut merged = square(7, 0.0, 1.0);
        merged.subsumed_by = Some(TrackableId(9));
        let drawn = renderer
            .draw_planes(
                &mut gpu,
                &[merged, square(9, 1.0, 1.0), square(11, 0.5, 1.0)],
                &camera,
                &Mat4::IDENTITY,
                &Mat4::IDENTITY,
            )
            .unwrap();
        assert_eq!(drawn, 2);
        assert_eq!(renderer.plane_indices.len(), 2);
        assert_eq!(renderer.plane_indices[&TrackableId(9)], 1);
        // Indices are never reused.
        assert_eq!(renderer.plane_indices[&TrackableId(11)], 2);
    }
}
