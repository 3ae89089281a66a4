use crate::{
    assets::{self, AssetSource},
    config::RenderConfig,
    gpu::{
        DrawTarget, GpuBackend, MeshId, PipelineState, PrimitiveMode, ShaderId, UniformValue,
        VertexBufferId,
    },
    tracking::PointCloud,
    Result,
};
use glam::{Mat4, Vec4};

/// Feature points, re-uploaded only when the session hands out a newer cloud.
pub struct PointCloudRenderer {
    vertex_buffer: VertexBufferId,
    mesh: MeshId,
    shader: ShaderId,
    last_timestamp: i64,
}

impl PointCloudRenderer {
    pub fn new(
        gpu: &mut dyn GpuBackend,
        assets: &dyn AssetSource,
        config: &RenderConfig,
    ) -> Result<Self> {
        let source = assets::shader_source(
            assets,
            assets::POINT_CLOUD_VERT,
            assets::POINT_CLOUD_FRAG,
            &[],
            PipelineState::default(),
        )?;
        let shader = gpu.create_shader("point_cloud", &source)?;
        gpu.set_uniform(
            shader,
            "u_Color",
            UniformValue::Vec4(Vec4::from_array(config.point_color)),
        );
        gpu.set_uniform(shader, "u_PointSize", UniformValue::Float(config.point_size));

        // X, Y, Z, confidence
        let vertex_buffer = gpu.create_vertex_buffer(4)?;
        let mesh = gpu.create_mesh(PrimitiveMode::Points, None, &[vertex_buffer])?;

        Ok(Self {
            vertex_buffer,
            mesh,
            shader,
            last_timestamp: 0,
        })
    }

    pub fn last_timestamp(&self) -> i64 {
        self.last_timestamp
    }

    /// Upload `cloud` iff its timestamp is strictly newer than the last upload.
    /// Returns whether an upload happened.
    pub fn update(&mut self, gpu: &mut dyn GpuBackend, cloud: &PointCloud) -> Result<bool> {
        if cloud.timestamp <= self.last_timestamp {
            return Ok(false);
        }
        gpu.set_vertex_data(self.vertex_buffer, bytemuck::cast_slice(&cloud.points))?;
        self.last_timestamp = cloud.timestamp;
        Ok(true)
    }

    pub fn draw(&self, gpu: &mut dyn GpuBackend, view_projection: &Mat4) {
        gpu.set_uniform(
            self.shader,
            "u_ModelViewProjection",
            UniformValue::Mat4(*view_projection),
        );
        gpu.draw(self.mesh, self.shader, DrawTarget::Screen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::MemoryAssets,
        gpu::{Command, RecordingBackend},
        tracking::PointVertex,
    };

    fn renderer(gpu: &mut RecordingBackend) -> PointCloudRenderer {
        let mut assets = MemoryAssets::new();
        assets.insert(assets::POINT_CLOUD_VERT, "void main() {}");
        assets.insert(assets::POINT_CLOUD_FRAG, "void main() {}");
        PointCloudRenderer::new(gpu, &assets, &RenderConfig::default()).unwrap()
    }

    fn cloud(timestamp: i64, n: usize) -> PointCloud {
        PointCloud {
            timestamp,
            points: vec![
                PointVertex {
                    position: [0.0, 1.0, 2.0],
                    confidence: 0.5,
                };
                n
            ],
        }
    }

    fn uploads(gpu: &RecordingBackend) -> usize {
        gpu.commands()
            .iter()
            .filter(|c| matches!(c, Command::SetVertexData { .. }))
            .count()
    }

    #[test]
    fn uploads_only_when_timestamp_advances() {
        let mut gpu = RecordingBackend::new();
        let mut points = renderer(&mut gpu);

        assert!(points.update(&mut gpu, &cloud(10, 3)).unwrap());
        assert!(!points.update(&mut gpu, &cloud(10, 3)).unwrap());
        assert!(!points.update(&mut gpu, &cloud(9, 3)).unwrap());
        assert!(points.update(&mut gpu, &cloud(11, 2)).unwrap());

        assert_eq!(uploads(&gpu), 2);
        assert_eq!(points.last_timestamp(), 11);
        assert_eq!(gpu.vertex_data(points.vertex_buffer).unwrap().len(), 2 * 16);
    }

    #[test]
    fn redelivered_cloud_causes_no_upload() {
        let mut gpu = RecordingBackend::new();
        let mut points = renderer(&mut gpu);
        points.update(&mut gpu, &cloud(5, 1)).unwrap();
        gpu.take_commands();
        for _ in 0..3 {
            points.update(&mut gpu, &cloud(5, 1)).unwrap();
        }
        assert_eq!(uploads(&gpu), 0);
    }
}
