//! The per-frame render sequence. Owns every sub-renderer, the lighting
//! estimator and the offscreen virtual-scene target.

pub mod background;
pub mod planes;
pub mod point_cloud;
pub mod virtual_object;

use self::{
    background::BackgroundRenderer, planes::PlaneRenderer, point_cloud::PointCloudRenderer,
    virtual_object::VirtualObjectRenderer,
};
use crate::{
    assets::AssetSource,
    config::{DepthSettings, RenderConfig},
    gpu::{DrawTarget, FramebufferId, GpuBackend, TextureId},
    lighting::{LightingEstimator, Shading, SpecularCubemapFilter},
    pose::Pose,
    tracking::{Frame, Plane},
    Error, Result,
};
use glam::Mat4;

/// Matrices reused across frames instead of being reallocated per draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub model: Mat4,
    pub model_view: Mat4,
    pub model_view_projection: Mat4,
}

impl Default for FrameTransforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            model_view: Mat4::IDENTITY,
            model_view_projection: Mat4::IDENTITY,
        }
    }
}

impl FrameTransforms {
    pub fn set_camera(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
        self.set_model(Mat4::IDENTITY);
    }

    pub fn set_model(&mut self, model: Mat4) {
        self.model = model;
        self.model_view = self.view * model;
        self.model_view_projection = self.projection * self.model_view;
    }
}

/// What the 3D part of a frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneStats {
    pub point_cloud_uploaded: bool,
    pub planes_drawn: usize,
    pub objects_drawn: usize,
    pub lit: bool,
}

pub struct SceneComposer {
    background: BackgroundRenderer,
    point_cloud: PointCloudRenderer,
    planes: PlaneRenderer,
    object: VirtualObjectRenderer,
    lighting: LightingEstimator,
    virtual_scene: FramebufferId,
    transforms: FrameTransforms,
    z_near: f32,
    z_far: f32,
}

impl SceneComposer {
    /// Load every asset and create every GPU resource the frame loop needs.
    /// Any failure here leaves no partially built scene behind.
    pub fn new(
        gpu: &mut dyn GpuBackend,
        assets: &dyn AssetSource,
        config: &RenderConfig,
    ) -> Result<Self> {
        let background = BackgroundRenderer::new(gpu, assets)?;
        let planes = PlaneRenderer::new(gpu, assets)?;
        let point_cloud = PointCloudRenderer::new(gpu, assets, config)?;
        // Real size arrives with the first surface change.
        let virtual_scene = gpu.create_framebuffer(1, 1)?;

        let filter = SpecularCubemapFilter::new(
            gpu,
            assets,
            config.cubemap_resolution,
            config.cubemap_importance_samples,
        )?;
        let object = VirtualObjectRenderer::new(gpu, assets, &filter)?;

        log::info!("Scene ready");
        Ok(Self {
            background,
            point_cloud,
            planes,
            object,
            lighting: LightingEstimator::new(filter),
            virtual_scene,
            transforms: FrameTransforms::default(),
            z_near: config.z_near,
            z_far: config.z_far,
        })
    }

    /// The texture the session should stream camera images into.
    pub fn camera_texture(&self) -> TextureId {
        self.background.camera_color_texture()
    }

    pub fn virtual_scene(&self) -> FramebufferId {
        self.virtual_scene
    }

    pub fn background(&self) -> &BackgroundRenderer {
        &self.background
    }

    pub fn resize(&mut self, gpu: &mut dyn GpuBackend, width: u32, height: u32) {
        if width > 0 && height > 0 {
            gpu.resize_framebuffer(self.virtual_scene, width, height);
        }
    }

    /// Bring the background and occlusion programs in line with the settings.
    pub fn apply_depth_settings(
        &mut self,
        gpu: &mut dyn GpuBackend,
        settings: &DepthSettings,
    ) -> Result<()> {
        self.background
            .set_use_depth_visualization(gpu, settings.depth_color_visualization())?;
        self.background
            .set_use_occlusion(gpu, settings.use_depth_for_occlusion())
    }

    pub fn update_display_geometry(
        &mut self,
        gpu: &mut dyn GpuBackend,
        frame: &Frame,
    ) -> Result<()> {
        self.background.update_display_geometry(gpu, frame)
    }

    /// Feed the frame's depth image to the background pass. A missing image
    /// is normal for the first frames and is skipped quietly.
    pub fn update_depth(&mut self, gpu: &mut dyn GpuBackend, frame: &Frame) -> Result<()> {
        match frame.acquire_depth_image() {
            Ok(image) => self.background.update_camera_depth_texture(gpu, image),
            Err(Error::DepthNotYetAvailable) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Draw the camera image unless the camera has not produced one yet.
    pub fn draw_background(&self, gpu: &mut dyn GpuBackend, frame: &Frame) -> bool {
        if frame.timestamp == 0 {
            return false;
        }
        self.background.draw_background(gpu);
        true
    }

    /// Points, planes and markers over the background.
    pub fn draw_scene(
        &mut self,
        gpu: &mut dyn GpuBackend,
        frame: &Frame,
        planes: &[Plane],
        markers: &[Pose],
    ) -> Result<SceneStats> {
        let transforms = &mut self.transforms;
        transforms.set_camera(
            frame.camera.view_matrix(),
            frame.camera.projection_matrix(self.z_near, self.z_far),
        );

        // Pass 1: Feature points
        let point_cloud_uploaded = self.point_cloud.update(gpu, &frame.point_cloud)?;
        self.point_cloud.draw(gpu, &transforms.model_view_projection);

        // Pass 2: Planes
        let planes_drawn = self.planes.draw_planes(
            gpu,
            planes,
            &frame.camera.display_oriented_pose,
            &transforms.view,
            &transforms.projection,
        )?;

        // Pass 3: Lighting
        let shading = self.lighting.update(
            gpu,
            self.object.shader(),
            &frame.light_estimate,
            &transforms.view,
        )?;

        // Pass 4: Markers into the offscreen target
        gpu.clear(DrawTarget::Framebuffer(self.virtual_scene), [0.0; 4]);
        for pose in markers {
            self.object.draw(gpu, transforms, pose, self.virtual_scene);
        }

        // Pass 5: Composite
        self.background
            .draw_virtual_scene(gpu, self.virtual_scene, self.z_near, self.z_far);

        Ok(SceneStats {
            point_cloud_uploaded,
            planes_drawn,
            objects_drawn: markers.len(),
            lit: matches!(shading, Shading::Lit(_)),
        })
    }
}
