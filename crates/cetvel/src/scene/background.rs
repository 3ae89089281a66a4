//! Camera background and the occlusion-aware composite of the virtual scene.

use crate::{
    assets::{self, AssetSource},
    gpu::{
        BlendFactor, ColorFormat, DrawTarget, FramebufferId, GpuBackend, MeshId, PipelineState,
        PrimitiveMode, ShaderId, ShaderSource, TexelFormat, TextureDesc, TextureId,
        TextureTarget, TextureUpload, UniformValue, VertexBufferId, WrapMode,
    },
    tracking::{DepthImage, Frame},
    Result,
};

/// Normalized device coordinates of the full-screen quad, as a triangle strip.
const SCREEN_QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

const OVERLAY: PipelineState = PipelineState {
    depth_test: false,
    depth_write: false,
    blend: None,
};

const COMPOSITE: PipelineState = PipelineState {
    depth_test: false,
    depth_write: false,
    blend: Some((
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        BlendFactor::One,
        BlendFactor::OneMinusSrcAlpha,
    )),
};

/// Every program source the background can switch between. Read once at
/// setup so toggling a mode later never touches the asset source.
struct BackgroundSources {
    camera: ShaderSource,
    depth: ShaderSource,
    occlusion: ShaderSource,
}

impl BackgroundSources {
    fn load(assets: &dyn AssetSource) -> Result<Self> {
        Ok(Self {
            camera: assets::shader_source(
                assets,
                assets::BACKGROUND_CAMERA_VERT,
                assets::BACKGROUND_CAMERA_FRAG,
                &[],
                OVERLAY,
            )?,
            depth: assets::shader_source(
                assets,
                assets::BACKGROUND_DEPTH_VERT,
                assets::BACKGROUND_DEPTH_FRAG,
                &[],
                OVERLAY,
            )?,
            occlusion: assets::shader_source(
                assets,
                assets::OCCLUSION_VERT,
                assets::OCCLUSION_FRAG,
                &[],
                COMPOSITE,
            )?,
        })
    }

    fn occlusion(&self, use_occlusion: bool) -> ShaderSource {
        let mut source = self.occlusion.clone();
        source.defines.insert(
            "USE_OCCLUSION".to_owned(),
            if use_occlusion { "1" } else { "0" }.to_owned(),
        );
        source
    }
}

pub struct BackgroundRenderer {
    sources: BackgroundSources,
    camera_color_texture: TextureId,
    camera_depth_texture: TextureId,
    depth_palette_texture: TextureId,
    camera_tex_coords: VertexBufferId,
    quad: MeshId,
    background_shader: ShaderId,
    occlusion_shader: ShaderId,
    use_depth_visualization: bool,
    use_occlusion: bool,
    depth_aspect_ratio: f32,
}

impl BackgroundRenderer {
    pub fn new(gpu: &mut dyn GpuBackend, assets: &dyn AssetSource) -> Result<Self> {
        let sources = BackgroundSources::load(assets)?;

        let camera_color_texture = gpu.create_texture(
            "Camera Color",
            TextureDesc::new(TextureTarget::External, WrapMode::ClampToEdge, false),
        )?;
        let camera_depth_texture = gpu.create_texture(
            "Camera Depth",
            TextureDesc::new(TextureTarget::Texture2d, WrapMode::ClampToEdge, false),
        )?;
        let depth_palette_texture = gpu.create_texture_from_image(
            "Depth Palette",
            &assets::read(assets, assets::DEPTH_PALETTE_TEXTURE)?,
            WrapMode::ClampToEdge,
            ColorFormat::Linear,
        )?;

        let screen_coords = gpu.create_vertex_buffer(2)?;
        gpu.set_vertex_data(screen_coords, bytemuck::cast_slice(&SCREEN_QUAD))?;
        // Filled in by the session once the display geometry is known.
        let camera_tex_coords = gpu.create_vertex_buffer(2)?;
        let quad = gpu.create_mesh(
            PrimitiveMode::TriangleStrip,
            None,
            &[screen_coords, camera_tex_coords],
        )?;

        let background_shader = create_background_shader(
            gpu,
            &sources,
            false,
            camera_color_texture,
            camera_depth_texture,
            depth_palette_texture,
        )?;
        let occlusion_shader =
            create_occlusion_shader(gpu, &sources, false, camera_depth_texture, 0.0)?;

        Ok(Self {
            sources,
            camera_color_texture,
            camera_depth_texture,
            depth_palette_texture,
            camera_tex_coords,
            quad,
            background_shader,
            occlusion_shader,
            use_depth_visualization: false,
            use_occlusion: false,
            depth_aspect_ratio: 0.0,
        })
    }

    /// Texture the session streams the camera image into.
    pub fn camera_color_texture(&self) -> TextureId {
        self.camera_color_texture
    }

    pub fn use_depth_visualization(&self) -> bool {
        self.use_depth_visualization
    }

    pub fn use_occlusion(&self) -> bool {
        self.use_occlusion
    }

    /// Switch between the camera image and the false-color depth view.
    /// The shader is only rebuilt when the mode actually changes.
    pub fn set_use_depth_visualization(
        &mut self,
        gpu: &mut dyn GpuBackend,
        enable: bool,
    ) -> Result<()> {
        if self.use_depth_visualization == enable {
            return Ok(());
        }
        self.background_shader = create_background_shader(
            gpu,
            &self.sources,
            enable,
            self.camera_color_texture,
            self.camera_depth_texture,
            self.depth_palette_texture,
        )?;
        self.use_depth_visualization = enable;
        Ok(())
    }

    pub fn set_use_occlusion(&mut self, gpu: &mut dyn GpuBackend, enable: bool) -> Result<()> {
        if self.use_occlusion == enable {
            return Ok(());
        }
        self.occlusion_shader = create_occlusion_shader(
            gpu,
            &self.sources,
            enable,
            self.camera_depth_texture,
            self.depth_aspect_ratio,
        )?;
        self.use_occlusion = enable;
        Ok(())
    }

    /// Pick up new camera texture coordinates when the display geometry changed.
    pub fn update_display_geometry(
        &mut self,
        gpu: &mut dyn GpuBackend,
        frame: &Frame,
    ) -> Result<()> {
        if let Some(coords) = &frame.display_geometry {
            gpu.set_vertex_data(self.camera_tex_coords, bytemuck::cast_slice(coords))?;
        }
        Ok(())
    }

    /// Upload a 16-bit depth image as two 8-bit channels.
    pub fn update_camera_depth_texture(
        &mut self,
        gpu: &mut dyn GpuBackend,
        image: &DepthImage,
    ) -> Result<()> {
        gpu.upload_texture(
            self.camera_depth_texture,
            &TextureUpload {
                width: image.width,
                height: image.height,
                format: TexelFormat::Rg8,
                level: 0,
                face: None,
                data: bytemuck::cast_slice(&image.data),
            },
        )?;
        self.depth_aspect_ratio = image.width as f32 / image.height.max(1) as f32;
        if self.use_occlusion {
            gpu.set_uniform(
                self.occlusion_shader,
                "u_DepthAspectRatio",
                UniformValue::Float(self.depth_aspect_ratio),
            );
        }
        Ok(())
    }

    pub fn draw_background(&self, gpu: &mut dyn GpuBackend) {
        gpu.draw(self.quad, self.background_shader, DrawTarget::Screen);
    }

    /// Blend the offscreen virtual scene over the background, hiding fragments
    /// behind real geometry when occlusion is on.
    pub fn draw_virtual_scene(
        &self,
        gpu: &mut dyn GpuBackend,
        virtual_scene: FramebufferId,
        z_near: f32,
        z_far: f32,
    ) {
        let color = gpu.framebuffer_color_texture(virtual_scene);
        gpu.set_uniform(
            self.occlusion_shader,
            "u_VirtualSceneColorTexture",
            UniformValue::Texture(color),
        );
        if self.use_occlusion {
            let depth = gpu.framebuffer_depth_texture(virtual_scene);
            gpu.set_uniform(
                self.occlusion_shader,
                "u_VirtualSceneDepthTexture",
                UniformValue::Texture(depth),
            );
            gpu.set_uniform(self.occlusion_shader, "u_ZNear", UniformValue::Float(z_near));
            gpu.set_uniform(self.occlusion_shader, "u_ZFar", UniformValue::Float(z_far));
        }
        gpu.draw(self.quad, self.occlusion_shader, DrawTarget::Screen);
    }
}

fn create_background_shader(
    gpu: &mut dyn GpuBackend,
    sources: &BackgroundSources,
    depth_visualization: bool,
    color: TextureId,
    depth: TextureId,
    palette: TextureId,
) -> Result<ShaderId> {
    if depth_visualization {
        let shader = gpu.create_shader("background_depth", &sources.depth)?;
        gpu.set_uniform(shader, "u_CameraDepthTexture", UniformValue::Texture(depth));
        gpu.set_uniform(shader, "u_ColorMap", UniformValue::Texture(palette));
        Ok(shader)
    } else {
        let shader = gpu.create_shader("background_camera", &sources.camera)?;
        gpu.set_uniform(shader, "u_CameraColorTexture", UniformValue::Texture(color));
        Ok(shader)
    }
}

fn create_occlusion_shader(
    gpu: &mut dyn GpuBackend,
    sources: &BackgroundSources,
    use_occlusion: bool,
    depth: TextureId,
    depth_aspect_ratio: f32,
) -> Result<ShaderId> {
    let shader = gpu.create_shader("occlusion", &sources.occlusion(use_occlusion))?;
    if use_occlusion {
        gpu.set_uniform(shader, "u_CameraDepthTexture", UniformValue::Texture(depth));
        gpu.set_uniform(shader, "u_DepthAspectRatio", UniformValue::Float(depth_aspect_ratio));
    }
    Ok(shader)
}
