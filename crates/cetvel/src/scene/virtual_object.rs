use crate::{
    assets::{self, AssetSource},
    gpu::{
        ColorFormat, DrawTarget, FramebufferId, GpuBackend, MeshId, PipelineState, ShaderId,
        TexelFormat, TextureDesc, TextureId, TextureTarget, TextureUpload, UniformValue, WrapMode,
    },
    lighting::SpecularCubemapFilter,
    pose::Pose,
    Result,
};

use super::FrameTransforms;

/// The marker model, shaded with the environmental HDR program.
pub struct VirtualObjectRenderer {
    mesh: MeshId,
    shader: ShaderId,
}

impl VirtualObjectRenderer {
    pub fn new(
        gpu: &mut dyn GpuBackend,
        assets: &dyn AssetSource,
        filter: &SpecularCubemapFilter,
    ) -> Result<Self> {
        let dfg = gpu.create_texture(
            "DFG",
            TextureDesc::new(TextureTarget::Texture2d, WrapMode::ClampToEdge, false),
        )?;
        gpu.upload_texture(
            dfg,
            &TextureUpload {
                width: assets::DFG_RESOLUTION,
                height: assets::DFG_RESOLUTION,
                format: TexelFormat::Rg16F,
                level: 0,
                face: None,
                data: &assets::read_dfg_table(assets)?,
            },
        )?;

        let albedo = gpu.create_texture_from_image(
            "Pawn Albedo",
            &assets::read(assets, assets::PAWN_ALBEDO_TEXTURE)?,
            WrapMode::ClampToEdge,
            ColorFormat::Srgb,
        )?;
        let roughness_metallic_ao = gpu.create_texture_from_image(
            "Pawn Roughness/Metallic/AO",
            &assets::read(assets, assets::PAWN_PBR_TEXTURE)?,
            WrapMode::ClampToEdge,
            ColorFormat::Linear,
        )?;
        let mesh = gpu.create_mesh_from_obj("pawn", &assets::read(assets, assets::PAWN_MESH)?)?;

        let source = assets::shader_source(
            assets,
            assets::ENVIRONMENTAL_HDR_VERT,
            assets::ENVIRONMENTAL_HDR_FRAG,
            &[(
                "NUMBER_OF_MIPMAP_LEVELS",
                filter.number_of_mipmap_levels().to_string(),
            )],
            PipelineState::default(),
        )?;
        let shader = gpu.create_shader("environmental_hdr", &source)?;
        let textures: [(&str, TextureId); 4] = [
            ("u_AlbedoTexture", albedo),
            ("u_RoughnessMetallicAmbientOcclusionTexture", roughness_metallic_ao),
            ("u_Cubemap", filter.filtered_cubemap()),
            ("u_DfgTexture", dfg),
        ];
        for (name, texture) in textures {
            gpu.set_uniform(shader, name, UniformValue::Texture(texture));
        }

        Ok(Self { mesh, shader })
    }

    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    /// Draw one instance at `pose` into the virtual-scene framebuffer.
    pub fn draw(
        &self,
        gpu: &mut dyn GpuBackend,
        transforms: &mut FrameTransforms,
        pose: &Pose,
        target: FramebufferId,
    ) {
        transforms.set_model(pose.to_matrix());
        gpu.set_uniform(
            self.shader,
            "u_ModelView",
            UniformValue::Mat4(transforms.model_view),
        );
        gpu.set_uniform(
            self.shader,
            "u_ModelViewProjection",
            UniformValue::Mat4(transforms.model_view_projection),
        );
        gpu.draw(self.mesh, self.shader, DrawTarget::Framebuffer(target));
    }
}
