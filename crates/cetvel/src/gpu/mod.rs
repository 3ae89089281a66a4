//! The GPU backend seam.
//!
//! The core never talks to a graphics API directly. It creates resources once
//! through [`GpuBackend`], keeps the returned handles, and on every frame only
//! sets uniforms, uploads changed data, clears and submits draws.

pub mod recording;

use glam::{Mat4, Vec3, Vec4};
use std::collections::BTreeMap;

pub use self::recording::{Command, RecordingBackend};

macro_rules! handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);
        )*
    };
}

handle!(
    /// A compiled shader program together with its uniform set.
    ShaderId,
    /// A vertex-array object binding vertex and index buffers.
    MeshId,
    TextureId,
    FramebufferId,
    VertexBufferId,
    IndexBufferId,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Triangles,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    Texture2d,
    CubeMap,
    /// Externally produced image stream, e.g. the camera feed.
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Linear,
    Srgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub target: TextureTarget,
    pub wrap: WrapMode,
    pub use_mipmaps: bool,
}

impl TextureDesc {
    pub const fn new(target: TextureTarget, wrap: WrapMode, use_mipmaps: bool) -> Self {
        Self {
            target,
            wrap,
            use_mipmaps,
        }
    }
}

/// Texel layout of raw uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelFormat {
    /// Two 8-bit channels; 16-bit depth is uploaded this way.
    Rg8,
    /// Two half-float channels.
    Rg16F,
    /// Four half-float channels.
    Rgba16F,
}

impl TexelFormat {
    pub const fn bytes_per_texel(self) -> usize {
        match self {
            TexelFormat::Rg8 => 2,
            TexelFormat::Rg16F => 4,
            TexelFormat::Rgba16F => 8,
        }
    }
}

/// A raw texel upload into one level (and cubemap face) of a texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub level: u32,
    /// Cubemap face index in `+X, -X, +Y, -Y, +Z, -Z` order; `None` for 2D targets.
    pub face: Option<u32>,
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
}

/// Fixed-function state applied whenever a shader is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub depth_test: bool,
    pub depth_write: bool,
    /// `(rgb_src, rgb_dst, alpha_src, alpha_dst)`; `None` disables blending.
    pub blend: Option<(BlendFactor, BlendFactor, BlendFactor, BlendFactor)>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            blend: None,
        }
    }
}

/// Source of a shader program. `defines` are injected as `#define NAME VALUE`.
#[derive(Debug, Clone, Default)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
    pub defines: BTreeMap<String, String>,
    pub state: PipelineState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    Vec3Array(Vec<Vec3>),
    FloatArray(Vec<f32>),
    Texture(TextureId),
}

/// Where a draw or clear lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    Screen,
    Framebuffer(FramebufferId),
    CubemapFace {
        texture: TextureId,
        face: u32,
        level: u32,
    },
}

/// Primitive GPU operations consumed by the scene composer.
///
/// Resource creation happens once per surface lifetime. Backends report
/// failures through `anyhow`; the core wraps them in [`crate::Error::Backend`].
pub trait GpuBackend {
    fn create_shader(&mut self, label: &str, source: &ShaderSource) -> anyhow::Result<ShaderId>;

    fn create_texture(&mut self, label: &str, desc: TextureDesc) -> anyhow::Result<TextureId>;

    /// Decode an encoded image (PNG/JPEG) into a new 2D texture.
    fn create_texture_from_image(
        &mut self,
        label: &str,
        encoded: &[u8],
        wrap: WrapMode,
        color: ColorFormat,
    ) -> anyhow::Result<TextureId>;

    fn upload_texture(&mut self, texture: TextureId, upload: &TextureUpload<'_>) -> anyhow::Result<()>;

    fn create_vertex_buffer(&mut self, entries_per_vertex: u32) -> anyhow::Result<VertexBufferId>;

    /// Replace the buffer's contents. `data` is tightly packed `f32` entries.
    fn set_vertex_data(&mut self, buffer: VertexBufferId, data: &[u8]) -> anyhow::Result<()>;

    fn create_index_buffer(&mut self) -> anyhow::Result<IndexBufferId>;

    fn set_index_data(&mut self, buffer: IndexBufferId, indices: &[u32]) -> anyhow::Result<()>;

    fn create_mesh(
        &mut self,
        mode: PrimitiveMode,
        indices: Option<IndexBufferId>,
        vertex_buffers: &[VertexBufferId],
    ) -> anyhow::Result<MeshId>;

    /// Parse a Wavefront OBJ document into a triangle mesh.
    fn create_mesh_from_obj(&mut self, label: &str, obj: &[u8]) -> anyhow::Result<MeshId>;

    fn create_framebuffer(&mut self, width: u32, height: u32) -> anyhow::Result<FramebufferId>;

    fn resize_framebuffer(&mut self, framebuffer: FramebufferId, width: u32, height: u32);

    fn framebuffer_color_texture(&self, framebuffer: FramebufferId) -> TextureId;

    fn framebuffer_depth_texture(&self, framebuffer: FramebufferId) -> TextureId;

    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue);

    fn clear(&mut self, target: DrawTarget, rgba: [f32; 4]);

    fn draw(&mut self, mesh: MeshId, shader: ShaderId, target: DrawTarget);
}
