//! A headless backend that records every command instead of executing it.

use super::{
    ColorFormat, DrawTarget, FramebufferId, GpuBackend, IndexBufferId, MeshId, PrimitiveMode,
    ShaderId, ShaderSource, TextureDesc, TextureId, TextureUpload, UniformValue, VertexBufferId,
    WrapMode,
};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

/// One recorded GPU operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UploadTexture {
        texture: TextureId,
        level: u32,
        face: Option<u32>,
        bytes: usize,
    },
    SetVertexData {
        buffer: VertexBufferId,
        bytes: usize,
    },
    SetIndexData {
        buffer: IndexBufferId,
        count: usize,
    },
    ResizeFramebuffer {
        framebuffer: FramebufferId,
        width: u32,
        height: u32,
    },
    Clear {
        target: DrawTarget,
        rgba: [f32; 4],
    },
    Draw {
        mesh: MeshId,
        shader: ShaderId,
        target: DrawTarget,
    },
}

#[derive(Debug)]
struct Framebuffer {
    color: TextureId,
    depth: TextureId,
    size: (u32, u32),
}

/// Allocates sequential handles and keeps the uniform state of every shader,
/// so callers can inspect exactly what a frame would have submitted.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: u32,
    shader_labels: HashMap<ShaderId, String>,
    shader_defines: HashMap<ShaderId, Vec<(String, String)>>,
    texture_labels: HashMap<TextureId, String>,
    uniforms: HashMap<ShaderId, HashMap<String, UniformValue>>,
    vertex_data: HashMap<VertexBufferId, Vec<u8>>,
    framebuffers: HashMap<FramebufferId, Framebuffer>,
    commands: Vec<Command>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drain the command log, e.g. at the end of a frame.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn shader_label(&self, shader: ShaderId) -> Option<&str> {
        self.shader_labels.get(&shader).map(String::as_str)
    }

    /// Looks up the most recently created shader with this label.
    pub fn shader_by_label(&self, label: &str) -> Option<ShaderId> {
        self.shader_labels
            .iter()
            .filter(|(_, l)| l.as_str() == label)
            .map(|(id, _)| *id)
            .max()
    }

    pub fn shader_define(&self, shader: ShaderId, name: &str) -> Option<&str> {
        self.shader_defines
            .get(&shader)?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn texture_label(&self, texture: TextureId) -> Option<&str> {
        self.texture_labels.get(&texture).map(String::as_str)
    }

    pub fn uniform(&self, shader: ShaderId, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(&shader)?.get(name)
    }

    pub fn vertex_data(&self, buffer: VertexBufferId) -> Option<&[u8]> {
        self.vertex_data.get(&buffer).map(Vec::as_slice)
    }

    pub fn framebuffer_size(&self, framebuffer: FramebufferId) -> Option<(u32, u32)> {
        self.framebuffers.get(&framebuffer).map(|fb| fb.size)
    }

    /// Draw commands issued with a shader carrying `label`.
    pub fn draws_with(&self, label: &str) -> usize {
        self.commands
            .iter()
            .filter(|c| match c {
                Command::Draw { shader, .. } => self.shader_label(*shader) == Some(label),
                _ => false,
            })
            .count()
    }

    fn label_texture(&mut self, label: &str) -> TextureId {
        let id = TextureId(self.alloc());
        self.texture_labels.insert(id, label.to_owned());
        id
    }
}

impl GpuBackend for RecordingBackend {
    fn create_shader(&mut self, label: &str, source: &ShaderSource) -> Result<ShaderId> {
        if source.vertex.trim().is_empty() || source.fragment.trim().is_empty() {
            bail!("shader `{label}` has an empty stage");
        }
        let id = ShaderId(self.alloc());
        self.shader_labels.insert(id, label.to_owned());
        self.shader_defines.insert(
            id,
            source
                .defines
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        Ok(id)
    }

    fn create_texture(&mut self, label: &str, _desc: TextureDesc) -> Result<TextureId> {
        Ok(self.label_texture(label))
    }

    fn create_texture_from_image(
        &mut self,
        label: &str,
        encoded: &[u8],
        _wrap: WrapMode,
        _color: ColorFormat,
    ) -> Result<TextureId> {
        if encoded.is_empty() {
            bail!("image for texture `{label}` is empty");
        }
        Ok(self.label_texture(label))
    }

    fn upload_texture(&mut self, texture: TextureId, upload: &TextureUpload<'_>) -> Result<()> {
        let expected =
            upload.width as usize * upload.height as usize * upload.format.bytes_per_texel();
        if upload.data.len() != expected {
            bail!(
                "texture upload of {} bytes, expected {} for {}x{} {:?}",
                upload.data.len(),
                expected,
                upload.width,
                upload.height,
                upload.format
            );
        }
        self.commands.push(Command::UploadTexture {
            texture,
            level: upload.level,
            face: upload.face,
            bytes: upload.data.len(),
        });
        Ok(())
    }

    fn create_vertex_buffer(&mut self, _entries_per_vertex: u32) -> Result<VertexBufferId> {
        let id = VertexBufferId(self.alloc());
        self.vertex_data.insert(id, Vec::new());
        Ok(id)
    }

    fn set_vertex_data(&mut self, buffer: VertexBufferId, data: &[u8]) -> Result<()> {
        let slot = self
            .vertex_data
            .get_mut(&buffer)
            .ok_or_else(|| anyhow!("unknown vertex buffer {buffer:?}"))?;
        slot.clear();
        slot.extend_from_slice(data);
        self.commands.push(Command::SetVertexData {
            buffer,
            bytes: data.len(),
        });
        Ok(())
    }

    fn create_index_buffer(&mut self) -> Result<IndexBufferId> {
        Ok(IndexBufferId(self.alloc()))
    }

    fn set_index_data(&mut self, buffer: IndexBufferId, indices: &[u32]) -> Result<()> {
        self.commands.push(Command::SetIndexData {
            buffer,
            count: indices.len(),
        });
        Ok(())
    }

    fn create_mesh(
        &mut self,
        _mode: PrimitiveMode,
        _indices: Option<IndexBufferId>,
        vertex_buffers: &[VertexBufferId],
    ) -> Result<MeshId> {
        if vertex_buffers.is_empty() {
            bail!("a mesh needs at least one vertex buffer");
        }
        Ok(MeshId(self.alloc()))
    }

    fn create_mesh_from_obj(&mut self, label: &str, obj: &[u8]) -> Result<MeshId> {
        if obj.is_empty() {
            bail!("OBJ document for `{label}` is empty");
        }
        Ok(MeshId(self.alloc()))
    }

    fn create_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId> {
        let id = FramebufferId(self.alloc());
        let color = self.label_texture("framebuffer color");
        let depth = self.label_texture("framebuffer depth");
        self.framebuffers.insert(
            id,
            Framebuffer {
                color,
                depth,
                size: (width, height),
            },
        );
        Ok(id)
    }

    fn resize_framebuffer(&mut self, framebuffer: FramebufferId, width: u32, height: u32) {
        if let Some(fb) = self.framebuffers.get_mut(&framebuffer) {
            fb.size = (width, height);
            self.commands.push(Command::ResizeFramebuffer {
                framebuffer,
                width,
                height,
            });
        }
    }

    fn framebuffer_color_texture(&self, framebuffer: FramebufferId) -> TextureId {
        self.framebuffers
            .get(&framebuffer)
            .map(|fb| fb.color)
            .unwrap_or(TextureId(0))
    }

    fn framebuffer_depth_texture(&self, framebuffer: FramebufferId) -> TextureId {
        self.framebuffers
            .get(&framebuffer)
            .map(|fb| fb.depth)
            .unwrap_or(TextureId(0))
    }

    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue) {
        self.uniforms
            .entry(shader)
            .or_default()
            .insert(name.to_owned(), value);
    }

    fn clear(&mut self, target: DrawTarget, rgba: [f32; 4]) {
        self.commands.push(Command::Clear { target, rgba });
    }

    fn draw(&mut self, mesh: MeshId, shader: ShaderId, target: DrawTarget) {
        self.commands.push(Command::Draw {
            mesh,
            shader,
            target,
        });
    }
}
