//! Asset access for one-time surface setup.
//!
//! Only raw bytes come through here; decoding images and meshes is left to the
//! GPU backend.

use crate::{
    gpu::{PipelineState, ShaderSource},
    Error, Result,
};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

pub const POINT_CLOUD_VERT: &str = "shaders/point_cloud.vert";
pub const POINT_CLOUD_FRAG: &str = "shaders/point_cloud.frag";
pub const PLANE_VERT: &str = "shaders/plane.vert";
pub const PLANE_FRAG: &str = "shaders/plane.frag";
pub const BACKGROUND_CAMERA_VERT: &str = "shaders/background_show_camera.vert";
pub const BACKGROUND_CAMERA_FRAG: &str = "shaders/background_show_camera.frag";
pub const BACKGROUND_DEPTH_VERT: &str = "shaders/background_show_depth_color_visualization.vert";
pub const BACKGROUND_DEPTH_FRAG: &str = "shaders/background_show_depth_color_visualization.frag";
pub const OCCLUSION_VERT: &str = "shaders/occlusion.vert";
pub const OCCLUSION_FRAG: &str = "shaders/occlusion.frag";
pub const CUBEMAP_FILTER_VERT: &str = "shaders/cubemap_filter.vert";
pub const CUBEMAP_FILTER_FRAG: &str = "shaders/cubemap_filter.frag";
pub const ENVIRONMENTAL_HDR_VERT: &str = "shaders/environmental_hdr.vert";
pub const ENVIRONMENTAL_HDR_FRAG: &str = "shaders/environmental_hdr.frag";

pub const DEPTH_PALETTE_TEXTURE: &str = "models/depth_color_palette.png";
pub const PLANE_GRID_TEXTURE: &str = "models/trigrid.png";
pub const PAWN_MESH: &str = "models/pawn.obj";
pub const PAWN_ALBEDO_TEXTURE: &str = "models/pawn_albedo.png";
pub const PAWN_PBR_TEXTURE: &str = "models/pawn_roughness_metallic_ao.png";
/// Split-sum DFG lookup table: 64×64 texels, two half-float channels.
pub const DFG_TABLE: &str = "models/dfg.raw";

pub const DFG_RESOLUTION: u32 = 64;
pub const DFG_TABLE_BYTES: usize = (DFG_RESOLUTION * DFG_RESOLUTION) as usize * 2 * 2;

/// Every path surface setup reads.
pub const REQUIRED: &[&str] = &[
    POINT_CLOUD_VERT,
    POINT_CLOUD_FRAG,
    PLANE_VERT,
    PLANE_FRAG,
    BACKGROUND_CAMERA_VERT,
    BACKGROUND_CAMERA_FRAG,
    BACKGROUND_DEPTH_VERT,
    BACKGROUND_DEPTH_FRAG,
    OCCLUSION_VERT,
    OCCLUSION_FRAG,
    CUBEMAP_FILTER_VERT,
    CUBEMAP_FILTER_FRAG,
    ENVIRONMENTAL_HDR_VERT,
    ENVIRONMENTAL_HDR_FRAG,
    DEPTH_PALETTE_TEXTURE,
    PLANE_GRID_TEXTURE,
    PAWN_MESH,
    PAWN_ALBEDO_TEXTURE,
    PAWN_PBR_TEXTURE,
    DFG_TABLE,
];

/// A read-only store of asset files addressed by relative path.
pub trait AssetSource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Assets laid out under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Paths from [`REQUIRED`] that are missing under the root.
    pub fn missing(&self) -> Vec<&'static str> {
        REQUIRED
            .iter()
            .copied()
            .filter(|p| !self.root.join(p).is_file())
            .collect()
    }
}

impl AssetSource for DirAssets {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }
}

/// Assets held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }
}

impl AssetSource for MemoryAssets {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_owned()))
    }
}

/// Read a required asset, naming it in the error.
pub fn read(assets: &dyn AssetSource, path: &str) -> Result<Vec<u8>> {
    assets.read(path).map_err(|source| Error::Asset {
        path: path.to_owned(),
        source,
    })
}

pub fn read_to_string(assets: &dyn AssetSource, path: &str) -> Result<String> {
    String::from_utf8(read(assets, path)?).map_err(|e| Error::InvalidAsset {
        path: path.to_owned(),
        reason: e.to_string(),
    })
}

/// Build a shader source from a vertex/fragment pair.
pub fn shader_source(
    assets: &dyn AssetSource,
    vertex: &str,
    fragment: &str,
    defines: &[(&str, String)],
    state: PipelineState,
) -> Result<ShaderSource> {
    Ok(ShaderSource {
        vertex: read_to_string(assets, vertex)?,
        fragment: read_to_string(assets, fragment)?,
        defines: defines
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect(),
        state,
    })
}

/// Read the DFG table and check its size.
pub fn read_dfg_table(assets: &dyn AssetSource) -> Result<Vec<u8>> {
    let bytes = read(assets, DFG_TABLE)?;
    if bytes.len() != DFG_TABLE_BYTES {
        return Err(Error::InvalidAsset {
            path: DFG_TABLE.to_owned(),
            reason: format!("expected {DFG_TABLE_BYTES} bytes, found {}", bytes.len()),
        });
    }
    Ok(bytes)
}
