//! Specular prefilter of the environment cubemap.
//!
//! Every mip level of the filtered cubemap approximates the reflected radiance
//! for one roughness value. The per-level GGX importance-sample tables are
//! computed once on the CPU; each update only re-runs the GPU passes.

use crate::{
    assets::{self, AssetSource},
    gpu::{
        DrawTarget, GpuBackend, MeshId, PipelineState, PrimitiveMode, ShaderId, TexelFormat,
        TextureDesc, TextureId, TextureTarget, TextureUpload, UniformValue, WrapMode,
    },
    tracking::CubemapImage,
    Error, Result,
};
use glam::{Vec2, Vec3};
use rayon::prelude::*;
use std::f32::consts::PI;

/// One precomputed sample of a mip level's filter kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportanceSample {
    /// Sample direction in tangent space, +Z being the lookup normal.
    pub direction: Vec3,
    /// Normalized weight; the contributions of a level sum to one.
    pub contribution: f32,
    /// Source mip level to read the radiance from.
    pub level: f32,
}

#[inline]
fn log4(x: f32) -> f32 {
    x.log2() * 0.5
}

/// Point `i` of an `n`-point Hammersley set, `inv_n = 1 / n`.
fn hammersley(i: u32, inv_n: f32) -> Vec2 {
    let radical_inverse = i.reverse_bits() as f32 * (1.0 / 4_294_967_296.0);
    Vec2::new(i as f32 * inv_n, radical_inverse)
}

/// GGX-distributed half vector for roughness `a`.
fn hemisphere_importance_sample_dggx(u: Vec2, a: f32) -> Vec3 {
    let phi = 2.0 * PI * u.x;
    let cos_theta2 = (1.0 - u.y) / (1.0 + (a + 1.0) * ((a - 1.0) * u.y));
    let cos_theta = cos_theta2.sqrt();
    let sin_theta = (1.0 - cos_theta2).max(0.0).sqrt();
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

fn distribution_ggx(noh: f32, a: f32) -> f32 {
    let f = (a - 1.0) * ((a + 1.0) * (noh * noh)) + 1.0;
    (a * a) / (PI * f * f)
}

/// Kernel of mip `level` for a cubemap of `resolution` with `levels` mips.
pub fn importance_samples(
    level: u32,
    levels: u32,
    resolution: u32,
    samples: u32,
) -> Vec<ImportanceSample> {
    if level == 0 {
        return vec![ImportanceSample {
            direction: Vec3::Z,
            contribution: 1.0,
            level: 0.0,
        }];
    }

    let max_level = (levels - 1) as f32;
    let perceptual_roughness = level as f32 / max_level;
    let roughness = perceptual_roughness * perceptual_roughness;
    let level_resolution = (resolution >> level).max(1) as f32;
    // Solid angle of one texel at this level.
    let log4_omega_p = log4((4.0 * PI) / (6.0 * level_resolution * level_resolution));
    let inv_n = 1.0 / samples as f32;

    let mut kernel = Vec::with_capacity(samples as usize);
    let mut weight = 0.0;
    for i in 0..samples {
        let h = hemisphere_importance_sample_dggx(hammersley(i, inv_n), roughness);
        let noh = h.z;
        let nol = 2.0 * noh * noh - 1.0;
        if nol <= 0.0 {
            continue;
        }
        let pdf = distribution_ggx(noh, roughness) / 4.0;
        let log4_omega_s = log4(1.0 / (samples as f32 * pdf));
        // log4(K) with K = 4 lets neighbouring samples overlap a little.
        let l = log4_omega_s - log4_omega_p + 1.0;
        kernel.push(ImportanceSample {
            direction: Vec3::new(2.0 * noh * h.x, 2.0 * noh * h.y, nol),
            contribution: nol,
            level: l.clamp(0.0, max_level),
        });
        weight += nol;
    }
    for sample in &mut kernel {
        sample.contribution /= weight;
    }
    kernel
}

pub struct SpecularCubemapFilter {
    resolution: u32,
    levels: u32,
    kernels: Vec<Vec<ImportanceSample>>,
    radiance_cubemap: TextureId,
    filtered_cubemap: TextureId,
    quad: MeshId,
    /// One program per mip level; the kernel size is baked in as a define.
    shaders: Vec<ShaderId>,
}

impl SpecularCubemapFilter {
    pub fn new(
        gpu: &mut dyn GpuBackend,
        assets: &dyn AssetSource,
        resolution: u32,
        samples: u32,
    ) -> Result<Self> {
        let resolution = if resolution.is_power_of_two() {
            resolution
        } else {
            let rounded = resolution.max(1).checked_next_power_of_two().ok_or_else(|| {
                Error::Config(format!("cubemap resolution {resolution} is too large"))
            })?;
            log::warn!("Cubemap resolution {resolution} is not a power of two, using {rounded}");
            rounded
        };
        let levels = resolution.trailing_zeros() + 1;
        let samples = samples.max(1);

        let kernels: Vec<Vec<ImportanceSample>> = (0..levels)
            .into_par_iter()
            .map(|level| importance_samples(level, levels, resolution, samples))
            .collect();

        let radiance_cubemap = gpu.create_texture(
            "Radiance Cubemap",
            TextureDesc::new(TextureTarget::CubeMap, WrapMode::ClampToEdge, true),
        )?;
        let filtered_cubemap = gpu.create_texture(
            "Filtered Cubemap",
            TextureDesc::new(TextureTarget::CubeMap, WrapMode::ClampToEdge, true),
        )?;

        let corners: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];
        let quad_vb = gpu.create_vertex_buffer(2)?;
        gpu.set_vertex_data(quad_vb, bytemuck::cast_slice(&corners))?;
        let quad = gpu.create_mesh(PrimitiveMode::TriangleStrip, None, &[quad_vb])?;

        let mut shaders = Vec::with_capacity(kernels.len());
        for (level, kernel) in kernels.iter().enumerate() {
            let source = assets::shader_source(
                assets,
                assets::CUBEMAP_FILTER_VERT,
                assets::CUBEMAP_FILTER_FRAG,
                &[
                    ("NUMBER_OF_IMPORTANCE_SAMPLES", kernel.len().to_string()),
                    ("NUMBER_OF_MIPMAP_LEVELS", levels.to_string()),
                ],
                PipelineState {
                    depth_test: false,
                    depth_write: false,
                    blend: None,
                },
            )?;
            let shader = gpu.create_shader(&format!("cubemap_filter_{level}"), &source)?;
            gpu.set_uniform(shader, "u_Cubemap", UniformValue::Texture(radiance_cubemap));
            gpu.set_uniform(
                shader,
                "u_ImportanceSampleDirections",
                UniformValue::Vec3Array(kernel.iter().map(|s| s.direction).collect()),
            );
            gpu.set_uniform(
                shader,
                "u_ImportanceSampleContributions",
                UniformValue::FloatArray(kernel.iter().map(|s| s.contribution).collect()),
            );
            gpu.set_uniform(
                shader,
                "u_ImportanceSampleLevels",
                UniformValue::FloatArray(kernel.iter().map(|s| s.level).collect()),
            );
            shaders.push(shader);
        }

        log::debug!(
            "Specular filter ready: {resolution}px, {levels} mips, {} samples per texel",
            samples
        );

        Ok(Self {
            resolution,
            levels,
            kernels,
            radiance_cubemap,
            filtered_cubemap,
            quad,
            shaders,
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn number_of_mipmap_levels(&self) -> u32 {
        self.levels
    }

    pub fn kernels(&self) -> &[Vec<ImportanceSample>] {
        &self.kernels
    }

    /// The texture shading samples from. Its contents are replaced in place.
    pub fn filtered_cubemap(&self) -> TextureId {
        self.filtered_cubemap
    }

    /// Upload the raw radiance faces and refilter every level and face.
    pub fn update(&mut self, gpu: &mut dyn GpuBackend, cubemap: &CubemapImage) -> Result<()> {
        for (face, data) in cubemap.faces.iter().enumerate() {
            gpu.upload_texture(
                self.radiance_cubemap,
                &TextureUpload {
                    width: cubemap.resolution,
                    height: cubemap.resolution,
                    format: TexelFormat::Rgba16F,
                    level: 0,
                    face: Some(face as u32),
                    data,
                },
            )?;
        }

        for (level, shader) in self.shaders.iter().enumerate() {
            for face in 0..6 {
                gpu.set_uniform(*shader, "u_Face", UniformValue::Int(face as i32));
                gpu.draw(
                    self.quad,
                    *shader,
                    DrawTarget::CubemapFace {
                        texture: self.filtered_cubemap,
                        face,
                        level: level as u32,
                    },
                );
            }
        }
        Ok(())
    }
}
