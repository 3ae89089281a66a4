//! Shading parameters reconstructed from the session's light estimate.

pub mod harmonics;
pub mod specular;

pub use self::specular::{ImportanceSample, SpecularCubemapFilter};

use crate::{
    gpu::{GpuBackend, ShaderId, UniformValue},
    tracking::LightEstimate,
    Result,
};
use glam::{Mat4, Vec3, Vec4};

/// Lighting inputs of the virtual-object shader for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefilteredLighting {
    pub view_inverse: Mat4,
    /// Main light direction in view space, `w = 0`.
    pub view_light_direction: Vec4,
    pub light_intensity: Vec3,
    pub spherical_harmonics: [f32; 27],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shading {
    /// No valid estimate: every lighting contribution is disabled.
    Unlit,
    Lit(PrefilteredLighting),
}

/// Derive the frame's shading from the light estimate and the view matrix.
/// Depends on nothing but its arguments.
pub fn prefilter(estimate: &LightEstimate, view: &Mat4) -> Shading {
    let LightEstimate::Valid(hdr) = estimate else {
        return Shading::Unlit;
    };
    Shading::Lit(PrefilteredLighting {
        view_inverse: view.inverse(),
        view_light_direction: *view * hdr.main_light_direction.extend(0.0),
        light_intensity: hdr.main_light_intensity,
        spherical_harmonics: harmonics::premultiply(&hdr.ambient_spherical_harmonics),
    })
}

/// Pushes per-frame lighting into the object shader and keeps the specular
/// filter's GPU texture current.
pub struct LightingEstimator {
    filter: SpecularCubemapFilter,
}

impl LightingEstimator {
    pub fn new(filter: SpecularCubemapFilter) -> Self {
        Self { filter }
    }

    /// Update `shader`'s lighting uniforms. An invalid estimate only flips
    /// `u_LightEstimateIsValid`; no harmonics or cubemap work happens.
    pub fn update(
        &mut self,
        gpu: &mut dyn GpuBackend,
        shader: ShaderId,
        estimate: &LightEstimate,
        view: &Mat4,
    ) -> Result<Shading> {
        let shading = prefilter(estimate, view);
        let (lit, hdr) = match (&shading, estimate) {
            (Shading::Lit(lit), LightEstimate::Valid(hdr)) => (lit, hdr),
            _ => {
                gpu.set_uniform(shader, "u_LightEstimateIsValid", UniformValue::Bool(false));
                return Ok(shading);
            }
        };

        gpu.set_uniform(shader, "u_LightEstimateIsValid", UniformValue::Bool(true));
        gpu.set_uniform(shader, "u_ViewInverse", UniformValue::Mat4(lit.view_inverse));
        gpu.set_uniform(
            shader,
            "u_ViewLightDirection",
            UniformValue::Vec4(lit.view_light_direction),
        );
        gpu.set_uniform(shader, "u_LightIntensity", UniformValue::Vec3(lit.light_intensity));
        gpu.set_uniform(
            shader,
            "u_SphericalHarmonicsCoefficients",
            UniformValue::Vec3Array(harmonics::as_vec3s(&lit.spherical_harmonics)),
        );
        self.filter.update(gpu, &hdr.cubemap)?;
        Ok(shading)
    }
}
