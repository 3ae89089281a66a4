//! Ambient spherical-harmonics pre-multiplication.

use glam::Vec3;

/// Per-basis-function factor applied to the raw coefficients before they reach
/// the shader. Each entry folds together the normalized SH basis `Y_lm`, the
/// Lambertian `1/π` BRDF term and the clamped-cosine convolution, so the
/// shader evaluates irradiance directly.
pub const SPHERICAL_HARMONIC_FACTORS: [f32; 9] = [
    0.282095, -0.325735, 0.325735, -0.325735, 0.273137, -0.273137, 0.078848, -0.273137, 0.136569,
];

/// Multiply each RGB coefficient triple by the factor of its basis function.
pub fn premultiply(coefficients: &[f32; 27]) -> [f32; 27] {
    std::array::from_fn(|i| coefficients[i] * SPHERICAL_HARMONIC_FACTORS[i / 3])
}

/// Regroup 27 interleaved floats into 9 RGB triples for a `vec3[9]` uniform.
pub fn as_vec3s(coefficients: &[f32; 27]) -> Vec<Vec3> {
    coefficients
        .chunks_exact(3)
        .map(Vec3::from_slice)
        .collect()
}
