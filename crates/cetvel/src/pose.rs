//! Rigid transforms as reported by the tracking session.

use glam::{Mat4, Quat, Vec3};

/// A rigid transform from a local frame into world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    /// Column-major model matrix of this pose.
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    #[inline]
    pub fn rotate_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// World-space direction of local axis `axis` (0 = X, 1 = Y, 2 = Z), scaled.
    pub fn transformed_axis(&self, axis: usize, scale: f32) -> Vec3 {
        let local = match axis {
            0 => Vec3::X,
            1 => Vec3::Y,
            _ => Vec3::Z,
        };
        self.rotate_vector(local) * scale
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: rotation * -self.translation,
            rotation,
        }
    }

    /// Euclidean distance between the translation components of two poses.
    #[inline]
    pub fn distance(&self, other: &Pose) -> f32 {
        (self.translation - other.translation).length()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = Pose::new(Vec3::new(1.0, -2.0, 0.5), Quat::from_rotation_y(0.3));
        let b = Pose::from_translation(Vec3::new(-4.0, 2.0, 3.0));

        assert_eq!(a.distance(&b), b.distance(&a));
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn distance_ignores_rotation() {
        let a = Pose::from_translation(Vec3::ZERO);
        let b = Pose::new(Vec3::new(3.0, 4.0, 0.0), Quat::from_rotation_x(1.2));
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn inverse_undoes_transform() {
        let pose = Pose::new(Vec3::new(0.2, 1.5, -3.0), Quat::from_rotation_z(0.7));
        let p = Vec3::new(1.0, 2.0, 3.0);
        let back = pose.inverse().transform_point(pose.transform_point(p));
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn transformed_axis_follows_rotation() {
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let y = pose.transformed_axis(1, 2.0);
        assert!((y - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }
}
