use super::{TrackableId, TrackingState};
use crate::pose::Pose;
use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneType {
    HorizontalUpwardFacing,
    HorizontalDownwardFacing,
    Vertical,
}

/// A detected planar surface. The plane's local +Y axis is its normal and the
/// boundary polygon lies in its local XZ plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub id: TrackableId,
    pub kind: PlaneType,
    pub center_pose: Pose,
    pub extent_x: f32,
    pub extent_z: f32,
    /// Boundary vertices `(x, z)` in plane space, counter-clockwise.
    pub polygon: Vec<Vec2>,
    pub tracking_state: TrackingState,
    /// Set once this plane was merged into another one.
    pub subsumed_by: Option<TrackableId>,
}

impl Plane {
    /// Whether `pose` projects inside the boundary polygon.
    pub fn is_pose_in_polygon(&self, pose: &Pose) -> bool {
        let local = self.center_pose.inverse().transform_point(pose.translation);
        point_in_polygon(Vec2::new(local.x, local.z), &self.polygon)
    }

    /// World-space normal.
    pub fn normal(&self) -> Vec3 {
        self.center_pose.transformed_axis(1, 1.0)
    }
}

/// Signed distance from `plane_pose` to the camera along the plane's normal.
/// Positive when the camera is on the side the normal points to.
pub fn distance_to_plane(plane_pose: &Pose, camera_pose: &Pose) -> f32 {
    let normal = plane_pose.transformed_axis(1, 1.0);
    (camera_pose.translation - plane_pose.translation).dot(normal)
}

/// Even-odd crossing test.
fn point_in_polygon(p: Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn floor(center: Vec3) -> Plane {
        Plane {
            id: TrackableId(1),
            kind: PlaneType::HorizontalUpwardFacing,
            center_pose: Pose::from_translation(center),
            extent_x: 2.0,
            extent_z: 2.0,
            polygon: vec![
                Vec2::new(-1.0, -1.0),
                Vec2::new(1.0, -1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(-1.0, 1.0),
            ],
            tracking_state: TrackingState::Tracking,
            subsumed_by: None,
        }
    }

    #[test]
    fn polygon_containment_in_plane_space() {
        let plane = floor(Vec3::new(5.0, -1.0, 0.0));
        assert!(plane.is_pose_in_polygon(&Pose::from_translation(Vec3::new(5.5, -1.0, 0.5))));
        // Height above the plane does not matter, only the XZ footprint.
        assert!(plane.is_pose_in_polygon(&Pose::from_translation(Vec3::new(4.2, 3.0, -0.9))));
        assert!(!plane.is_pose_in_polygon(&Pose::from_translation(Vec3::new(6.5, -1.0, 0.0))));
    }

    #[test]
    fn rotated_plane_polygon() {
        let mut plane = floor(Vec3::ZERO);
        plane.center_pose.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        // (1.3, 0) lies outside the unrotated square but inside the diamond.
        assert!(plane.is_pose_in_polygon(&Pose::from_translation(Vec3::new(1.3, 0.0, 0.0))));
        assert!(!plane.is_pose_in_polygon(&Pose::from_translation(Vec3::new(0.9, 0.0, 0.9))));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let mut plane = floor(Vec3::ZERO);
        plane.polygon.truncate(2);
        assert!(!plane.is_pose_in_polygon(&Pose::IDENTITY));
    }

    #[test]
    fn camera_above_floor_is_in_front() {
        let hit = Pose::from_translation(Vec3::new(0.0, -1.0, -2.0));
        let above = Pose::from_translation(Vec3::new(0.0, 0.5, 0.0));
        let below = Pose::from_translation(Vec3::new(0.0, -1.5, 0.0));
        assert!(distance_to_plane(&hit, &above) > 0.0);
        assert!(distance_to_plane(&hit, &below) < 0.0);
        assert!((distance_to_plane(&hit, &above) - 1.5).abs() < 1e-6);
    }
}
