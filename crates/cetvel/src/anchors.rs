//! User-placed markers and the distance between them.

use crate::{
    pose::Pose,
    tracking::{
        distance_to_plane, AnchorId, Frame, HitResult, OrientationMode, Tap, Trackable,
        TrackingSession, TrackingState,
    },
};
use std::fmt;

/// The two marker slots. At most one marker exists per name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerName {
    First,
    Second,
}

impl fmt::Display for MarkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarkerName::First => "first",
            MarkerName::Second => "second",
        })
    }
}

/// A named anchor and the trackable it was attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub anchor: AnchorId,
    pub trackable: Trackable,
    pub name: MarkerName,
}

/// Outcome of a successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub name: MarkerName,
    pub anchor: AnchorId,
    /// Anchor detached because it carried the same name.
    pub replaced: Option<AnchorId>,
}

/// Whether the hit is acceptable for placing a marker.
fn accepts(hit: &HitResult, camera_pose: &Pose) -> bool {
    match &hit.trackable {
        Trackable::Surface(plane) => {
            plane.is_pose_in_polygon(&hit.pose) && distance_to_plane(&hit.pose, camera_pose) > 0.0
        }
        Trackable::Point(point) => point.orientation_mode == OrientationMode::EstimatedSurfaceNormal,
        Trackable::DepthPoint(_) => true,
        Trackable::Other(_) => false,
    }
}

/// First acceptable hit in session order (nearest first).
pub fn select_hit<'a>(hits: &'a [HitResult], camera_pose: &Pose) -> Option<&'a HitResult> {
    hits.iter().find(|hit| accepts(hit, camera_pose))
}

/// Euclidean distance between two marker poses, in the session's length unit.
#[inline]
pub fn measure(a: &Pose, b: &Pose) -> f32 {
    a.distance(b)
}

/// Owns the marker list. Touched only from the render thread.
#[derive(Debug, Default)]
pub struct AnchorManager {
    markers: Vec<Marker>,
    distance: Option<f32>,
}

impl AnchorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Distance computed by the last [`AnchorManager::update_measurement`].
    pub fn distance(&self) -> Option<f32> {
        self.distance
    }

    /// Handle the frame's tap, if any.
    ///
    /// A tap that arrives while the camera is not tracking is consumed without
    /// effect. Otherwise the first qualifying hit replaces the marker carrying
    /// `selected`; without a selected name nothing is placed.
    pub fn handle_tap<S: TrackingSession + ?Sized>(
        &mut self,
        session: &mut S,
        frame: &Frame,
        tap: Option<Tap>,
        selected: Option<MarkerName>,
    ) -> Option<Placement> {
        let tap = tap?;
        if frame.camera.tracking_state != TrackingState::Tracking {
            log::debug!("Ignoring tap at ({}, {}): camera not tracking", tap.x, tap.y);
            return None;
        }

        let hits = session.hit_test(frame, tap);
        let Some(hit) = select_hit(&hits, &frame.camera.pose) else {
            log::debug!("Tap at ({}, {}) hit no acceptable trackable", tap.x, tap.y);
            return None;
        };
        let name = selected?;

        let replaced = self
            .markers
            .iter()
            .position(|m| m.name == name)
            .map(|idx| self.markers.remove(idx).anchor);
        if let Some(old) = replaced {
            session.detach_anchor(old);
        }

        let anchor = session.create_anchor(hit);
        self.markers.push(Marker {
            anchor,
            trackable: hit.trackable.clone(),
            name,
        });
        log::info!(
            "Placed {name} marker on trackable {} at ({:.3}, {:.3}, {:.3})",
            hit.trackable.id().0,
            hit.pose.translation.x,
            hit.pose.translation.y,
            hit.pose.translation.z
        );

        Some(Placement {
            name,
            anchor,
            replaced,
        })
    }

    /// Recompute the distance when exactly two markers exist, clear it otherwise.
    pub fn update_measurement<S: TrackingSession + ?Sized>(&mut self, session: &S) -> Option<f32> {
        self.distance = match self.markers.as_slice() {
            [a, b] => match (session.anchor(a.anchor), session.anchor(b.anchor)) {
                (Some(a), Some(b)) => Some(measure(&a.pose, &b.pose)),
                _ => None,
            },
            _ => None,
        };
        self.distance
    }

    /// Current poses of markers whose anchor is tracking.
    pub fn tracked_poses<S: TrackingSession + ?Sized>(&self, session: &S) -> Vec<Pose> {
        self.markers
            .iter()
            .filter_map(|m| session.anchor(m.anchor))
            .filter(|a| a.tracking_state == TrackingState::Tracking)
            .map(|a| a.pose)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{
        Camera, FeaturePoint, LightEstimate, Plane, PlaneType, PointCloud, ScriptedFrame,
        ScriptedSession, TrackableId, TrackingFailureReason,
    };
    use glam::{Vec2, Vec3};

    fn frame(state: TrackingState) -> Frame {
        let camera_pose = Pose::from_translation(Vec3::new(0.0, 1.5, 0.0));
        Frame {
            timestamp: 1,
            camera: Camera {
                pose: camera_pose,
                display_oriented_pose: camera_pose,
                fov_y: 1.0,
                aspect: 0.5,
                tracking_state: state,
                failure_reason: TrackingFailureReason::None,
            },
            light_estimate: LightEstimate::NotValid,
            point_cloud: PointCloud::default(),
            depth_image: None,
            display_geometry: None,
        }
    }

    fn floor() -> Plane {
        Plane {
            id: TrackableId(10),
            kind: PlaneType::HorizontalUpwardFacing,
            center_pose: Pose::IDENTITY,
            extent_x: 10.0,
            extent_z: 10.0,
            polygon: vec![
                Vec2::new(-5.0, -5.0),
                Vec2::new(5.0, -5.0),
                Vec2::new(5.0, 5.0),
                Vec2::new(-5.0, 5.0),
            ],
            tracking_state: TrackingState::Tracking,
            subsumed_by: None,
        }
    }

    fn surface_hit(at: Vec3) -> HitResult {
        HitResult {
            trackable: Trackable::Surface(floor()),
            pose: Pose::from_translation(at),
        }
    }

    fn depth_hit(at: Vec3) -> HitResult {
        HitResult {
            trackable: Trackable::DepthPoint(TrackableId(99)),
            pose: Pose::from_translation(at),
        }
    }

    fn session_with(hits: Vec<Vec<HitResult>>, state: TrackingState) -> ScriptedSession {
        ScriptedSession::new(hits.into_iter().map(|hits| ScriptedFrame {
            hits,
            ..ScriptedFrame::new(frame(state))
        }))
    }

    const TAP: Option<Tap> = Some(Tap { x: 10.0, y: 10.0 });

    #[test]
    fn selection_policy_per_trackable_kind() {
        let camera = Pose::from_translation(Vec3::new(0.0, 1.5, 0.0));
        let outside = surface_hit(Vec3::new(8.0, 0.0, 0.0));
        let unoriented = HitResult {
            trackable: Trackable::Point(FeaturePoint {
                id: TrackableId(2),
                orientation_mode: OrientationMode::Identity,
            }),
            pose: Pose::from_translation(Vec3::new(0.0, 0.0, -1.0)),
        };
        let other = HitResult {
            trackable: Trackable::Other(TrackableId(3)),
            pose: Pose::IDENTITY,
        };
        let oriented = HitResult {
            trackable: Trackable::Point(FeaturePoint {
                id: TrackableId(4),
                orientation_mode: OrientationMode::EstimatedSurfaceNormal,
            }),
            pose: Pose::from_translation(Vec3::new(0.0, 0.0, -2.0)),
        };
        let inside = surface_hit(Vec3::new(1.0, 0.0, 1.0));

        let hits = vec![outside, unoriented, other, oriented.clone(), inside];
        assert_eq!(select_hit(&hits, &camera), Some(&oriented));

        assert!(select_hit(&hits[..3], &camera).is_none());
        assert!(select_hit(&[depth_hit(Vec3::ZERO)], &camera).is_some());
    }

    #[test]
    fn surface_seen_from_behind_is_rejected() {
        let below = Pose::from_translation(Vec3::new(0.0, -2.0, 0.0));
        let hits = [surface_hit(Vec3::new(0.0, 0.0, 0.0))];
        assert!(select_hit(&hits, &below).is_none());
    }

    #[test]
    fn same_name_replaces_and_detaches_exactly_the_old_marker() {
        let mut session = session_with(
            vec![
                vec![surface_hit(Vec3::new(0.0, 0.0, 0.0))],
                vec![surface_hit(Vec3::new(1.0, 0.0, 0.0))],
            ],
            TrackingState::Tracking,
        );
        let mut anchors = AnchorManager::new();

        let f = session.update().unwrap();
        let first = anchors
            .handle_tap(&mut session, &f, TAP, Some(MarkerName::First))
            .unwrap();
        assert_eq!(first.replaced, None);

        let f = session.update().unwrap();
        let again = anchors
            .handle_tap(&mut session, &f, TAP, Some(MarkerName::First))
            .unwrap();
        assert_eq!(again.replaced, Some(first.anchor));
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors.markers()[0].name, MarkerName::First);
        assert_eq!(session.live_anchors(), 1);
        assert!(session.anchor(first.anchor).is_none());
    }

    #[test]
    fn never_more_than_two_markers() {
        let names = [
            MarkerName::First,
            MarkerName::Second,
            MarkerName::Second,
            MarkerName::First,
            MarkerName::Second,
        ];
        let mut session = session_with(
            (0..names.len())
                .map(|i| vec![depth_hit(Vec3::new(i as f32, 0.0, 0.0))])
                .collect(),
            TrackingState::Tracking,
        );
        let mut anchors = AnchorManager::new();
        for name in names {
            let f = session.update().unwrap();
            anchors.handle_tap(&mut session, &f, TAP, Some(name));
            assert!(anchors.len() <= 2);
        }
        assert_eq!(anchors.len(), 2);
        assert_eq!(session.live_anchors(), 2);
    }

    #[test]
    fn paused_tap_never_places() {
        let mut session = session_with(
            vec![vec![depth_hit(Vec3::ZERO)]],
            TrackingState::Paused,
        );
        let mut anchors = AnchorManager::new();
        let f = session.update().unwrap();
        assert!(anchors
            .handle_tap(&mut session, &f, TAP, Some(MarkerName::First))
            .is_none());
        assert!(anchors.is_empty());
        assert_eq!(session.live_anchors(), 0);
    }

    #[test]
    fn no_selected_name_places_nothing() {
        let mut session = session_with(vec![vec![depth_hit(Vec3::ZERO)]], TrackingState::Tracking);
        let mut anchors = AnchorManager::new();
        let f = session.update().unwrap();
        assert!(anchors.handle_tap(&mut session, &f, TAP, None).is_none());
        assert_eq!(session.live_anchors(), 0);
    }

    #[test]
    fn distance_only_with_two_markers() {
        let mut session = session_with(
            vec![
                vec![depth_hit(Vec3::new(0.0, 0.0, 0.0))],
                vec![depth_hit(Vec3::new(3.0, 4.0, 0.0))],
            ],
            TrackingState::Tracking,
        );
        let mut anchors = AnchorManager::new();

        let f = session.update().unwrap();
        anchors.handle_tap(&mut session, &f, TAP, Some(MarkerName::First));
        assert_eq!(anchors.update_measurement(&session), None);

        let f = session.update().unwrap();
        anchors.handle_tap(&mut session, &f, TAP, Some(MarkerName::Second));
        let d = anchors.update_measurement(&session).unwrap();
        assert!((d - 5.0).abs() < 1e-6);
        assert_eq!(anchors.distance(), Some(d));
        assert_eq!(anchors.tracked_poses(&session).len(), 2);
    }

    #[test]
    fn measure_is_symmetric() {
        let a = Pose::from_translation(Vec3::new(0.3, -1.0, 2.0));
        let b = Pose::from_translation(Vec3::new(-0.7, 4.0, 0.5));
        assert_eq!(measure(&a, &b), measure(&b, &a));
        assert_eq!(measure(&a, &a), 0.0);
    }
}
