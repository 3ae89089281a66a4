//! The single status line shown over the camera view.

use crate::{
    settings::UnitSettings,
    tracking::{Camera, TrackingFailureReason, TrackingState},
};
use std::fmt;

pub const SEARCHING_FOR_SURFACES: &str = "Searching for surfaces...";
pub const WAITING_FOR_TAPS: &str = "Tap on a surface to place a marker.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusMessage {
    /// Distance between the two markers, in meters.
    Distance(f32),
    SearchingForSurfaces,
    TrackingFailure(TrackingFailureReason),
    WaitingForTaps,
}

/// Pick the status for this frame. First match wins: a measured distance,
/// then paused tracking (searching when there is no reason, the reason
/// otherwise), then the placement prompt once a surface is tracked.
pub fn derive_status(
    distance: Option<f32>,
    camera: &Camera,
    has_tracking_plane: bool,
    marker_count: usize,
) -> Option<StatusMessage> {
    if let Some(d) = distance {
        return Some(StatusMessage::Distance(d));
    }
    if camera.tracking_state == TrackingState::Paused {
        return Some(match camera.failure_reason {
            TrackingFailureReason::None => StatusMessage::SearchingForSurfaces,
            reason => StatusMessage::TrackingFailure(reason),
        });
    }
    if has_tracking_plane && marker_count == 0 {
        return Some(StatusMessage::WaitingForTaps);
    }
    None
}

impl StatusMessage {
    pub fn render(&self, units: &UnitSettings) -> String {
        match self {
            StatusMessage::Distance(meters) => {
                format!("DISTANCE: {}", units.format_distance(*meters))
            }
            StatusMessage::SearchingForSurfaces => SEARCHING_FOR_SURFACES.to_owned(),
            StatusMessage::TrackingFailure(reason) => reason.message().to_owned(),
            StatusMessage::WaitingForTaps => WAITING_FOR_TAPS.to_owned(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&UnitSettings::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pose::Pose, settings::Unit};

    fn camera(state: TrackingState, reason: TrackingFailureReason) -> Camera {
        Camera {
            pose: Pose::IDENTITY,
            display_oriented_pose: Pose::IDENTITY,
            fov_y: 1.0,
            aspect: 0.5,
            tracking_state: state,
            failure_reason: reason,
        }
    }

    #[test]
    fn distance_wins_over_everything() {
        let cam = camera(TrackingState::Paused, TrackingFailureReason::InsufficientLight);
        assert_eq!(
            derive_status(Some(5.0), &cam, true, 2),
            Some(StatusMessage::Distance(5.0))
        );
    }

    #[test]
    fn paused_without_reason_is_searching() {
        let cam = camera(TrackingState::Paused, TrackingFailureReason::None);
        let status = derive_status(None, &cam, true, 0).unwrap();
        assert_eq!(status, StatusMessage::SearchingForSurfaces);
        assert_eq!(status.to_string(), SEARCHING_FOR_SURFACES);
    }

    #[test]
    fn paused_with_reason_shows_it() {
        let cam = camera(TrackingState::Paused, TrackingFailureReason::ExcessiveMotion);
        let status = derive_status(None, &cam, false, 0).unwrap();
        assert_eq!(status.to_string(), "Moving too fast. Slow down.");
    }

    #[test]
    fn prompt_only_before_the_first_marker() {
        let cam = camera(TrackingState::Tracking, TrackingFailureReason::None);
        assert_eq!(
            derive_status(None, &cam, true, 0),
            Some(StatusMessage::WaitingForTaps)
        );
        assert_eq!(derive_status(None, &cam, true, 1), None);
        assert_eq!(derive_status(None, &cam, false, 0), None);
    }

    #[test]
    fn stopped_tracking_has_no_message() {
        let cam = camera(TrackingState::Stopped, TrackingFailureReason::BadState);
        assert_eq!(derive_status(None, &cam, true, 0), None);
    }

    #[test]
    fn distance_renders_in_the_chosen_unit() {
        let status = StatusMessage::Distance(5.0);
        assert_eq!(status.to_string(), "DISTANCE: 5.0000m");
        let mut units = UnitSettings::default();
        units.select(Unit::Imperial);
        assert_eq!(status.render(&units), "DISTANCE: 16.4042ft");
    }
}
