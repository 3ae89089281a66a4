//! Types consumed from the tracking session.
//!
//! Everything here is produced externally; the core only reads it. A
//! [`Frame`] lives for exactly one tick.

mod plane;
mod scripted;

pub use self::plane::{distance_to_plane, Plane, PlaneType};
pub use self::scripted::{ScriptedFrame, ScriptedSession};

use crate::{gpu::TextureId, pose::Pose, Error, Result};
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingState {
    Tracking,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingFailureReason {
    None,
    BadState,
    InsufficientLight,
    ExcessiveMotion,
    InsufficientFeatures,
    CameraUnavailable,
}

impl TrackingFailureReason {
    /// User-facing explanation of why tracking is paused.
    pub fn message(self) -> &'static str {
        match self {
            TrackingFailureReason::None => "",
            TrackingFailureReason::BadState => {
                "Tracking lost due to bad internal state. Please try restarting the AR experience."
            }
            TrackingFailureReason::InsufficientLight => "Too dark. Try moving to a well-lit area.",
            TrackingFailureReason::ExcessiveMotion => "Moving too fast. Slow down.",
            TrackingFailureReason::InsufficientFeatures => {
                "Can't find anything. Aim device at a surface with more texture or color."
            }
            TrackingFailureReason::CameraUnavailable => {
                "Another app is using the camera. Tap on this app or try closing the other one."
            }
        }
    }
}

/// Screen rotation relative to the device's natural orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

/// Camera state of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Physical camera pose in world space.
    pub pose: Pose,
    /// Pose rotated to match the current display orientation.
    pub display_oriented_pose: Pose,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub tracking_state: TrackingState,
    pub failure_reason: TrackingFailureReason,
}

impl Camera {
    /// World-to-view transform.
    pub fn view_matrix(&self) -> Mat4 {
        self.display_oriented_pose.to_matrix().inverse()
    }

    /// GL-convention projection (clip z in `[-1, 1]`).
    pub fn projection_matrix(&self, z_near: f32, z_far: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, z_near, z_far)
    }
}

/// Raw environment cubemap: six square RGBA16F faces in `+X, -X, +Y, -Y, +Z, -Z` order.
#[derive(Debug, Clone, PartialEq)]
pub struct CubemapImage {
    pub resolution: u32,
    pub faces: [Vec<u8>; 6],
}

impl CubemapImage {
    /// Bytes of one face, `None` if that does not fit in memory.
    pub fn face_bytes(resolution: u32) -> Option<usize> {
        let side = usize::try_from(resolution).ok()?;
        side.checked_mul(side)?.checked_mul(8)
    }

    /// A black cubemap, handy when the session provides no radiance data.
    pub fn black(resolution: u32) -> Option<Self> {
        let bytes = Self::face_bytes(resolution)?;
        Some(Self {
            resolution,
            faces: std::array::from_fn(|_| vec![0; bytes]),
        })
    }
}

/// Environmental HDR light estimate of a valid frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentalHdr {
    /// World-space direction the main light travels.
    pub main_light_direction: Vec3,
    /// Linear RGB intensity of the main light.
    pub main_light_intensity: Vec3,
    /// 9 spherical-harmonics basis coefficients, RGB interleaved.
    pub ambient_spherical_harmonics: [f32; 27],
    pub cubemap: CubemapImage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightEstimate {
    NotValid,
    Valid(EnvironmentalHdr),
}

/// Feature point as uploaded to the GPU: position and confidence.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    /// Nanosecond timestamp of the observation the cloud was built from.
    pub timestamp: i64,
    pub points: Vec<PointVertex>,
}

/// Depth in millimeters, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Zero until the camera produced its first image.
    pub timestamp: i64,
    pub camera: Camera,
    pub light_estimate: LightEstimate,
    pub point_cloud: PointCloud,
    pub depth_image: Option<DepthImage>,
    /// Camera texture coordinates for the background quad's four corners,
    /// present only on frames where the display geometry changed.
    pub display_geometry: Option<[f32; 8]>,
}

impl Frame {
    pub fn acquire_depth_image(&self) -> Result<&DepthImage> {
        self.depth_image.as_ref().ok_or(Error::DepthNotYetAvailable)
    }
}

/// Screen-space tap in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackableId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationMode {
    /// Orientation is the identity; no surface normal is known.
    Identity,
    EstimatedSurfaceNormal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePoint {
    pub id: TrackableId,
    pub orientation_mode: OrientationMode,
}

/// Anything a hit test can land on.
#[derive(Debug, Clone, PartialEq)]
pub enum Trackable {
    Surface(Plane),
    Point(FeaturePoint),
    DepthPoint(TrackableId),
    Other(TrackableId),
}

impl Trackable {
    pub fn id(&self) -> TrackableId {
        match self {
            Trackable::Surface(plane) => plane.id,
            Trackable::Point(point) => point.id,
            Trackable::DepthPoint(id) | Trackable::Other(id) => *id,
        }
    }
}

/// One intersection of a hit-test ray. Every hit carries its trackable.
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub trackable: Trackable,
    pub pose: Pose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub u64);

/// Current state of an anchor as refined by the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorSnapshot {
    pub pose: Pose,
    pub tracking_state: TrackingState,
}

/// The external pose-tracking subsystem.
pub trait TrackingSession {
    /// Register the texture the camera image is streamed into.
    fn set_camera_texture(&mut self, texture: TextureId);

    fn set_display_geometry(&mut self, rotation: DisplayRotation, width: u32, height: u32);

    /// Next frame. Blocks until the camera delivers one.
    fn update(&mut self) -> Result<Frame>;

    /// Intersections of the tap ray, nearest first.
    fn hit_test(&self, frame: &Frame, tap: Tap) -> Vec<HitResult>;

    /// All surfaces detected so far, in any tracking state.
    fn planes(&self) -> Vec<Plane>;

    fn create_anchor(&mut self, hit: &HitResult) -> AnchorId;

    fn detach_anchor(&mut self, anchor: AnchorId);

    /// `None` once the anchor has been detached.
    fn anchor(&self, anchor: AnchorId) -> Option<AnchorSnapshot>;

    fn is_depth_supported(&self) -> bool;
}
