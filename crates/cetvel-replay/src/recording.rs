//! JSON recordings of a tracking session.

use anyhow::{bail, Context, Result};
use cetvel::{
    anchors::MarkerName,
    tracking::{
        Camera, CubemapImage, DepthImage, EnvironmentalHdr, FeaturePoint, Frame, HitResult,
        LightEstimate, OrientationMode, Plane, PlaneType, PointCloud, PointVertex, ScriptedFrame,
        Tap, Trackable, TrackableId, TrackingFailureReason, TrackingState,
    },
    Pose,
};
use glam::{Quat, Vec2, Vec3};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

#[derive(Debug, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub depth_supported: bool,
    pub frames: Vec<RecordedFrame>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedState {
    Tracking,
    Paused,
    Stopped,
}

impl From<RecordedState> for TrackingState {
    fn from(state: RecordedState) -> Self {
        match state {
            RecordedState::Tracking => Self::Tracking,
            RecordedState::Paused => Self::Paused,
            RecordedState::Stopped => Self::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedFailure {
    #[default]
    None,
    BadState,
    InsufficientLight,
    ExcessiveMotion,
    InsufficientFeatures,
    CameraUnavailable,
}

impl From<RecordedFailure> for TrackingFailureReason {
    fn from(reason: RecordedFailure) -> Self {
        match reason {
            RecordedFailure::None => Self::None,
            RecordedFailure::BadState => Self::BadState,
            RecordedFailure::InsufficientLight => Self::InsufficientLight,
            RecordedFailure::ExcessiveMotion => Self::ExcessiveMotion,
            RecordedFailure::InsufficientFeatures => Self::InsufficientFeatures,
            RecordedFailure::CameraUnavailable => Self::CameraUnavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedMarker {
    First,
    Second,
}

impl From<RecordedMarker> for MarkerName {
    fn from(marker: RecordedMarker) -> Self {
        match marker {
            RecordedMarker::First => Self::First,
            RecordedMarker::Second => Self::Second,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RecordedPose {
    pub position: [f32; 3],
    /// Quaternion `[x, y, z, w]`.
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl From<RecordedPose> for Pose {
    fn from(pose: RecordedPose) -> Self {
        Pose::new(
            Vec3::from_array(pose.position),
            Quat::from_array(pose.rotation).normalize(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordedCamera {
    pub pose: RecordedPose,
    /// Defaults to `pose`.
    pub display_oriented_pose: Option<RecordedPose>,
    pub fov_y: f32,
    pub aspect: f32,
    pub tracking_state: RecordedState,
    #[serde(default)]
    pub failure_reason: RecordedFailure,
}

#[derive(Debug, Deserialize)]
pub struct RecordedLight {
    pub direction: [f32; 3],
    pub intensity: [f32; 3],
    pub spherical_harmonics: Vec<f32>,
    #[serde(default = "default_cubemap_resolution")]
    pub cubemap_resolution: u32,
}

fn default_cubemap_resolution() -> u32 {
    16
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedPlaneKind {
    HorizontalUpwardFacing,
    HorizontalDownwardFacing,
    Vertical,
}

impl From<RecordedPlaneKind> for PlaneType {
    fn from(kind: RecordedPlaneKind) -> Self {
        match kind {
            RecordedPlaneKind::HorizontalUpwardFacing => Self::HorizontalUpwardFacing,
            RecordedPlaneKind::HorizontalDownwardFacing => Self::HorizontalDownwardFacing,
            RecordedPlaneKind::Vertical => Self::Vertical,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordedPlane {
    pub id: u64,
    pub kind: RecordedPlaneKind,
    pub center: RecordedPose,
    pub extent_x: f32,
    pub extent_z: f32,
    pub polygon: Vec<[f32; 2]>,
    pub tracking_state: RecordedState,
    pub subsumed_by: Option<u64>,
}

impl From<&RecordedPlane> for Plane {
    fn from(plane: &RecordedPlane) -> Self {
        Plane {
            id: TrackableId(plane.id),
            kind: plane.kind.into(),
            center_pose: plane.center.into(),
            extent_x: plane.extent_x,
            extent_z: plane.extent_z,
            polygon: plane.polygon.iter().map(|p| Vec2::from_array(*p)).collect(),
            tracking_state: plane.tracking_state.into(),
            subsumed_by: plane.subsumed_by.map(TrackableId),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedTrackable {
    /// Refers to a plane of the current plane set by id.
    Plane { id: u64 },
    Point {
        id: u64,
        #[serde(default)]
        estimated_surface_normal: bool,
    },
    DepthPoint { id: u64 },
    Other { id: u64 },
}

#[derive(Debug, Deserialize)]
pub struct RecordedHit {
    pub trackable: RecordedTrackable,
    pub pose: RecordedPose,
}

#[derive(Debug, Deserialize)]
pub struct RecordedDepth {
    pub width: u32,
    pub height: u32,
    /// Millimeters, row-major.
    pub data: Vec<u16>,
}

#[derive(Debug, Deserialize)]
pub struct RecordedFrame {
    pub timestamp: i64,
    pub camera: RecordedCamera,
    pub light: Option<RecordedLight>,
    /// `[x, y, z, confidence]` per point.
    #[serde(default)]
    pub points: Vec<[f32; 4]>,
    /// Defaults to the frame timestamp.
    pub point_cloud_timestamp: Option<i64>,
    pub depth: Option<RecordedDepth>,
    pub display_geometry: Option<[f32; 8]>,
    /// Replaces the session's plane set when present.
    pub planes: Option<Vec<RecordedPlane>>,
    #[serde(default)]
    pub hits: Vec<RecordedHit>,
    pub tap: Option<[f32; 2]>,
    pub select: Option<RecordedMarker>,
}

/// User input that goes with one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub tap: Option<Tap>,
    pub select: Option<MarkerName>,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("reading recording {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing recording {}", path.display()))
    }

    /// Split into the session script and the per-frame user input.
    pub fn into_script(self) -> Result<(Vec<ScriptedFrame>, Vec<FrameInput>)> {
        let mut planes: HashMap<u64, Plane> = HashMap::new();
        let mut script = Vec::with_capacity(self.frames.len());
        let mut inputs = Vec::with_capacity(self.frames.len());

        for (index, recorded) in self.frames.into_iter().enumerate() {
            let plane_set = recorded.planes.as_ref().map(|set| {
                planes = set.iter().map(|p| (p.id, Plane::from(p))).collect();
                set.iter().map(Plane::from).collect::<Vec<_>>()
            });
            let hits = recorded
                .hits
                .iter()
                .map(|hit| convert_hit(hit, &planes))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("frame {index}"))?;
            let frame = convert_frame(&recorded).with_context(|| format!("frame {index}"))?;

            script.push(ScriptedFrame {
                hits,
                planes: plane_set,
                ..ScriptedFrame::new(frame)
            });
            inputs.push(FrameInput {
                tap: recorded.tap.map(|[x, y]| Tap { x, y }),
                select: recorded.select.map(Into::into),
            });
        }
        Ok((script, inputs))
    }
}

fn convert_hit(hit: &RecordedHit, planes: &HashMap<u64, Plane>) -> Result<HitResult> {
    let trackable = match hit.trackable {
        RecordedTrackable::Plane { id } => match planes.get(&id) {
            Some(plane) => Trackable::Surface(plane.clone()),
            None => bail!("hit refers to unknown plane {id}"),
        },
        RecordedTrackable::Point {
            id,
            estimated_surface_normal,
        } => Trackable::Point(FeaturePoint {
            id: TrackableId(id),
            orientation_mode: if estimated_surface_normal {
                OrientationMode::EstimatedSurfaceNormal
            } else {
                OrientationMode::Identity
            },
        }),
        RecordedTrackable::DepthPoint { id } => Trackable::DepthPoint(TrackableId(id)),
        RecordedTrackable::Other { id } => Trackable::Other(TrackableId(id)),
    };
    Ok(HitResult {
        trackable,
        pose: hit.pose.into(),
    })
}

fn convert_frame(recorded: &RecordedFrame) -> Result<Frame> {
    let camera = &recorded.camera;
    let light_estimate = match &recorded.light {
        None => LightEstimate::NotValid,
        Some(light) => {
            let Ok(ambient_spherical_harmonics) =
                <[f32; 27]>::try_from(light.spherical_harmonics.as_slice())
            else {
                bail!(
                    "expected 27 spherical harmonics coefficients, found {}",
                    light.spherical_harmonics.len()
                );
            };
            LightEstimate::Valid(EnvironmentalHdr {
                main_light_direction: Vec3::from_array(light.direction),
                main_light_intensity: Vec3::from_array(light.intensity),
                ambient_spherical_harmonics,
                // Radiance images are not recorded.
                cubemap: CubemapImage::black(light.cubemap_resolution).with_context(|| {
                    format!("cubemap resolution {} is too large", light.cubemap_resolution)
                })?,
            })
        }
    };
    let depth_image = match &recorded.depth {
        Some(depth) => {
            let expected = u64::from(depth.width) * u64::from(depth.height);
            if depth.data.len() as u64 != expected {
                bail!(
                    "depth image is {}x{} but carries {} samples",
                    depth.width,
                    depth.height,
                    depth.data.len()
                );
            }
            Some(DepthImage {
                width: depth.width,
                height: depth.height,
                data: depth.data.clone(),
            })
        }
        None => None,
    };

    Ok(Frame {
        timestamp: recorded.timestamp,
        camera: Camera {
            pose: camera.pose.into(),
            display_oriented_pose: camera.display_oriented_pose.unwrap_or(camera.pose).into(),
            fov_y: camera.fov_y,
            aspect: camera.aspect,
            tracking_state: camera.tracking_state.into(),
            failure_reason: camera.failure_reason.into(),
        },
        light_estimate,
        point_cloud: PointCloud {
            timestamp: recorded.point_cloud_timestamp.unwrap_or(recorded.timestamp),
            points: recorded
                .points
                .iter()
                .map(|[x, y, z, confidence]| PointVertex {
                    position: [*x, *y, *z],
                    confidence: *confidence,
                })
                .collect(),
        },
        depth_image,
        display_geometry: recorded.display_geometry,
    })
}
