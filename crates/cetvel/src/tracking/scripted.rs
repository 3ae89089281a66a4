use super::{
    AnchorId, AnchorSnapshot, DisplayRotation, Frame, HitResult, Plane, Tap, TrackingSession,
    TrackingState,
};
use crate::{gpu::TextureId, Error, Result};
use std::collections::{BTreeMap, VecDeque};

/// One tick of a scripted session: the frame plus what the world looked like.
#[derive(Debug, Clone)]
pub struct ScriptedFrame {
    pub frame: Frame,
    /// Returned for any tap during this frame, nearest first.
    pub hits: Vec<HitResult>,
    /// Replaces the session's plane set when `Some`.
    pub planes: Option<Vec<Plane>>,
    /// Per-anchor states that differ from the camera's for this frame.
    pub anchor_states: Vec<(AnchorId, TrackingState)>,
}

impl ScriptedFrame {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            hits: Vec::new(),
            planes: None,
            anchor_states: Vec::new(),
        }
    }
}

/// Deterministic in-memory session that plays back a fixed list of frames.
///
/// Anchors keep the pose of the hit they were created from and inherit the
/// tracking state of the current frame's camera unless the frame overrides
/// it. Once the script runs out, `update` reports the camera as unavailable.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    script: VecDeque<ScriptedFrame>,
    current_hits: Vec<HitResult>,
    planes: Vec<Plane>,
    anchors: BTreeMap<AnchorId, AnchorSnapshot>,
    next_anchor: u64,
    camera_texture: Option<TextureId>,
    camera_texture_calls: usize,
    display_geometry: Option<(DisplayRotation, u32, u32)>,
    depth_supported: bool,
    frames_delivered: usize,
}

impl ScriptedSession {
    pub fn new(script: impl IntoIterator<Item = ScriptedFrame>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_depth_support(mut self, supported: bool) -> Self {
        self.depth_supported = supported;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.script.is_empty()
    }

    pub fn frames_delivered(&self) -> usize {
        self.frames_delivered
    }

    pub fn camera_texture(&self) -> Option<TextureId> {
        self.camera_texture
    }

    /// How many times a camera texture was registered.
    pub fn camera_texture_calls(&self) -> usize {
        self.camera_texture_calls
    }

    pub fn display_geometry(&self) -> Option<(DisplayRotation, u32, u32)> {
        self.display_geometry
    }

    pub fn live_anchors(&self) -> usize {
        self.anchors.len()
    }
}

impl TrackingSession for ScriptedSession {
    fn set_camera_texture(&mut self, texture: TextureId) {
        self.camera_texture = Some(texture);
        self.camera_texture_calls += 1;
    }

    fn set_display_geometry(&mut self, rotation: DisplayRotation, width: u32, height: u32) {
        self.display_geometry = Some((rotation, width, height));
    }

    fn update(&mut self) -> Result<Frame> {
        let next = self.script.pop_front().ok_or(Error::CameraUnavailable)?;
        let state = next.frame.camera.tracking_state;
        for anchor in self.anchors.values_mut() {
            anchor.tracking_state = state;
        }
        for (id, state) in &next.anchor_states {
            if let Some(anchor) = self.anchors.get_mut(id) {
                anchor.tracking_state = *state;
            }
        }
        if let Some(planes) = next.planes {
            self.planes = planes;
        }
        self.current_hits = next.hits;
        self.frames_delivered += 1;
        Ok(next.frame)
    }

    fn hit_test(&self, _frame: &Frame, _tap: Tap) -> Vec<HitResult> {
        self.current_hits.clone()
    }

    fn planes(&self) -> Vec<Plane> {
        self.planes.clone()
    }

    fn create_anchor(&mut self, hit: &HitResult) -> AnchorId {
        self.next_anchor += 1;
        let id = AnchorId(self.next_anchor);
        self.anchors.insert(
            id,
            AnchorSnapshot {
                pose: hit.pose,
                tracking_state: TrackingState::Tracking,
            },
        );
        id
    }

    fn detach_anchor(&mut self, anchor: AnchorId) {
        self.anchors.remove(&anchor);
    }

    fn anchor(&self, anchor: AnchorId) -> Option<AnchorSnapshot> {
        self.anchors.get(&anchor).copied()
    }

    fn is_depth_supported(&self) -> bool {
        self.depth_supported
    }
}
