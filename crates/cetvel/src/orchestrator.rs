//! The per-frame driver. Owns the session, the GPU backend and every piece of
//! core state, and runs one frame at a time on the render thread.

use crate::{
    anchors::{AnchorManager, MarkerName, Placement},
    assets::AssetSource,
    config::{DepthSettings, RenderConfig},
    gpu::GpuBackend,
    input::{TapQueue, TapSender},
    scene::SceneComposer,
    status::{derive_status, StatusMessage},
    surface::SurfaceLifecycle,
    tracking::{DisplayRotation, TrackingSession, TrackingState},
    ui::{UiEvent, UiSink},
    Error, Result,
};

pub const CAMERA_UNAVAILABLE_MESSAGE: &str = "Camera not available. Try restarting the app.";

/// What a single call to [`FrameOrchestrator::draw_frame`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub status: Option<StatusMessage>,
    pub drew_background: bool,
    /// Points, planes and markers were drawn.
    pub drew_scene: bool,
    pub placed: Option<Placement>,
    /// The camera is tracking and the display should not sleep.
    pub keep_screen_on: bool,
}

pub struct FrameOrchestrator<S, B> {
    session: S,
    gpu: B,
    assets: Box<dyn AssetSource>,
    config: RenderConfig,
    surface: SurfaceLifecycle,
    scene: Option<SceneComposer>,
    anchors: AnchorManager,
    taps: TapQueue,
    depth_settings: DepthSettings,
    ui: UiSink,
    selected: Option<MarkerName>,
}

impl<S: TrackingSession, B: GpuBackend> FrameOrchestrator<S, B> {
    pub fn new(
        session: S,
        gpu: B,
        assets: Box<dyn AssetSource>,
        config: RenderConfig,
        ui: UiSink,
    ) -> Self {
        let taps = TapQueue::new(config.tap_queue_capacity);
        Self {
            session,
            gpu,
            assets,
            config,
            surface: SurfaceLifecycle::new(),
            scene: None,
            anchors: AnchorManager::new(),
            taps,
            depth_settings: DepthSettings::default(),
            ui,
            selected: None,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn backend(&self) -> &B {
        &self.gpu
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.gpu
    }

    pub fn anchors(&self) -> &AnchorManager {
        &self.anchors
    }

    pub fn scene(&self) -> Option<&SceneComposer> {
        self.scene.as_ref()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn surface(&self) -> &SurfaceLifecycle {
        &self.surface
    }

    /// Handle for the input thread.
    pub fn tap_sender(&self) -> TapSender {
        self.taps.sender()
    }

    /// Name given to the next placed marker. `None` disables placement.
    pub fn select_marker(&mut self, name: Option<MarkerName>) {
        self.selected = name;
    }

    pub fn selected_marker(&self) -> Option<MarkerName> {
        self.selected
    }

    pub fn depth_settings(&self) -> &DepthSettings {
        &self.depth_settings
    }

    /// Changes take effect on the next frame.
    pub fn depth_settings_mut(&mut self) -> &mut DepthSettings {
        &mut self.depth_settings
    }

    pub fn on_resume(&mut self) {
        self.surface.reset();
        log::info!("Resumed");
    }

    pub fn on_pause(&mut self) {
        let dropped = std::iter::from_fn(|| self.taps.poll()).count();
        log::info!("Paused, {dropped} pending taps dropped");
    }

    /// One-time GPU setup. On failure no scene is installed and every
    /// following [`FrameOrchestrator::draw_frame`] reports
    /// [`Error::SurfaceNotReady`].
    pub fn on_surface_created(&mut self) -> Result<()> {
        self.scene = None;
        self.surface.reset();
        match SceneComposer::new(&mut self.gpu, self.assets.as_ref(), &self.config) {
            Ok(mut scene) => {
                if let Some((width, height)) = self.surface.viewport() {
                    scene.resize(&mut self.gpu, width, height);
                }
                self.scene = Some(scene);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to set up the scene: {e}");
                let message = match &e {
                    Error::Asset { .. } | Error::InvalidAsset { .. } => {
                        format!("Failed to read a required asset file: {e}")
                    }
                    _ => format!("Failed to set up rendering: {e}"),
                };
                self.ui.send(UiEvent::Error(message));
                Err(e)
            }
        }
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.surface.on_surface_changed(width, height);
        if let Some(scene) = &mut self.scene {
            scene.resize(&mut self.gpu, width, height);
        }
    }

    pub fn on_display_rotation(&mut self, rotation: DisplayRotation) {
        self.surface.on_rotation(rotation);
    }

    /// Run one frame.
    pub fn draw_frame(&mut self) -> Result<FrameReport> {
        let scene = self.scene.as_mut().ok_or(Error::SurfaceNotReady)?;

        let camera_texture = scene.camera_texture();
        self.surface
            .bind_camera_texture_once(&mut self.session, camera_texture);
        self.surface.update_session_if_needed(&mut self.session);

        let frame = match self.session.update() {
            Ok(frame) => frame,
            Err(Error::CameraUnavailable) => {
                log::error!("Camera not available during frame update");
                self.ui.send(UiEvent::Error(CAMERA_UNAVAILABLE_MESSAGE.to_owned()));
                return Ok(FrameReport::default());
            }
            Err(e) => return Err(e),
        };
        let tracking = frame.camera.tracking_state == TrackingState::Tracking;

        scene.apply_depth_settings(&mut self.gpu, &self.depth_settings)?;
        scene.update_display_geometry(&mut self.gpu, &frame)?;
        if tracking && self.depth_settings.wants_depth_image() {
            scene.update_depth(&mut self.gpu, &frame)?;
        }

        let tap = self.taps.poll();
        let placed = self
            .anchors
            .handle_tap(&mut self.session, &frame, tap, self.selected);
        if placed.is_some()
            && self.session.is_depth_supported()
            && self.depth_settings.should_show_depth_enable_dialog()
        {
            self.ui.send(UiEvent::SuggestOcclusion);
        }
        let distance = self.anchors.update_measurement(&self.session);

        let planes = self.session.planes();
        let has_tracking_plane = planes
            .iter()
            .any(|p| p.tracking_state == TrackingState::Tracking);
        let status = derive_status(distance, &frame.camera, has_tracking_plane, self.anchors.len());

        let drew_background = scene.draw_background(&mut self.gpu, &frame);

        let mut report = FrameReport {
            status,
            drew_background,
            drew_scene: false,
            placed,
            keep_screen_on: tracking,
        };
        if !tracking {
            return Ok(report);
        }

        let markers = self.anchors.tracked_poses(&self.session);
        let stats = scene.draw_scene(&mut self.gpu, &frame, &planes, &markers)?;
        log::trace!(
            "Frame {}: {} planes, {} markers, lit: {}",
            frame.timestamp,
            stats.planes_drawn,
            stats.objects_drawn,
            stats.lit
        );
        report.drew_scene = true;
        Ok(report)
    }
}
