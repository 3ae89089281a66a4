//! Surface bookkeeping between the platform view and the tracking session.

use crate::{
    gpu::TextureId,
    tracking::{DisplayRotation, TrackingSession},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraTextureBinding {
    #[default]
    Unbound,
    Bound(TextureId),
}

/// Tracks the viewport and rotation, forwarding them to the session only
/// when they changed, and binds the camera texture exactly once per surface.
#[derive(Debug, Default)]
pub struct SurfaceLifecycle {
    binding: CameraTextureBinding,
    viewport: Option<(u32, u32)>,
    rotation: DisplayRotation,
    geometry_changed: bool,
}

impl SurfaceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(&self) -> CameraTextureBinding {
        self.binding
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    pub fn rotation(&self) -> DisplayRotation {
        self.rotation
    }

    /// Hand `texture` to the session unless it already has one.
    /// Returns whether the session was told.
    pub fn bind_camera_texture_once<S: TrackingSession + ?Sized>(
        &mut self,
        session: &mut S,
        texture: TextureId,
    ) -> bool {
        if self.binding != CameraTextureBinding::Unbound {
            return false;
        }
        session.set_camera_texture(texture);
        self.binding = CameraTextureBinding::Bound(texture);
        log::debug!("Camera texture {texture:?} bound");
        true
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
        self.geometry_changed = true;
    }

    pub fn on_rotation(&mut self, rotation: DisplayRotation) {
        if self.rotation != rotation {
            self.rotation = rotation;
            self.geometry_changed = true;
        }
    }

    /// Push pending display geometry to the session.
    pub fn update_session_if_needed<S: TrackingSession + ?Sized>(
        &mut self,
        session: &mut S,
    ) -> bool {
        let Some((width, height)) = self.viewport else {
            return false;
        };
        if !self.geometry_changed {
            return false;
        }
        session.set_display_geometry(self.rotation, width, height);
        self.geometry_changed = false;
        true
    }

    /// Forget the binding; a new surface means new GPU resources.
    pub fn reset(&mut self) {
        self.binding = CameraTextureBinding::Unbound;
        self.geometry_changed = self.viewport.is_some();
    }
}
