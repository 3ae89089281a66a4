//! Render and depth configuration.

use serde::{Deserialize, Serialize};

/// Fixed rendering parameters. Every field has a default, so a partial JSON
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Near clip plane in meters.
    pub z_near: f32,
    /// Far clip plane in meters.
    pub z_far: f32,
    /// Edge length of the filtered specular cubemap, must be a power of two.
    pub cubemap_resolution: u32,
    /// Importance samples per texel used by the specular prefilter.
    pub cubemap_importance_samples: u32,
    /// RGBA color of feature points.
    pub point_color: [f32; 4],
    /// Feature point size in pixels.
    pub point_size: f32,
    /// Taps buffered between frames before new ones are dropped.
    pub tap_queue_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            z_near: 0.1,
            z_far: 100.0,
            cubemap_resolution: 16,
            cubemap_importance_samples: 32,
            point_color: [31.0 / 255.0, 188.0 / 255.0, 210.0 / 255.0, 1.0],
            point_size: 5.0,
            tap_queue_capacity: 16,
        }
    }
}

/// Depth-related user choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthSettings {
    use_depth_for_occlusion: bool,
    depth_color_visualization: bool,
    show_depth_enable_dialog: bool,
}

impl DepthSettings {
    pub fn use_depth_for_occlusion(&self) -> bool {
        self.use_depth_for_occlusion
    }

    pub fn set_use_depth_for_occlusion(&mut self, enable: bool) {
        self.use_depth_for_occlusion = enable;
    }

    pub fn depth_color_visualization(&self) -> bool {
        self.depth_color_visualization
    }

    pub fn set_depth_color_visualization(&mut self, enable: bool) {
        self.depth_color_visualization = enable;
    }

    /// Whether the background pass needs a depth image this frame.
    pub fn wants_depth_image(&self) -> bool {
        self.use_depth_for_occlusion || self.depth_color_visualization
    }

    /// Returns `true` exactly once; the occlusion dialog is offered a single time.
    pub fn should_show_depth_enable_dialog(&mut self) -> bool {
        std::mem::replace(&mut self.show_depth_enable_dialog, false)
    }
}

impl Default for DepthSettings {
    fn default() -> Self {
        Self {
            use_depth_for_occlusion: false,
            depth_color_visualization: false,
            show_depth_enable_dialog: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let cfg: RenderConfig = serde_json::from_str(r#"{ "z_far": 50.0 }"#).unwrap();
        assert_eq!(cfg.z_far, 50.0);
        assert_eq!(cfg.z_near, 0.1);
        assert_eq!(cfg.cubemap_resolution, 16);
        assert_eq!(cfg.cubemap_importance_samples, 32);
    }

    #[test]
    fn depth_dialog_is_offered_once() {
        let mut depth = DepthSettings::default();
        assert!(depth.should_show_depth_enable_dialog());
        assert!(!depth.should_show_depth_enable_dialog());
    }

    #[test]
    fn depth_image_wanted_for_either_mode() {
        let mut depth = DepthSettings::default();
        assert!(!depth.wants_depth_image());
        depth.set_depth_color_visualization(true);
        assert!(depth.wants_depth_image());
        depth.set_depth_color_visualization(false);
        depth.set_use_depth_for_occlusion(true);
        assert!(depth.wants_depth_image());
    }
}
