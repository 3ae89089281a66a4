use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// `cetvel-replay` - Plays a recorded AR session through the measurement core.
///
/// Frames, hits and taps come from a JSON recording; GPU work goes to a
/// recording backend, so this runs headless and prints the status line of
/// every frame.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The recorded session to play back.
    #[arg(long, env = "CETVEL_RECORDING")]
    pub recording: PathBuf,

    /// Directory holding the `shaders/` and `models/` asset trees.
    #[arg(long, env = "CETVEL_ASSETS", default_value = "assets")]
    pub assets: PathBuf,

    /// Optional render configuration (JSON). Missing fields take defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Unit settings file (JSON). Created with defaults when `--save-settings` is set.
    #[arg(long, env = "CETVEL_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Write the effective unit settings back to `--settings` on exit.
    #[arg(long, default_value_t = false)]
    pub save_settings: bool,

    /// Override the unit the distance is printed in.
    #[arg(long, value_enum)]
    pub unit: Option<UnitArg>,

    /// Marker name used for taps that do not select one themselves.
    #[arg(long, value_enum, default_value_t = MarkerArg::First)]
    pub marker: MarkerArg,

    #[arg(long, default_value_t = 1080)]
    pub width: u32,

    #[arg(long, default_value_t = 1920)]
    pub height: u32,

    /// Composite the virtual scene with depth-based occlusion.
    #[arg(long, default_value_t = false)]
    pub occlusion: bool,

    /// Show the depth image instead of the camera image.
    #[arg(long, default_value_t = false)]
    pub depth_visualization: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum UnitArg {
    Metric,
    Imperial,
}

impl From<UnitArg> for cetvel::settings::Unit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Metric => Self::Metric,
            UnitArg::Imperial => Self::Imperial,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MarkerArg {
    First,
    Second,
}

impl From<MarkerArg> for cetvel::anchors::MarkerName {
    fn from(marker: MarkerArg) -> Self {
        match marker {
            MarkerArg::First => Self::First,
            MarkerArg::Second => Self::Second,
        }
    }
}
