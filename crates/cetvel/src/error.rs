use std::io;

/// Errors surfaced by the measurement core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tracking session could not deliver a camera frame this tick.
    #[error("camera not available")]
    CameraUnavailable,

    /// Depth data has not been produced for the current frame yet.
    #[error("depth image not yet available")]
    DepthNotYetAvailable,

    /// A required asset could not be read during setup.
    #[error("failed to read required asset `{path}`")]
    Asset {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A required asset was read but its content is unusable.
    #[error("invalid asset `{path}`: {reason}")]
    InvalidAsset { path: String, reason: String },

    /// A configuration value the core cannot work with.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A frame was requested before the GPU surface was set up successfully.
    #[error("rendering surface is not initialised")]
    SurfaceNotReady,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("malformed settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// Anything the GPU backend reports.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
