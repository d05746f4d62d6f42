use std::path::PathBuf;
use thiserror::Error;

/// Failures of the screen-grab boundary.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("monitor index {index} is out of range ({available} monitors available)")]
    MonitorOutOfRange { index: usize, available: usize },

    #[error("no monitors found")]
    NoMonitors,

    #[error("screen capture failed: {0}")]
    Backend(#[from] xcap::XCapError),
}

impl CaptureError {
    /// Errors that will not go away by capturing again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::MonitorOutOfRange { .. } | CaptureError::NoMonitors
        )
    }
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("failed to load pattern '{name}' from {path:?}: {source}")]
    Load {
        name: String,
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("pattern '{0}' is not configured")]
    Unknown(String),

    #[error("pattern '{name}' is empty")]
    Empty { name: String },

    #[error(
        "pattern '{name}' ({pattern_width}x{pattern_height}) is larger than the screen ({screen_width}x{screen_height})"
    )]
    TooLarge {
        name: String,
        pattern_width: u32,
        pattern_height: u32,
        screen_width: u32,
        screen_height: u32,
    },
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to connect to the input backend: {0}")]
    Init(#[from] enigo::NewConError),

    #[error("pointer input failed: {0}")]
    Device(#[from] enigo::InputError),
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Input(#[from] InputError),
}

pub type BotResult<T> = Result<T, BotError>;
