/// Errors produced by the frame-level pipeline.
///
/// A missing fiducial or an unusable input is fatal for a whole frame; plates
/// that are out of frame or cannot be refined are skipped, not reported here.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("no fiducial marker detected in the frame")]
    NoFiducial,

    #[error("unknown marker dictionary {0:?}")]
    UnknownDictionary(String),

    #[error("empty image (width={width}, height={height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("unknown well {0:?}")]
    UnknownWell(String),

    #[error("deck slot {slot} was not found or could not be refined")]
    PlateNotFound { slot: usize },

    #[error("no plate could be refined in the frame")]
    NoPlates,

    #[error("well {well} has no pixels inside the frame")]
    WellOutOfFrame { well: String },
}

/// Config and report file errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
