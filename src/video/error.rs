use thiserror::Error;

use crate::engine::EngineError;
use crate::render::RenderError;

/// Errors returned when loading media into a [`Video`](super::Video)
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to load {location}: {source}")]
    Load {
        location: String,
        #[source]
        source: EngineError,
    },
    #[error("Video resolution could not be determined")]
    UnknownResolution,
    #[error(transparent)]
    Render(#[from] RenderError),
}
