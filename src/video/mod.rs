//! Decoded video: decoder handle, frame bridge and the drawable `Video`
//!
//! The decode engine writes RGBA frames through a [`FrameBridge`] from its own
//! thread; [`Video`] uploads the displayable frame to a GPU texture and draws it
//! scaled and positioned on every render call.

mod bridge;
mod discovery;
mod error;
mod frame;
mod handle;
mod player;
mod types;

pub use bridge::FrameBridge;
pub use discovery::discover_resolution;
pub use error::VideoError;
pub use frame::FrameBuffer;
pub use handle::DecoderHandle;
pub use player::Video;
pub use types::{BufferMode, MediaSource, PlaybackState, Resolution, BYTES_PER_PIXEL};
