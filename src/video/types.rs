//! Plain data types shared by the decoder handle, the frame bridge and the renderer.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Bytes per pixel of the RGBA interchange format.
pub const BYTES_PER_PIXEL: usize = 4;

/// A media location handed to the decode engine.
///
/// The string is forwarded as-is; no syntax validation happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Local file path
    Path(PathBuf),
    /// Stream URI (anything containing a scheme separator)
    Uri(String),
}

impl MediaSource {
    /// Classify a user-supplied location.
    pub fn parse(location: &str) -> Self {
        if location.contains("://") {
            MediaSource::Uri(location.to_string())
        } else {
            MediaSource::Path(PathBuf::from(location))
        }
    }

    /// The location as the engine should receive it.
    pub fn location(&self) -> String {
        match self {
            MediaSource::Path(path) => path.to_string_lossy().into_owned(),
            MediaSource::Uri(uri) => uri.clone(),
        }
    }

    /// The file path, if this source is one.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            MediaSource::Path(path) => Some(path),
            MediaSource::Uri(_) => None,
        }
    }
}

impl From<&str> for MediaSource {
    fn from(location: &str) -> Self {
        MediaSource::parse(location)
    }
}

impl From<PathBuf> for MediaSource {
    fn from(path: PathBuf) -> Self {
        MediaSource::Path(path)
    }
}

impl From<&Path> for MediaSource {
    fn from(path: &Path) -> Self {
        MediaSource::Path(path.to_path_buf())
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())
    }
}

/// Native pixel size of a decoded video stream.
///
/// `(0, 0)` means unknown / nothing loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const ZERO: Resolution = Resolution { width: 0, height: 0 };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are non-zero.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Bytes per row of an RGBA buffer at this resolution.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Size in bytes of an RGBA buffer at this resolution.
    pub fn byte_len(&self) -> usize {
        self.stride() * self.height as usize
    }

    pub fn as_vec2(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width as f32, self.height as f32)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where the decoder handle is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// No media bound
    #[default]
    Unloaded,
    /// Media bound, not playing
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, PlaybackState::Unloaded)
    }
}

/// How many pixel buffers the frame bridge keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferMode {
    /// One buffer shared by writer and reader; a render may sample a frame that
    /// is being replaced.
    #[default]
    Single,
    /// Writer fills a back buffer that is published on `present`, with one
    /// spare so the next frame can be written before the previous is shown.
    Double,
}

impl BufferMode {
    pub fn slot_count(&self) -> usize {
        match self {
            BufferMode::Single => 1,
            BufferMode::Double => 3,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BufferMode::Single => "single buffer",
            BufferMode::Double => "double buffer",
        }
    }
}
