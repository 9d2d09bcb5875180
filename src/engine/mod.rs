//! Decode-engine capability boundary
//!
//! A decode engine opens media, reports track metadata and drives a player that
//! decodes on its own thread. Decoded pixels are pushed through the three
//! [`FrameCallbacks`] entry points in the byte layout declared with
//! [`EnginePlayer::set_format`].
//!
//! The FFmpeg adapter lives in [`ffmpeg`] behind the `ffmpeg` cargo feature.

#[cfg(test)]
pub(crate) mod fake;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::MappedMutexGuard;
use thiserror::Error;

use crate::video::{MediaSource, Resolution};

/// Errors reported by a decode engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to open media {source_location}: {reason}")]
    Open { source_location: String, reason: String },
    #[error("Failed to parse media: {0}")]
    Parse(String),
    #[error("Playback error: {0}")]
    Playback(String),
    #[error("No media bound to the player")]
    NoMedia,
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
}

/// Kind of elementary stream inside a media container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
    Unknown,
}

/// Metadata of one track as declared by the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: u32,
    pub kind: TrackKind,
    /// Declared width (0 for non-video tracks)
    pub width: u32,
    /// Declared height (0 for non-video tracks)
    pub height: u32,
    pub codec: String,
}

impl TrackInfo {
    pub fn video(id: u32, width: u32, height: u32, codec: impl Into<String>) -> Self {
        Self {
            id,
            kind: TrackKind::Video,
            width,
            height,
            codec: codec.into(),
        }
    }

    pub fn audio(id: u32, codec: impl Into<String>) -> Self {
        Self {
            id,
            kind: TrackKind::Audio,
            width: 0,
            height: 0,
            codec: codec.into(),
        }
    }

    /// Declared dimensions, if this is a video track with a usable size
    pub fn video_dimensions(&self) -> Option<Resolution> {
        let res = Resolution::new(self.width, self.height);
        (self.kind == TrackKind::Video && res.is_known()).then_some(res)
    }
}

/// Pixel layout the player must write into acquired frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    /// Four character chroma code
    pub chroma: [u8; 4],
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub pitch: u32,
}

impl VideoFormat {
    pub const RGBA: [u8; 4] = *b"RGBA";

    /// Tightly packed RGBA at the given resolution.
    pub fn rgba(resolution: Resolution) -> Self {
        Self {
            chroma: Self::RGBA,
            width: resolution.width,
            height: resolution.height,
            pitch: resolution.width * 4,
        }
    }

    pub fn chroma_str(&self) -> &str {
        std::str::from_utf8(&self.chroma).unwrap_or("????")
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Bytes needed to hold one frame
    pub fn frame_len(&self) -> usize {
        self.pitch as usize * self.height as usize
    }
}

/// Identity of one written frame, handed back to [`FrameCallbacks::present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    slot: usize,
    sequence: u64,
}

impl FrameId {
    pub fn new(slot: usize, sequence: u64) -> Self {
        Self { slot, sequence }
    }

    /// Buffer the frame was written into
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Monotonic per acquire; tells apart successive frames in the same slot
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Writable access to one frame buffer, held between acquire and release.
pub struct FrameLock<'a> {
    id: FrameId,
    resolution: Resolution,
    pixels: MappedMutexGuard<'a, [u8]>,
}

impl<'a> FrameLock<'a> {
    pub fn new(id: FrameId, resolution: Resolution, pixels: MappedMutexGuard<'a, [u8]>) -> Self {
        Self { id, resolution, pixels }
    }

    /// Pass this to `present` once the frame is due
    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.resolution.stride()
    }
}

impl Deref for FrameLock<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.pixels
    }
}

impl DerefMut for FrameLock<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

/// Video output contract invoked from the engine's decode thread.
///
/// For every decoded frame the engine calls `acquire`, writes the pixels into
/// the returned lock, hands it back through `release` and finally calls
/// `present` with the lock's [`FrameId`] once the frame is due on screen. An
/// engine may acquire and release the next frame before presenting the
/// previous one.
pub trait FrameCallbacks: Send + Sync {
    /// Writable view of the buffer the next frame goes into.
    fn acquire(&self) -> FrameLock<'_>;

    /// The frame written into `frame` is complete.
    fn release(&self, frame: FrameLock<'_>);

    /// The released frame `frame` should now be shown.
    fn present(&self, frame: FrameId);
}

/// A decode engine instance: factory for players and media handles.
pub trait DecodeEngine {
    type Media: EngineMedia;
    type Player: EnginePlayer<Media = Self::Media>;

    /// Human readable engine name for logs
    fn name(&self) -> &str;

    /// Create a player bound to no media.
    fn create_player(&self) -> Self::Player;

    /// Open a media handle. Fails for unreachable or unsupported sources.
    fn open_media(&self, source: &MediaSource) -> Result<Self::Media, EngineError>;
}

/// An opened media item
pub trait EngineMedia {
    fn source(&self) -> &MediaSource;

    /// Whether track metadata has been extracted
    fn is_parsed(&self) -> bool;

    /// Synchronously extract track metadata.
    fn parse(&mut self) -> Result<(), EngineError>;

    /// Tracks found by the last parse (empty before parsing)
    fn tracks(&self) -> &[TrackInfo];
}

/// A media player driving its own decode thread
pub trait EnginePlayer {
    type Media: EngineMedia;

    /// Bind media to the player. Any current playback is stopped.
    fn set_media(&mut self, media: &Self::Media) -> Result<(), EngineError>;

    /// Unbind the current media, stopping playback.
    fn clear_media(&mut self);

    /// Size negotiated for the given video output, once known.
    fn output_size(&self, output: u32) -> Option<(u32, u32)>;

    /// Declare the pixel layout written through the callbacks.
    fn set_format(&mut self, format: VideoFormat);

    fn set_callbacks(&mut self, callbacks: Arc<dyn FrameCallbacks>);

    /// After this returns the decode thread no longer calls into the old callbacks.
    fn clear_callbacks(&mut self);

    fn play(&mut self) -> Result<(), EngineError>;

    fn set_pause(&mut self, paused: bool);

    fn stop(&mut self);

    fn can_pause(&self) -> bool;

    /// The stream ran to its end since the last `play`.
    fn has_ended(&self) -> bool;

    /// Current position in microseconds, `None` without media.
    fn time(&self) -> Option<i64>;

    fn set_time(&mut self, micros: i64);

    /// Volume in percent
    fn volume(&self) -> i32;

    fn set_volume(&mut self, volume: i32) -> Result<(), EngineError>;

    fn is_muted(&self) -> bool;

    fn set_mute(&mut self, muted: bool);
}
