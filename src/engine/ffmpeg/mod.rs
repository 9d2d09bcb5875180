//! FFmpeg-backed decode engine
//!
//! Media handles read track metadata from the container; the player decodes
//! on a background thread and pushes frames through the registered callbacks.

mod decoder;
mod player;

pub use decoder::StreamDecoder;
pub use player::FfmpegPlayer;

use ffmpeg_next::media::Type;

use super::{DecodeEngine, EngineError, EngineMedia, TrackInfo, TrackKind};
use crate::video::MediaSource;

/// Decode engine backed by the system FFmpeg libraries
pub struct FfmpegEngine {
    _private: (),
}

impl FfmpegEngine {
    /// Initialise FFmpeg. Failing here means the environment cannot decode anything.
    pub fn new() -> Result<Self, EngineError> {
        ffmpeg_next::init()?;
        tracing::debug!("FFmpeg initialised");
        Ok(Self { _private: () })
    }
}

impl DecodeEngine for FfmpegEngine {
    type Media = FfmpegMedia;
    type Player = FfmpegPlayer;

    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn create_player(&self) -> FfmpegPlayer {
        FfmpegPlayer::new()
    }

    fn open_media(&self, source: &MediaSource) -> Result<FfmpegMedia, EngineError> {
        let location = source.location();
        // Only check the container opens; tracks are read on parse
        ffmpeg_next::format::input(&location).map_err(|e| EngineError::Open {
            source_location: location.clone(),
            reason: e.to_string(),
        })?;

        Ok(FfmpegMedia {
            source: source.clone(),
            parsed: false,
            tracks: Vec::new(),
        })
    }
}

/// A media location that FFmpeg can open
pub struct FfmpegMedia {
    source: MediaSource,
    parsed: bool,
    tracks: Vec<TrackInfo>,
}

impl EngineMedia for FfmpegMedia {
    fn source(&self) -> &MediaSource {
        &self.source
    }

    fn is_parsed(&self) -> bool {
        self.parsed
    }

    fn parse(&mut self) -> Result<(), EngineError> {
        let input = ffmpeg_next::format::input(&self.source.location())
            .map_err(|e| EngineError::Parse(format!("{}: {}", self.source, e)))?;

        self.tracks = input.streams().map(|stream| track_info(&stream)).collect();
        self.parsed = true;

        tracing::debug!("Parsed {}: {} track(s)", self.source, self.tracks.len());
        Ok(())
    }

    fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }
}

fn track_info(stream: &ffmpeg_next::format::stream::Stream) -> TrackInfo {
    let parameters = stream.parameters();
    let kind = match parameters.medium() {
        Type::Video => TrackKind::Video,
        Type::Audio => TrackKind::Audio,
        Type::Subtitle => TrackKind::Subtitle,
        _ => TrackKind::Unknown,
    };
    let codec = ffmpeg_next::decoder::find(parameters.id())
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // Declared size comes from a decoder context built on the stream parameters
    let (width, height) = if kind == TrackKind::Video {
        ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map(|video| (video.width(), video.height()))
            .unwrap_or((0, 0))
    } else {
        (0, 0)
    };

    TrackInfo {
        id: stream.index() as u32,
        kind,
        width,
        height,
        codec,
    }
}
