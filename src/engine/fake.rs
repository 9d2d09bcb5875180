//! Scripted in-memory decode engine for tests
//!
//! Media behaviour is configured up front with [`FakeMedia`] entries keyed by
//! location. The player records everything in a shared [`FakeState`] that tests
//! inspect through [`FakeEngine::state`], and [`FakeEngine::push_frame`] plays
//! the role of the decode thread.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{DecodeEngine, EngineError, EngineMedia, EnginePlayer, FrameCallbacks, TrackInfo, VideoFormat};
use crate::video::MediaSource;

/// How one scripted media item behaves
#[derive(Debug, Clone)]
pub struct FakeMedia {
    pub tracks: Vec<TrackInfo>,
    /// What the player reports for output 0 once the media is bound
    pub output_size: Option<(u32, u32)>,
    pub parse_fails: bool,
    pub pausable: bool,
}

impl FakeMedia {
    /// A plain video whose size is known both from tracks and the output.
    pub fn video(width: u32, height: u32) -> Self {
        Self {
            tracks: vec![TrackInfo::video(0, width, height, "h264"), TrackInfo::audio(1, "aac")],
            output_size: Some((width, height)),
            parse_fails: false,
            pausable: true,
        }
    }

    /// A video whose size is only declared in track metadata.
    pub fn tracks_only(width: u32, height: u32) -> Self {
        Self {
            output_size: None,
            ..Self::video(width, height)
        }
    }

    /// Media with no usable video track.
    pub fn audio_only() -> Self {
        Self {
            tracks: vec![TrackInfo::audio(0, "mp3")],
            output_size: None,
            parse_fails: false,
            pausable: true,
        }
    }
}

/// Player-side state recorded by the fake
#[derive(Default)]
pub struct FakeState {
    pub bound: Option<MediaSource>,
    pub format: Option<VideoFormat>,
    pub callbacks: Option<Arc<dyn FrameCallbacks>>,
    pub playing: bool,
    pub paused: bool,
    pub ended: bool,
    pub time_us: i64,
    pub volume: i32,
    pub muted: bool,
    pub parse_calls: u32,
    pub play_calls: u32,
}

pub struct FakeEngine {
    media: HashMap<String, FakeMedia>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            media: HashMap::new(),
            state: Arc::new(Mutex::new(FakeState {
                volume: 100,
                ..FakeState::default()
            })),
        }
    }

    pub fn with_media(mut self, location: &str, media: FakeMedia) -> Self {
        self.media.insert(location.to_string(), media);
        self
    }

    pub fn state(&self) -> Arc<Mutex<FakeState>> {
        Arc::clone(&self.state)
    }

    /// Act as the decode thread: write one frame filled with `value` and present it.
    ///
    /// Returns false when no callbacks are installed.
    pub fn push_frame(state: &Mutex<FakeState>, value: u8) -> bool {
        let callbacks = state.lock().callbacks.clone();
        let Some(callbacks) = callbacks else {
            return false;
        };
        let mut frame = callbacks.acquire();
        frame.fill(value);
        let id = frame.id();
        callbacks.release(frame);
        callbacks.present(id);
        true
    }
}

pub struct FakeMediaHandle {
    source: MediaSource,
    script: FakeMedia,
    parsed: bool,
    tracks: Vec<TrackInfo>,
    state: Arc<Mutex<FakeState>>,
}

impl EngineMedia for FakeMediaHandle {
    fn source(&self) -> &MediaSource {
        &self.source
    }

    fn is_parsed(&self) -> bool {
        self.parsed
    }

    fn parse(&mut self) -> Result<(), EngineError> {
        self.state.lock().parse_calls += 1;
        if self.script.parse_fails {
            return Err(EngineError::Parse(format!("{} is corrupt", self.source)));
        }
        self.tracks = self.script.tracks.clone();
        self.parsed = true;
        Ok(())
    }

    fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }
}

pub struct FakePlayer {
    state: Arc<Mutex<FakeState>>,
    output_size: Option<(u32, u32)>,
    pausable: bool,
}

impl EnginePlayer for FakePlayer {
    type Media = FakeMediaHandle;

    fn set_media(&mut self, media: &FakeMediaHandle) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        state.bound = Some(media.source.clone());
        state.playing = false;
        state.paused = false;
        state.ended = false;
        state.time_us = 0;
        self.output_size = media.script.output_size;
        self.pausable = media.script.pausable;
        Ok(())
    }

    fn clear_media(&mut self) {
        let mut state = self.state.lock();
        state.bound = None;
        state.playing = false;
        state.paused = false;
        self.output_size = None;
    }

    fn output_size(&self, output: u32) -> Option<(u32, u32)> {
        if output == 0 {
            self.output_size
        } else {
            None
        }
    }

    fn set_format(&mut self, format: VideoFormat) {
        self.state.lock().format = Some(format);
    }

    fn set_callbacks(&mut self, callbacks: Arc<dyn FrameCallbacks>) {
        self.state.lock().callbacks = Some(callbacks);
    }

    fn clear_callbacks(&mut self) {
        self.state.lock().callbacks = None;
    }

    fn play(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.bound.is_none() {
            return Err(EngineError::NoMedia);
        }
        state.play_calls += 1;
        state.playing = true;
        state.paused = false;
        state.ended = false;
        Ok(())
    }

    fn set_pause(&mut self, paused: bool) {
        let mut state = self.state.lock();
        if state.playing && self.pausable {
            state.paused = paused;
        }
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.playing = false;
        state.paused = false;
        state.time_us = 0;
    }

    fn can_pause(&self) -> bool {
        self.pausable
    }

    fn has_ended(&self) -> bool {
        self.state.lock().ended
    }

    fn time(&self) -> Option<i64> {
        let state = self.state.lock();
        state.bound.as_ref().map(|_| state.time_us)
    }

    fn set_time(&mut self, micros: i64) {
        let mut state = self.state.lock();
        if state.bound.is_some() {
            state.time_us = micros.max(0);
        }
    }

    fn volume(&self) -> i32 {
        self.state.lock().volume
    }

    fn set_volume(&mut self, volume: i32) -> Result<(), EngineError> {
        if !(0..=200).contains(&volume) {
            return Err(EngineError::Playback(format!("volume {} out of range", volume)));
        }
        self.state.lock().volume = volume;
        Ok(())
    }

    fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    fn set_mute(&mut self, muted: bool) {
        self.state.lock().muted = muted;
    }
}

impl DecodeEngine for FakeEngine {
    type Media = FakeMediaHandle;
    type Player = FakePlayer;

    fn name(&self) -> &str {
        "fake"
    }

    fn create_player(&self) -> FakePlayer {
        FakePlayer {
            state: Arc::clone(&self.state),
            output_size: None,
            pausable: true,
        }
    }

    fn open_media(&self, source: &MediaSource) -> Result<FakeMediaHandle, EngineError> {
        let script = self.media.get(&source.location()).cloned().ok_or_else(|| EngineError::Open {
            source_location: source.location(),
            reason: "No such file or directory".to_string(),
        })?;

        Ok(FakeMediaHandle {
            source: source.clone(),
            script,
            parsed: false,
            tracks: Vec::new(),
            state: Arc::clone(&self.state),
        })
    }
}
