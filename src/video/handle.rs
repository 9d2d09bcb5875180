//! Decoder handle: one engine, one player, at most one bound media
//!
//! Owns the playback state machine and forwards transport, time and volume
//! controls to the engine's player. Engine failures in those controls are
//! logged and absorbed so callers always get plain values back.

use std::sync::Arc;

use crate::engine::{
    DecodeEngine, EngineError, EngineMedia, EnginePlayer, FrameCallbacks, TrackInfo, VideoFormat,
};

use super::discovery::discover_resolution;
use super::error::VideoError;
use super::types::{MediaSource, PlaybackState, Resolution};

/// Playback controller bound to a decode engine.
///
/// Fields drop in declaration order, so the media is released before the
/// player and the player before the engine.
pub struct DecoderHandle<E: DecodeEngine> {
    media: Option<E::Media>,
    player: E::Player,
    engine: E,
    state: PlaybackState,
    source: Option<MediaSource>,
}

impl<E: DecodeEngine> DecoderHandle<E> {
    /// Create a player on `engine` with no media bound.
    pub fn new(engine: E) -> Self {
        let player = engine.create_player();
        tracing::debug!("Created {} player", engine.name());

        Self {
            media: None,
            player,
            engine,
            state: PlaybackState::Unloaded,
            source: None,
        }
    }

    /// Bind `source`, replacing whatever was loaded before.
    ///
    /// Returns the discovered native resolution, which is
    /// [`Resolution::ZERO`] when the media declares no usable video size.
    pub fn load(&mut self, source: MediaSource) -> Result<Resolution, VideoError> {
        self.unload();

        let load_error = |e: EngineError| VideoError::Load {
            location: source.location(),
            source: e,
        };

        let mut media = self.engine.open_media(&source).map_err(load_error)?;
        self.player.set_media(&media).map_err(load_error)?;

        let resolution = match discover_resolution(&mut media, &self.player) {
            Ok(res) => res,
            Err(e) => {
                self.player.clear_media();
                return Err(load_error(e));
            }
        };

        tracing::info!("Loaded {} ({})", source, resolution);
        self.media = Some(media);
        self.source = Some(source);
        self.state = PlaybackState::Stopped;
        Ok(resolution)
    }

    /// Stop playback and release the bound media, if any.
    pub fn unload(&mut self) {
        if self.media.take().is_some() {
            self.player.stop();
            self.player.clear_media();
        }
        self.source = None;
        self.state = PlaybackState::Unloaded;
    }

    /// Current state. A stream that ran to its end while playing reports `Stopped`.
    pub fn state(&self) -> PlaybackState {
        if self.state == PlaybackState::Playing && self.player.has_ended() {
            PlaybackState::Stopped
        } else {
            self.state
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.media.is_some()
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    /// Tracks of the bound media (empty when unloaded)
    pub fn tracks(&self) -> &[TrackInfo] {
        self.media.as_ref().map(|m| m.tracks()).unwrap_or(&[])
    }

    pub fn can_pause(&self) -> bool {
        self.is_loaded() && self.player.can_pause()
    }

    /// Start playback. With `toggle`, playing media is paused instead.
    pub fn play(&mut self, toggle: bool) {
        match self.state() {
            PlaybackState::Unloaded => {}
            PlaybackState::Playing => {
                if toggle {
                    self.enter_paused();
                }
            }
            from @ (PlaybackState::Paused | PlaybackState::Stopped) => self.enter_playing(from),
        }
    }

    /// Pause playback. With `toggle`, paused media is resumed instead.
    ///
    /// Stopped media stays stopped.
    pub fn pause(&mut self, toggle: bool) {
        match self.state() {
            PlaybackState::Unloaded | PlaybackState::Stopped => {}
            PlaybackState::Playing => self.enter_paused(),
            PlaybackState::Paused => {
                if toggle {
                    self.enter_playing(PlaybackState::Paused);
                }
            }
        }
    }

    pub fn stop(&mut self) {
        if self.is_loaded() {
            self.player.stop();
            self.state = PlaybackState::Stopped;
        }
    }

    fn enter_playing(&mut self, from: PlaybackState) {
        if from == PlaybackState::Paused {
            self.player.set_pause(false);
        } else if let Err(e) = self.player.play() {
            tracing::warn!("Failed to start playback: {}", e);
            return;
        }
        self.state = PlaybackState::Playing;
    }

    fn enter_paused(&mut self) {
        if !self.player.can_pause() {
            tracing::debug!("Media cannot be paused, ignoring");
            return;
        }
        self.player.set_pause(true);
        self.state = PlaybackState::Paused;
    }

    /// Playback position in microseconds, or -1 when nothing is loaded.
    pub fn time(&self) -> i64 {
        if !self.is_loaded() {
            return -1;
        }
        self.player.time().unwrap_or(-1)
    }

    /// Jump to `micros` from stream start.
    pub fn seek_time(&mut self, micros: i64) {
        if self.is_loaded() {
            self.player.set_time(micros);
        }
    }

    /// Move the playback position by `delta` microseconds (negative seeks back).
    pub fn skip_time(&mut self, delta: i64) {
        if !self.is_loaded() {
            return;
        }
        let now = self.player.time().unwrap_or(0);
        self.player.set_time(now.saturating_add(delta));
    }

    /// Volume in percent
    pub fn volume(&self) -> i32 {
        self.player.volume()
    }

    pub fn set_volume(&mut self, volume: i32) {
        if let Err(e) = self.player.set_volume(volume) {
            tracing::warn!("Failed to set volume to {}: {}", volume, e);
        }
    }

    /// `true` flips the mute state, `false` mutes unconditionally.
    pub fn mute(&mut self, toggle: bool) {
        let muted = if toggle { !self.player.is_muted() } else { true };
        self.player.set_mute(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.player.is_muted()
    }

    pub fn set_format(&mut self, format: VideoFormat) {
        self.player.set_format(format);
    }

    pub fn set_callbacks(&mut self, callbacks: Arc<dyn FrameCallbacks>) {
        self.player.set_callbacks(callbacks);
    }

    pub fn clear_callbacks(&mut self) {
        self.player.clear_callbacks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{FakeEngine, FakeMedia, FakeState};
    use parking_lot::Mutex;

    fn loaded_handle() -> (DecoderHandle<FakeEngine>, Arc<Mutex<FakeState>>) {
        let engine = FakeEngine::new().with_media("clip.mp4", FakeMedia::video(640, 360));
        let state = engine.state();
        let mut handle = DecoderHandle::new(engine);
        handle.load(MediaSource::parse("clip.mp4")).unwrap();
        (handle, state)
    }

    #[test]
    fn test_load_transitions_to_stopped() {
        let (handle, state) = loaded_handle();

        assert_eq!(handle.state(), PlaybackState::Stopped);
        assert!(handle.is_loaded());
        assert_eq!(handle.tracks().len(), 2);
        assert_eq!(state.lock().bound, Some(MediaSource::parse("clip.mp4")));
    }

    #[test]
    fn test_load_failure_leaves_unloaded() {
        let (mut handle, state) = loaded_handle();

        let err = handle.load(MediaSource::parse("missing.mp4")).unwrap_err();
        assert!(matches!(err, VideoError::Load { ref location, .. } if location == "missing.mp4"));
        assert_eq!(handle.state(), PlaybackState::Unloaded);
        assert_eq!(handle.time(), -1);
        assert!(handle.source().is_none());
        assert!(state.lock().bound.is_none(), "old media must be released");
    }

    #[test]
    fn test_parse_failure_is_load_failure() {
        let mut script = FakeMedia::video(640, 360);
        script.parse_fails = true;
        let engine = FakeEngine::new().with_media("broken.mp4", script);
        let state = engine.state();
        let mut handle = DecoderHandle::new(engine);

        assert!(handle.load(MediaSource::parse("broken.mp4")).is_err());
        assert_eq!(handle.state(), PlaybackState::Unloaded);
        assert!(state.lock().bound.is_none());
    }

    #[test]
    fn test_play_toggle() {
        let (mut handle, _state) = loaded_handle();

        handle.play(true);
        assert_eq!(handle.state(), PlaybackState::Playing);

        handle.play(true);
        assert_eq!(handle.state(), PlaybackState::Paused);

        handle.play(true);
        assert_eq!(handle.state(), PlaybackState::Playing);

        handle.play(false);
        assert_eq!(handle.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_pause_toggle() {
        let (mut handle, state) = loaded_handle();

        handle.pause(true);
        assert_eq!(handle.state(), PlaybackState::Stopped, "no Stopped -> Paused transition");

        handle.play(false);
        handle.pause(false);
        assert_eq!(handle.state(), PlaybackState::Paused);
        assert!(state.lock().paused);

        handle.pause(false);
        assert_eq!(handle.state(), PlaybackState::Paused);

        handle.pause(true);
        assert_eq!(handle.state(), PlaybackState::Playing);
        assert!(!state.lock().paused);
    }

    #[test]
    fn test_unpausable_media() {
        let mut script = FakeMedia::video(320, 240);
        script.pausable = false;
        let engine = FakeEngine::new().with_media("live.ts", script);
        let mut handle = DecoderHandle::new(engine);
        handle.load(MediaSource::parse("live.ts")).unwrap();

        handle.play(false);
        handle.pause(false);
        assert_eq!(handle.state(), PlaybackState::Playing);
        handle.play(true);
        assert_eq!(handle.state(), PlaybackState::Playing);
        assert!(!handle.can_pause());
    }

    #[test]
    fn test_stop_and_end_of_stream() {
        let (mut handle, state) = loaded_handle();

        handle.play(false);
        handle.stop();
        assert_eq!(handle.state(), PlaybackState::Stopped);

        handle.play(false);
        state.lock().ended = true;
        assert_eq!(handle.state(), PlaybackState::Stopped);

        // Playing again restarts the stream
        handle.play(true);
        assert_eq!(handle.state(), PlaybackState::Playing);
        assert_eq!(state.lock().play_calls, 3);
    }

    #[test]
    fn test_controls_ignored_when_unloaded() {
        let engine = FakeEngine::new();
        let state = engine.state();
        let mut handle = DecoderHandle::new(engine);

        handle.play(false);
        handle.pause(true);
        handle.stop();
        handle.seek_time(5_000_000);
        handle.skip_time(1_000_000);

        assert_eq!(handle.state(), PlaybackState::Unloaded);
        assert_eq!(handle.time(), -1);
        assert_eq!(state.lock().play_calls, 0);
    }

    #[test]
    fn test_seek_and_skip() {
        let (mut handle, _state) = loaded_handle();

        assert_eq!(handle.time(), 0);
        handle.seek_time(10_000_000);
        assert_eq!(handle.time(), 10_000_000);

        handle.skip_time(2_500_000);
        assert_eq!(handle.time(), 12_500_000);

        handle.skip_time(-5_000_000);
        assert_eq!(handle.time(), 7_500_000);
    }

    #[test]
    fn test_volume_and_mute() {
        let (mut handle, _state) = loaded_handle();

        assert_eq!(handle.volume(), 100);
        handle.set_volume(35);
        assert_eq!(handle.volume(), 35);

        // Rejected by the engine: logged, value unchanged
        handle.set_volume(-20);
        assert_eq!(handle.volume(), 35);

        assert!(!handle.is_muted());
        handle.mute(true);
        assert!(handle.is_muted());
        handle.mute(true);
        assert!(!handle.is_muted());
        handle.mute(false);
        assert!(handle.is_muted());
        handle.mute(false);
        assert!(handle.is_muted());
    }
}
