//! Video object: decoder handle, frame bridge and texture for one media
//!
//! Loading discovers the native resolution, allocates the frame bridge and
//! a texture of the same size, and registers the bridge with the player.
//! Every render call re-uploads the displayable frame and draws it as one
//! positioned, scaled sprite.

use std::sync::Arc;

use glam::Vec2;

use crate::engine::{DecodeEngine, EngineError, VideoFormat};
use crate::render::{FrameTexture, RenderTarget, Sprite, TextureFactory};

use super::bridge::FrameBridge;
use super::error::VideoError;
use super::handle::DecoderHandle;
use super::types::{BufferMode, MediaSource, PlaybackState, Resolution};

/// A playable, drawable video.
pub struct Video<E: DecodeEngine, F: TextureFactory> {
    texture: Option<F::Texture>,
    bridge: Option<Arc<FrameBridge>>,
    handle: DecoderHandle<E>,
    factory: F,
    resolution: Resolution,
    buffer_mode: BufferMode,
}

impl<E: DecodeEngine, F: TextureFactory> Video<E, F> {
    /// Create a video with nothing loaded.
    pub fn new(engine: E, factory: F) -> Self {
        Self {
            texture: None,
            bridge: None,
            handle: DecoderHandle::new(engine),
            factory,
            resolution: Resolution::ZERO,
            buffer_mode: BufferMode::default(),
        }
    }

    /// Create a video and load `source` into it.
    ///
    /// A failed load is logged; the video is still returned, reporting
    /// a zero size and `time() == -1`.
    pub fn with_source(engine: E, factory: F, source: impl Into<MediaSource>) -> Self {
        let mut video = Self::new(engine, factory);
        if let Err(e) = video.load(source) {
            tracing::warn!("{}", e);
        }
        video
    }

    /// Buffer mode used by the next load.
    pub fn with_buffer_mode(mut self, mode: BufferMode) -> Self {
        self.buffer_mode = mode;
        self
    }

    pub fn set_buffer_mode(&mut self, mode: BufferMode) {
        self.buffer_mode = mode;
    }

    pub fn buffer_mode(&self) -> BufferMode {
        self.buffer_mode
    }

    /// Load `source`, replacing the current media.
    ///
    /// On `UnknownResolution` the media stays bound so playback controls keep
    /// working, but nothing is drawn.
    pub fn load(&mut self, source: impl Into<MediaSource>) -> Result<Resolution, VideoError> {
        self.release_frames();

        let resolution = self.handle.load(source.into())?;
        if !resolution.is_known() {
            return Err(VideoError::UnknownResolution);
        }

        let texture = match self.factory.create_texture(resolution) {
            Ok(texture) => texture,
            Err(e) => {
                self.handle.unload();
                return Err(e.into());
            }
        };
        let bridge = Arc::new(FrameBridge::new(resolution, self.buffer_mode));

        // Format and callbacks go in together, before any play
        self.handle.set_format(VideoFormat::rgba(resolution));
        self.handle.set_callbacks(bridge.clone());

        tracing::debug!("Allocated {} frame bridge at {}", self.buffer_mode.display_name(), resolution);
        self.texture = Some(texture);
        self.bridge = Some(bridge);
        self.resolution = resolution;
        Ok(resolution)
    }

    /// Load the current source again, picking up a changed buffer mode.
    pub fn reload(&mut self) -> Result<Resolution, VideoError> {
        match self.handle.source().cloned() {
            Some(source) => self.load(source),
            None => Err(VideoError::Load {
                location: String::new(),
                source: EngineError::NoMedia,
            }),
        }
    }

    /// Stop the decode thread writing into the current bridge and drop it.
    fn release_frames(&mut self) {
        self.handle.stop();
        self.handle.clear_callbacks();
        self.bridge = None;
        self.texture = None;
        self.resolution = Resolution::ZERO;
    }

    /// Draw at the origin at native size.
    pub fn render<T>(&mut self, target: &mut T)
    where
        T: RenderTarget<Texture = F::Texture>,
    {
        let size = self.resolution.as_vec2();
        self.render_scaled(target, Vec2::ZERO, size);
    }

    /// Draw with the top-left corner at `position`, at native size.
    pub fn render_at<T>(&mut self, target: &mut T, position: Vec2)
    where
        T: RenderTarget<Texture = F::Texture>,
    {
        let size = self.resolution.as_vec2();
        self.render_scaled(target, position, size);
    }

    /// Draw stretched to `size` with the top-left corner at `position`.
    ///
    /// Does nothing until a media with a known resolution is loaded.
    pub fn render_scaled<T>(&mut self, target: &mut T, position: Vec2, size: Vec2)
    where
        T: RenderTarget<Texture = F::Texture>,
    {
        if !self.resolution.is_known() {
            return;
        }
        let (Some(texture), Some(bridge)) = (self.texture.as_mut(), self.bridge.as_ref()) else {
            return;
        };

        bridge.with_front(|frame| texture.update(frame.as_bytes()));

        let native = self.resolution.as_vec2();
        let sprite = Sprite::new(position, size / native, native);
        target.draw(texture, &sprite);
    }

    /// Native resolution, zero when nothing drawable is loaded
    pub fn size(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.handle.source()
    }

    pub fn frame_bridge(&self) -> Option<&FrameBridge> {
        self.bridge.as_deref()
    }

    pub fn texture(&self) -> Option<&F::Texture> {
        self.texture.as_ref()
    }

    pub fn handle(&self) -> &DecoderHandle<E> {
        &self.handle
    }

    pub fn state(&self) -> PlaybackState {
        self.handle.state()
    }

    pub fn play(&mut self, toggle: bool) {
        self.handle.play(toggle);
    }

    pub fn pause(&mut self, toggle: bool) {
        self.handle.pause(toggle);
    }

    pub fn stop(&mut self) {
        self.handle.stop();
    }

    /// Microseconds from stream start, -1 when nothing is loaded
    pub fn time(&self) -> i64 {
        self.handle.time()
    }

    pub fn seek_time(&mut self, micros: i64) {
        self.handle.seek_time(micros);
    }

    pub fn skip_time(&mut self, delta: i64) {
        self.handle.skip_time(delta);
    }

    pub fn volume(&self) -> i32 {
        self.handle.volume()
    }

    pub fn set_volume(&mut self, volume: i32) {
        self.handle.set_volume(volume);
    }

    pub fn mute(&mut self, toggle: bool) {
        self.handle.mute(toggle);
    }

    pub fn is_muted(&self) -> bool {
        self.handle.is_muted()
    }
}

impl<E: DecodeEngine, F: TextureFactory> Drop for Video<E, F> {
    fn drop(&mut self) {
        self.handle.stop();
        self.handle.clear_callbacks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{FakeEngine, FakeMedia, FakeState};
    use crate::engine::FrameCallbacks;
    use crate::render::fake::{FakeFactory, RecordingTarget};
    use crate::render::RenderError;
    use parking_lot::Mutex;

    fn engine() -> FakeEngine {
        FakeEngine::new()
            .with_media("clip.mp4", FakeMedia::video(640, 360))
            .with_media("wide.mkv", FakeMedia::tracks_only(1920, 800))
            .with_media("song.mp3", FakeMedia::audio_only())
    }

    fn loaded(mode: BufferMode) -> (Video<FakeEngine, FakeFactory>, Arc<Mutex<FakeState>>) {
        let engine = engine();
        let state = engine.state();
        let mut video = Video::new(engine, FakeFactory::new()).with_buffer_mode(mode);
        video.load("clip.mp4").unwrap();
        (video, state)
    }

    #[test]
    fn test_load_allocates_matching_buffer_and_texture() {
        let (video, state) = loaded(BufferMode::Single);

        assert_eq!(video.size(), Resolution::new(640, 360));
        assert_eq!(video.state(), PlaybackState::Stopped);

        let bridge = video.frame_bridge().unwrap();
        assert_eq!(bridge.frame_len(), 640 * 360 * 4);
        assert_eq!(bridge.with_front(|frame| frame.len()), 640 * 360 * 4);
        assert_eq!(video.texture().unwrap().size(), video.size());

        let state = state.lock();
        assert_eq!(state.format, Some(VideoFormat::rgba(Resolution::new(640, 360))));
        assert!(state.callbacks.is_some());
    }

    #[test]
    fn test_fallback_resolution_from_tracks() {
        let mut video = Video::new(engine(), FakeFactory::new());
        assert_eq!(video.load("wide.mkv").unwrap(), Resolution::new(1920, 800));
        assert_eq!(video.texture().unwrap().size(), Resolution::new(1920, 800));
    }

    #[test]
    fn test_render_native_scale() {
        let (mut video, _state) = loaded(BufferMode::Single);
        let mut target = RecordingTarget::new(1280.0, 720.0);

        video.render(&mut target);

        let draw = target.last();
        assert_eq!(draw.sprite.position, Vec2::ZERO);
        assert_eq!(draw.sprite.scale, Vec2::ONE);
        assert_eq!(draw.sprite.destination_size(), Vec2::new(640.0, 360.0));
        assert_eq!(draw.texture_size, Resolution::new(640, 360));
    }

    #[test]
    fn test_render_at_position() {
        let (mut video, _state) = loaded(BufferMode::Single);
        let mut target = RecordingTarget::new(1280.0, 720.0);

        video.render_at(&mut target, Vec2::new(100.0, 50.0));

        let draw = target.last();
        assert_eq!(draw.sprite.position, Vec2::new(100.0, 50.0));
        assert_eq!(draw.sprite.scale, Vec2::ONE);
    }

    #[test]
    fn test_render_scaled_is_idempotent() {
        let (mut video, _state) = loaded(BufferMode::Single);
        let mut target = RecordingTarget::new(1280.0, 720.0);

        for _ in 0..3 {
            video.render_scaled(&mut target, Vec2::new(10.0, 20.0), Vec2::new(320.0, 720.0));
        }

        assert_eq!(target.draws.len(), 3);
        for draw in &target.draws {
            assert_eq!(draw.sprite.scale, Vec2::new(0.5, 2.0));
            assert_eq!(draw.sprite.position, Vec2::new(10.0, 20.0));
            assert_eq!(draw.sprite.destination_size(), Vec2::new(320.0, 720.0));
        }
        assert_eq!(video.texture().unwrap().uploads, 3);
    }

    #[test]
    fn test_render_before_load_is_noop() {
        let mut video = Video::new(engine(), FakeFactory::new());
        let mut target = RecordingTarget::new(800.0, 600.0);

        video.render(&mut target);
        video.render_scaled(&mut target, Vec2::ZERO, Vec2::new(800.0, 600.0));

        assert!(target.draws.is_empty());
    }

    #[test]
    fn test_invalid_source() {
        let video = Video::with_source(engine(), FakeFactory::new(), "missing.mp4");

        assert_eq!(video.size(), Resolution::ZERO);
        assert_eq!(video.time(), -1);
        assert_eq!(video.state(), PlaybackState::Unloaded);
        assert!(video.frame_bridge().is_none());
    }

    #[test]
    fn test_unknown_resolution_keeps_controls() {
        let engine = engine();
        let factory = FakeFactory::new();
        let mut video = Video::new(engine, factory);

        assert!(matches!(video.load("song.mp3"), Err(VideoError::UnknownResolution)));
        assert_eq!(video.size(), Resolution::ZERO);
        assert!(video.frame_bridge().is_none());
        assert_eq!(video.factory.created.get(), 0);

        video.play(false);
        assert_eq!(video.state(), PlaybackState::Playing);
        assert_eq!(video.time(), 0);

        let mut target = RecordingTarget::new(800.0, 600.0);
        video.render(&mut target);
        assert!(target.draws.is_empty());
    }

    #[test]
    fn test_texture_failure_unloads() {
        let engine = engine();
        let state = engine.state();
        let mut factory = FakeFactory::new();
        factory.max_dimension = 256;
        let mut video = Video::new(engine, factory);

        let err = video.load("clip.mp4").unwrap_err();
        assert!(matches!(err, VideoError::Render(RenderError::TextureTooLarge { .. })));
        assert_eq!(video.state(), PlaybackState::Unloaded);
        assert!(state.lock().callbacks.is_none());
    }

    #[test]
    fn test_decoded_frames_reach_texture() {
        let (mut video, state) = loaded(BufferMode::Single);
        let mut target = RecordingTarget::new(640.0, 360.0);

        video.play(false);
        assert!(FakeEngine::push_frame(&state, 42));
        video.render(&mut target);

        assert_eq!(target.last().first_byte, Some(42));
        assert_eq!(video.frame_bridge().unwrap().frames_written(), 1);
    }

    #[test]
    fn test_double_buffer_hides_unpresented_frame() {
        let (mut video, state) = loaded(BufferMode::Double);
        let mut target = RecordingTarget::new(640.0, 360.0);
        let callbacks = state.lock().callbacks.clone().unwrap();

        assert!(FakeEngine::push_frame(&state, 1));

        let mut frame = callbacks.acquire();
        frame.fill(2);
        let id = frame.id();
        callbacks.release(frame);

        video.render(&mut target);
        assert_eq!(target.last().first_byte, Some(1));

        callbacks.present(id);
        video.render(&mut target);
        assert_eq!(target.last().first_byte, Some(2));
    }

    #[test]
    fn test_reload_replaces_callbacks() {
        let (mut video, state) = loaded(BufferMode::Single);
        let first = state.lock().callbacks.clone().unwrap();

        video.set_buffer_mode(BufferMode::Double);
        video.reload().unwrap();

        let second = state.lock().callbacks.clone().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(video.frame_bridge().unwrap().mode(), BufferMode::Double);
        assert_eq!(video.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_drop_unregisters_callbacks() {
        let (mut video, state) = loaded(BufferMode::Single);
        video.play(false);
        drop(video);

        let state = state.lock();
        assert!(state.callbacks.is_none());
        assert!(!state.playing);
    }

    #[test]
    fn test_controls_pass_through() {
        let (mut video, _state) = loaded(BufferMode::Single);

        video.play(true);
        video.seek_time(3_000_000);
        video.skip_time(-1_000_000);
        assert_eq!(video.time(), 2_000_000);

        video.set_volume(40);
        assert_eq!(video.volume(), 40);
        video.mute(true);
        assert!(video.is_muted());

        video.pause(false);
        assert_eq!(video.state(), PlaybackState::Paused);
        video.stop();
        assert_eq!(video.state(), PlaybackState::Stopped);
    }
}
