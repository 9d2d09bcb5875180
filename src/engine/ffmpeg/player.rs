//! Background-threaded FFmpeg player
//!
//! Each play session runs a decode thread that paces frames at the stream's
//! frame rate and writes them through the registered [`FrameCallbacks`].
//! Control calls only touch shared atomics; the thread picks them up between
//! frames.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::decoder::StreamDecoder;
use super::FfmpegMedia;
use crate::engine::{EngineError, EngineMedia, EnginePlayer, FrameCallbacks, VideoFormat};
use crate::video::MediaSource;

const NO_SEEK: i64 = i64::MIN;

/// Shared state between decode thread and control thread
struct SharedState {
    /// Whether the decode thread should keep going
    running: AtomicBool,
    /// Whether playback is paused
    paused: AtomicBool,
    /// The stream ran out of frames
    ended: AtomicBool,
    /// Seek target in microseconds, `NO_SEEK` when none is pending
    seek_to: AtomicI64,
    /// Presentation time of the last frame, microseconds
    time_us: AtomicI64,
    volume: AtomicI32,
    muted: AtomicBool,
    /// Size the decode thread is producing (0 until it has opened the stream)
    output_width: AtomicU32,
    output_height: AtomicU32,
    /// Held for a whole acquire/release/present sequence
    callbacks: Mutex<Option<Arc<dyn FrameCallbacks>>>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            seek_to: AtomicI64::new(NO_SEEK),
            time_us: AtomicI64::new(0),
            volume: AtomicI32::new(100),
            muted: AtomicBool::new(false),
            output_width: AtomicU32::new(0),
            output_height: AtomicU32::new(0),
            callbacks: Mutex::new(None),
        }
    }

    /// After end of stream the next session starts over, unless a seek is pending.
    fn rewind_if_ended(&self) {
        if self.ended.swap(false, Ordering::AcqRel) && self.seek_to.load(Ordering::Acquire) == NO_SEEK {
            self.time_us.store(0, Ordering::Release);
        }
    }

    fn reset_output_size(&self) {
        self.output_width.store(0, Ordering::Release);
        self.output_height.store(0, Ordering::Release);
    }
}

/// FFmpeg player; volume and mute are kept as state only (no audio output).
pub struct FfmpegPlayer {
    /// Shared state with decode thread
    state: Arc<SharedState>,
    /// Decode thread handle
    thread_handle: Option<JoinHandle<()>>,
    source: Option<MediaSource>,
    format: Option<VideoFormat>,
}

impl FfmpegPlayer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SharedState::new()),
            thread_handle: None,
            source: None,
            format: None,
        }
    }

    fn is_thread_alive(&self) -> bool {
        self.thread_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn join_thread(&mut self) {
        self.state.running.store(false, Ordering::Release);
        // Wake up thread if it's sleeping
        self.state.paused.store(false, Ordering::Release);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!("Failed to join decode thread: {:?}", e);
            }
        }
    }

    /// Background decode loop
    fn decode_loop(state: Arc<SharedState>, location: String, format: Option<VideoFormat>) {
        // Open decoder in this thread
        let mut decoder = match StreamDecoder::open(&location, format) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!("Failed to open video in decode thread: {}", e);
                state.ended.store(true, Ordering::Release);
                state.running.store(false, Ordering::Release);
                return;
            }
        };

        let output = decoder.output_format();
        tracing::info!(
            "Decoding {} with {} at {:.2} fps into {}x{}",
            location,
            decoder.codec_name(),
            decoder.frame_rate(),
            output.width,
            output.height
        );
        state.output_width.store(output.width, Ordering::Release);
        state.output_height.store(output.height, Ordering::Release);

        let frame_duration = Duration::from_secs_f64(1.0 / decoder.frame_rate());
        let mut next_frame_time = Instant::now();

        while state.running.load(Ordering::Acquire) {
            let target = state.seek_to.swap(NO_SEEK, Ordering::AcqRel);
            if target != NO_SEEK {
                if let Err(e) = decoder.seek(target) {
                    tracing::warn!("Seek to {}us failed: {}", target, e);
                }
                next_frame_time = Instant::now();
            }

            if state.paused.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(10));
                next_frame_time = Instant::now();
                continue;
            }

            // Wait until next frame time (only if we're ahead of schedule)
            let now = Instant::now();
            if now < next_frame_time {
                let sleep_time = next_frame_time - now;
                if sleep_time > Duration::from_micros(500) {
                    thread::sleep(sleep_time - Duration::from_micros(500));
                }
                while Instant::now() < next_frame_time {
                    std::hint::spin_loop();
                }
            }

            match decoder.next_frame() {
                Ok(Some(pts_us)) => {
                    // A seek requested during decode owns the reported time
                    if state.seek_to.load(Ordering::Acquire) == NO_SEEK {
                        state.time_us.store(pts_us, Ordering::Release);
                    }

                    let callbacks = state.callbacks.lock();
                    if let Some(callbacks) = callbacks.as_ref() {
                        let mut frame = callbacks.acquire();
                        decoder.copy_into(&mut frame);
                        let id = frame.id();
                        callbacks.release(frame);
                        callbacks.present(id);
                    }
                }
                Ok(None) => {
                    tracing::debug!("End of stream");
                    state.ended.store(true, Ordering::Release);
                    break;
                }
                Err(e) => {
                    tracing::error!("Decode error: {}", e);
                }
            }

            // Schedule next frame
            next_frame_time += frame_duration;

            // If we fell behind, reset to now (don't try to catch up)
            let now = Instant::now();
            if next_frame_time < now {
                next_frame_time = now;
            }
        }

        state.running.store(false, Ordering::Release);
        tracing::debug!("Decode thread stopped");
    }
}

impl Default for FfmpegPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl EnginePlayer for FfmpegPlayer {
    type Media = FfmpegMedia;

    fn set_media(&mut self, media: &FfmpegMedia) -> Result<(), EngineError> {
        self.stop();
        self.state.reset_output_size();
        self.source = Some(media.source().clone());
        Ok(())
    }

    fn clear_media(&mut self) {
        self.stop();
        self.state.reset_output_size();
        self.source = None;
    }

    fn output_size(&self, output: u32) -> Option<(u32, u32)> {
        if output != 0 {
            return None;
        }
        let width = self.state.output_width.load(Ordering::Acquire);
        let height = self.state.output_height.load(Ordering::Acquire);
        (width > 0 && height > 0).then_some((width, height))
    }

    fn set_format(&mut self, format: VideoFormat) {
        self.format = Some(format);
    }

    fn set_callbacks(&mut self, callbacks: Arc<dyn FrameCallbacks>) {
        *self.state.callbacks.lock() = Some(callbacks);
    }

    fn clear_callbacks(&mut self) {
        // Waits for a frame write in progress to finish
        *self.state.callbacks.lock() = None;
    }

    fn play(&mut self) -> Result<(), EngineError> {
        let location = self.source.as_ref().map(MediaSource::location).ok_or(EngineError::NoMedia)?;

        if self.is_thread_alive() {
            self.state.paused.store(false, Ordering::Release);
            return Ok(());
        }

        self.state.rewind_if_ended();
        self.join_thread();

        let state = Arc::clone(&self.state);
        let format = self.format;
        tracing::info!("Playing {}", location);
        state.paused.store(false, Ordering::Release);
        state.running.store(true, Ordering::Release);

        let handle = thread::Builder::new()
            .name("video-decode".to_string())
            .spawn(move || Self::decode_loop(state, location, format))
            .map_err(|e| EngineError::Playback(format!("Failed to spawn decode thread: {}", e)))?;
        self.thread_handle = Some(handle);
        Ok(())
    }

    fn set_pause(&mut self, paused: bool) {
        if self.is_thread_alive() {
            self.state.paused.store(paused, Ordering::Release);
        }
    }

    fn stop(&mut self) {
        self.join_thread();
        self.state.ended.store(false, Ordering::Release);
        self.state.seek_to.store(NO_SEEK, Ordering::Release);
        self.state.time_us.store(0, Ordering::Release);
    }

    fn can_pause(&self) -> bool {
        self.source.is_some()
    }

    fn has_ended(&self) -> bool {
        self.state.ended.load(Ordering::Acquire)
    }

    fn time(&self) -> Option<i64> {
        self.source.as_ref().map(|_| self.state.time_us.load(Ordering::Acquire))
    }

    fn set_time(&mut self, micros: i64) {
        if self.source.is_none() {
            return;
        }
        let micros = micros.max(0);
        self.state.time_us.store(micros, Ordering::Release);
        self.state.seek_to.store(micros, Ordering::Release);
    }

    fn volume(&self) -> i32 {
        self.state.volume.load(Ordering::Acquire)
    }

    fn set_volume(&mut self, volume: i32) -> Result<(), EngineError> {
        self.state.volume.store(volume, Ordering::Release);
        Ok(())
    }

    fn is_muted(&self) -> bool {
        self.state.muted.load(Ordering::Acquire)
    }

    fn set_mute(&mut self, muted: bool) {
        self.state.muted.store(muted, Ordering::Release);
    }
}

impl Drop for FfmpegPlayer {
    fn drop(&mut self) {
        self.join_thread();
    }
}
