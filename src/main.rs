//! Play a video file or stream in a window
//!
//! Usage: video-bridge <file-or-uri>
//!
//! Frames are decoded by FFmpeg on a background thread, handed over through
//! the frame bridge and drawn letterboxed into the window every redraw.

use std::env;
use std::sync::Arc;

use glam::Vec2;
use video_bridge::engine::ffmpeg::FfmpegEngine;
use video_bridge::render::{fit_within, FrameTarget, RenderTarget, VideoRenderer, WgpuTextureFactory};
use video_bridge::settings::PlayerSettings;
use video_bridge::telemetry::{init_logging, LogConfig};
use video_bridge::video::{BufferMode, MediaSource, PlaybackState, Video};
use video_bridge::GpuContext;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Skip distance for the arrow keys, microseconds
const SKIP_US: i64 = 5_000_000;
const VOLUME_STEP: i32 = 5;

struct PlayerWindow {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Arc<VideoRenderer>,
    video: Video<FfmpegEngine, WgpuTextureFactory>,
    letterbox: bool,
}

impl PlayerWindow {
    fn new(window: Arc<Window>, source: &MediaSource, settings: &PlayerSettings) -> Result<Self, String> {
        let gpu = pollster::block_on(GpuContext::new(Arc::clone(&window), true)).map_err(|e| e.to_string())?;
        let renderer = Arc::new(VideoRenderer::new(&gpu.device, gpu.surface_format));
        let factory = WgpuTextureFactory::new(Arc::clone(&gpu.device), Arc::clone(&gpu.queue), Arc::clone(&renderer));

        let engine = FfmpegEngine::new().map_err(|e| format!("FFmpeg unavailable: {}", e))?;
        let mut video = Video::new(engine, factory).with_buffer_mode(settings.buffer_mode);
        video.set_volume(settings.volume);
        if settings.muted {
            video.mute(false);
        }

        match video.load(source.clone()) {
            Ok(resolution) => tracing::info!("Loaded {} at {}", source, resolution),
            Err(e) => tracing::error!("{}", e),
        }
        if settings.autoplay {
            video.play(false);
        }

        let player = Self {
            window,
            gpu,
            renderer,
            video,
            letterbox: settings.letterbox,
        };
        player.update_title();
        Ok(player)
    }

    fn update_title(&self) {
        let name = self
            .video
            .source()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "no media".to_string());
        let state = match self.video.state() {
            PlaybackState::Unloaded => "unloaded",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        };
        self.window.set_title(&format!(
            "Video Bridge - {} [{}, {}, vol {}{}]",
            name,
            state,
            self.video.buffer_mode().display_name(),
            self.video.volume(),
            if self.video.is_muted() { ", muted" } else { "" }
        ));
    }

    fn handle_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => self.video.play(true),
            KeyCode::KeyS => self.video.stop(),
            KeyCode::ArrowLeft => self.video.skip_time(-SKIP_US),
            KeyCode::ArrowRight => self.video.skip_time(SKIP_US),
            KeyCode::ArrowUp => {
                let volume = (self.video.volume() + VOLUME_STEP).min(100);
                self.video.set_volume(volume);
            }
            KeyCode::ArrowDown => {
                let volume = (self.video.volume() - VOLUME_STEP).max(0);
                self.video.set_volume(volume);
            }
            KeyCode::KeyM => self.video.mute(true),
            KeyCode::KeyD => {
                let mode = match self.video.buffer_mode() {
                    BufferMode::Single => BufferMode::Double,
                    BufferMode::Double => BufferMode::Single,
                };
                self.video.set_buffer_mode(mode);
                tracing::info!("Switched to {} (press R to reload)", mode.display_name());
            }
            KeyCode::KeyR => {
                let was_playing = self.video.state() == PlaybackState::Playing;
                match self.video.reload() {
                    Ok(resolution) => tracing::info!("Reloaded at {}", resolution),
                    Err(e) => tracing::error!("Reload failed: {}", e),
                }
                if was_playing {
                    self.video.play(false);
                }
            }
            _ => return,
        }
        self.update_title();
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.gpu.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let (width, height) = self.gpu.size();
        let mut target = FrameTarget::new(&self.renderer, &mut encoder, &view, width, height, true);
        let bounds = target.size();
        if self.letterbox {
            let (position, size) = fit_within(self.video.size(), bounds);
            self.video.render_scaled(&mut target, position, size);
        } else {
            self.video.render_scaled(&mut target, Vec2::ZERO, bounds);
        }
        target.finish();

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn remember(&self, settings: &mut PlayerSettings) {
        settings.buffer_mode = self.video.buffer_mode();
        settings.volume = self.video.volume();
        settings.muted = self.video.is_muted();
        let size = self.window.inner_size();
        settings.window_width = size.width.max(1);
        settings.window_height = size.height.max(1);
    }
}

struct App {
    source: MediaSource,
    settings: PlayerSettings,
    player: Option<PlayerWindow>,
    error: Option<String>,
}

impl App {
    fn new(source: MediaSource, settings: PlayerSettings) -> Self {
        Self {
            source,
            settings,
            player: None,
            error: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.player.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title("Video Bridge")
            .with_inner_size(LogicalSize::new(self.settings.window_width, self.settings.window_height));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.error = Some(format!("Failed to create window: {}", e));
                event_loop.exit();
                return;
            }
        };

        match PlayerWindow::new(window, &self.source, &self.settings) {
            Ok(player) => self.player = Some(player),
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
                return;
            }
        }

        tracing::info!("Controls: SPACE play/pause, S stop, LEFT/RIGHT skip 5s, UP/DOWN volume, M mute");
        tracing::info!("          D switch buffer mode, R reload, ESC quit");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(player) = &mut self.player else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() && !event.repeat {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        player.handle_key(key, event_loop);
                    }
                }
            }
            WindowEvent::Resized(size) => {
                player.gpu.resize(size);
            }
            WindowEvent::RedrawRequested => {
                match player.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        player.gpu.reconfigure();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        self.error = Some("GPU out of memory".to_string());
                        event_loop.exit();
                    }
                    Err(e) => tracing::warn!("Render error: {:?}", e),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(player) = &self.player {
            player.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        let Some(player) = self.player.take() else {
            return;
        };
        player.remember(&mut self.settings);

        if let Some(path) = PlayerSettings::default_path() {
            if let Err(e) = self.settings.save_to_file(&path) {
                tracing::warn!("Failed to save settings: {}", e);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = PlayerSettings::load_or_default(None);
    let _log_guard = init_logging(&LogConfig::from_settings(&settings))?;

    let Some(location) = env::args().nth(1) else {
        eprintln!("Usage: video-bridge <file-or-uri>");
        std::process::exit(1);
    };
    let source = MediaSource::parse(&location);
    if let Some(path) = source.as_path() {
        if !path.exists() {
            eprintln!("Error: File not found: {}", path.display());
            std::process::exit(1);
        }
    }

    tracing::info!("Opening: {}", source);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(source, settings);
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
