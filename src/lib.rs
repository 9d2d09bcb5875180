//! Video Bridge Library
//!
//! Decodes video through a pluggable engine, hands decoded RGBA frames across
//! threads through a single or double buffered frame bridge, and draws them
//! as textured quads at native size, at an offset or scaled.

pub mod engine;
pub mod gpu_context;
pub mod render;
pub mod settings;
pub mod shaders;
pub mod telemetry;
pub mod video;

pub use engine::{DecodeEngine, EngineError, EngineMedia, EnginePlayer, FrameCallbacks, FrameId, FrameLock, TrackInfo, TrackKind, VideoFormat};
pub use gpu_context::GpuContext;
pub use render::{fit_within, FrameTarget, FrameTexture, QuadParams, RenderError, RenderTarget, Sprite, TextureFactory, VideoRenderer, VideoTexture, WgpuTextureFactory};
pub use settings::{PlayerSettings, SettingsError};
pub use video::{BufferMode, DecoderHandle, FrameBridge, FrameBuffer, MediaSource, PlaybackState, Resolution, Video, VideoError};
