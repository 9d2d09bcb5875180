//! Render-target capability and the wgpu implementation of it
//!
//! A [`Video`](crate::video::Video) only needs three things from the
//! renderer: a factory that creates textures at load time, textures that
//! accept a full RGBA upload, and a target that draws a texture as a
//! [`Sprite`]. The wgpu implementation lives in [`texture`] and [`renderer`].

#[cfg(test)]
pub(crate) mod fake;
mod renderer;
mod texture;

pub use renderer::{FrameTarget, VideoRenderer, WgpuTextureFactory};
pub use texture::VideoTexture;

use glam::Vec2;
use thiserror::Error;

use crate::video::Resolution;

/// Errors from creating GPU resources
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Cannot create a texture of size {0}")]
    EmptyTexture(Resolution),
    #[error("Texture size {requested} exceeds device limit of {max} pixels per side")]
    TextureTooLarge { requested: Resolution, max: u32 },
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Surface reports no supported texture formats")]
    NoSurfaceFormat,
    #[error("Failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
}

/// Creates textures matching a video's native resolution.
pub trait TextureFactory {
    type Texture: FrameTexture;

    fn create_texture(&self, resolution: Resolution) -> Result<Self::Texture, RenderError>;
}

/// A GPU texture that receives whole RGBA frames.
pub trait FrameTexture {
    fn size(&self) -> Resolution;

    /// Replace the full texture contents with `pixels` (`width * height * 4` bytes).
    fn update(&mut self, pixels: &[u8]);
}

/// Something textures can be drawn onto.
pub trait RenderTarget {
    type Texture;

    /// Target size in pixels
    fn size(&self) -> Vec2;

    fn draw(&mut self, texture: &Self::Texture, sprite: &Sprite);
}

/// Placement of a texture on a render target, in target pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    /// Top-left corner
    pub position: Vec2,
    pub scale: Vec2,
    /// Size of the texture being drawn
    pub texture_size: Vec2,
}

impl Sprite {
    pub fn new(position: Vec2, scale: Vec2, texture_size: Vec2) -> Self {
        Self {
            position,
            scale,
            texture_size,
        }
    }

    /// Size of the drawn quad on the target
    pub fn destination_size(&self) -> Vec2 {
        self.texture_size * self.scale
    }
}

/// Quad placement in clip space, matching `QuadParams` in video_quad.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadParams {
    /// Top-left corner in NDC (y up)
    pub origin: [f32; 2],
    /// Width and height in NDC units
    pub extent: [f32; 2],
}

impl Default for QuadParams {
    /// The whole target.
    fn default() -> Self {
        Self {
            origin: [-1.0, 1.0],
            extent: [2.0, 2.0],
        }
    }
}

impl QuadParams {
    /// Convert a sprite in pixel space to clip space for a target of the given size.
    pub fn from_sprite(sprite: &Sprite, target_width: f32, target_height: f32) -> Self {
        let size = sprite.destination_size();
        Self {
            origin: [
                sprite.position.x / target_width * 2.0 - 1.0,
                1.0 - sprite.position.y / target_height * 2.0,
            ],
            extent: [size.x / target_width * 2.0, size.y / target_height * 2.0],
        }
    }
}

/// Largest aspect-preserving placement of `native` inside `bounds`, centered.
///
/// Returns `(position, size)`. Unknown resolutions and empty bounds give zero size.
pub fn fit_within(native: Resolution, bounds: Vec2) -> (Vec2, Vec2) {
    if !native.is_known() || bounds.x <= 0.0 || bounds.y <= 0.0 {
        return (Vec2::ZERO, Vec2::ZERO);
    }

    let native = native.as_vec2();
    let scale = (bounds.x / native.x).min(bounds.y / native.y);
    let size = native * scale;
    ((bounds - size) * 0.5, size)
}
