//! Recording render target for tests

use std::cell::Cell;

use glam::Vec2;

use super::{FrameTexture, RenderError, RenderTarget, Sprite, TextureFactory};
use crate::video::Resolution;

pub struct FakeTexture {
    size: Resolution,
    pub uploads: u32,
    pub pixels: Vec<u8>,
}

impl FrameTexture for FakeTexture {
    fn size(&self) -> Resolution {
        self.size
    }

    fn update(&mut self, pixels: &[u8]) {
        assert_eq!(pixels.len(), self.size.byte_len(), "upload size mismatch");
        self.uploads += 1;
        self.pixels.clear();
        self.pixels.extend_from_slice(pixels);
    }
}

pub struct FakeFactory {
    pub max_dimension: u32,
    pub created: Cell<u32>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self {
            max_dimension: 8192,
            created: Cell::new(0),
        }
    }
}

impl TextureFactory for FakeFactory {
    type Texture = FakeTexture;

    fn create_texture(&self, resolution: Resolution) -> Result<FakeTexture, RenderError> {
        if resolution.width > self.max_dimension || resolution.height > self.max_dimension {
            return Err(RenderError::TextureTooLarge {
                requested: resolution,
                max: self.max_dimension,
            });
        }
        self.created.set(self.created.get() + 1);
        Ok(FakeTexture {
            size: resolution,
            uploads: 0,
            pixels: Vec::new(),
        })
    }
}

/// One recorded draw call
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub sprite: Sprite,
    pub texture_size: Resolution,
    /// First byte of the texture at draw time
    pub first_byte: Option<u8>,
}

pub struct RecordingTarget {
    pub size: Vec2,
    pub draws: Vec<DrawCall>,
}

impl RecordingTarget {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            draws: Vec::new(),
        }
    }

    pub fn last(&self) -> &DrawCall {
        self.draws.last().expect("no draw recorded")
    }
}

impl RenderTarget for RecordingTarget {
    type Texture = FakeTexture;

    fn size(&self) -> Vec2 {
        self.size
    }

    fn draw(&mut self, texture: &FakeTexture, sprite: &Sprite) {
        self.draws.push(DrawCall {
            sprite: *sprite,
            texture_size: texture.size,
            first_byte: texture.pixels.first().copied(),
        });
    }
}
