//! GPU texture for video frames
//!
//! Each texture carries its own quad uniform buffer and bind group so a draw
//! only has to write the placement and record the pass.

use std::sync::Arc;

use super::renderer::VideoRenderer;
use super::{FrameTexture, QuadParams};
use crate::video::Resolution;

/// A GPU texture at a video's native resolution
pub struct VideoTexture {
    texture: wgpu::Texture,
    /// Quad placement uniform
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    queue: Arc<wgpu::Queue>,
    size: Resolution,
}

impl VideoTexture {
    /// Gamma-corrected RGBA, matching the bridge's pixel layout
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(
        device: &wgpu::Device,
        queue: Arc<wgpu::Queue>,
        renderer: &VideoRenderer,
        size: Resolution,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Video Texture"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Video Quad Params"),
            size: std::mem::size_of::<QuadParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&QuadParams::default()));

        let bind_group = renderer.create_bind_group(device, &view, &params_buffer);

        log::debug!("Created video texture {}", size);

        Self {
            texture,
            params_buffer,
            bind_group,
            queue,
            size,
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Set where the next draw of this texture lands.
    ///
    /// Takes effect at the next queue submit, so only the last placement
    /// written before a submit is used for every draw in that submit.
    pub fn write_params(&self, params: &QuadParams) {
        self.queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));
    }
}

impl FrameTexture for VideoTexture {
    fn size(&self) -> Resolution {
        self.size
    }

    fn update(&mut self, pixels: &[u8]) {
        if pixels.len() != self.size.byte_len() {
            log::warn!(
                "Skipping upload of {} bytes into {} texture (expected {})",
                pixels.len(),
                self.size,
                self.size.byte_len()
            );
            return;
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.size.stride() as u32),
                rows_per_image: Some(self.size.height),
            },
            wgpu::Extent3d {
                width: self.size.width,
                height: self.size.height,
                depth_or_array_layers: 1,
            },
        );
    }
}
