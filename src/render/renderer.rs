//! Video quad pipeline and the wgpu render target
//!
//! `VideoRenderer` owns the pipeline shared by every video texture.
//! `WgpuTextureFactory` hands out textures bound to it and `FrameTarget`
//! records draws into a command encoder for one frame.

use std::sync::Arc;

use glam::Vec2;

use super::texture::VideoTexture;
use super::{QuadParams, RenderError, RenderTarget, Sprite, TextureFactory};
use crate::shaders::VIDEO_QUAD_SHADER;
use crate::video::Resolution;

/// Render pipeline for drawing video textures as positioned quads
pub struct VideoRenderer {
    pipeline: wgpu::RenderPipeline,
    /// Bind group layout for video texture + sampler + params
    bind_group_layout: wgpu::BindGroupLayout,
    /// Sampler for video texture filtering
    sampler: wgpu::Sampler,
}

impl VideoRenderer {
    /// Create a new video renderer
    ///
    /// # Arguments
    /// * `device` - The wgpu device
    /// * `output_format` - The format of the render target (e.g., surface format)
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Video Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(VIDEO_QUAD_SHADER.into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Video Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Video Bind Group Layout"),
            entries: &[
                // Texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Quad placement
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<QuadParams>() as u64),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Video Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Video Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            sampler,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Bind a texture view and its placement uniform to this pipeline.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        view: &wgpu::TextureView,
        params_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Video Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Record one quad draw into `encoder`.
    ///
    /// # Arguments
    /// * `encoder` - Command encoder for recording render commands
    /// * `output_view` - The texture view to render to
    /// * `bind_group` - The bind group of the video texture being drawn
    /// * `clear` - Whether to clear the output before rendering
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
        clear: bool,
    ) {
        let load_op = if clear {
            wgpu::LoadOp::Clear(wgpu::Color::BLACK)
        } else {
            wgpu::LoadOp::Load
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Video Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        // Two triangles, corners generated in the vertex shader
        render_pass.draw(0..6, 0..1);
    }
}

/// Creates [`VideoTexture`]s for a [`VideoRenderer`]
#[derive(Clone)]
pub struct WgpuTextureFactory {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    renderer: Arc<VideoRenderer>,
}

impl WgpuTextureFactory {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, renderer: Arc<VideoRenderer>) -> Self {
        Self {
            device,
            queue,
            renderer,
        }
    }
}

impl TextureFactory for WgpuTextureFactory {
    type Texture = VideoTexture;

    fn create_texture(&self, resolution: Resolution) -> Result<VideoTexture, RenderError> {
        if !resolution.is_known() {
            return Err(RenderError::EmptyTexture(resolution));
        }

        let max = self.device.limits().max_texture_dimension_2d;
        if resolution.width > max || resolution.height > max {
            return Err(RenderError::TextureTooLarge {
                requested: resolution,
                max,
            });
        }

        Ok(VideoTexture::new(
            &self.device,
            Arc::clone(&self.queue),
            &self.renderer,
            resolution,
        ))
    }
}

/// Draws video textures into one output view for one frame
pub struct FrameTarget<'a> {
    renderer: &'a VideoRenderer,
    encoder: &'a mut wgpu::CommandEncoder,
    view: &'a wgpu::TextureView,
    width: u32,
    height: u32,
    clear: bool,
}

impl<'a> FrameTarget<'a> {
    /// `clear` makes the first draw clear the output to black.
    pub fn new(
        renderer: &'a VideoRenderer,
        encoder: &'a mut wgpu::CommandEncoder,
        view: &'a wgpu::TextureView,
        width: u32,
        height: u32,
        clear: bool,
    ) -> Self {
        Self {
            renderer,
            encoder,
            view,
            width,
            height,
            clear,
        }
    }

    /// Clear the output when nothing was drawn.
    pub fn finish(self) {
        if self.clear {
            let _ = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Video Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
    }
}

impl RenderTarget for FrameTarget<'_> {
    type Texture = VideoTexture;

    fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    fn draw(&mut self, texture: &VideoTexture, sprite: &Sprite) {
        if self.width == 0 || self.height == 0 {
            return;
        }

        let params = QuadParams::from_sprite(sprite, self.width as f32, self.height as f32);
        texture.write_params(&params);
        self.renderer.render(&mut *self.encoder, self.view, texture.bind_group(), self.clear);
        self.clear = false;
    }
}
