use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::field::FrameUniforms;
use crate::types::SurfaceAlpha;

use super::context::GpuContext;
use super::pipeline::GlowPipeline;
use super::uniforms::GlowUniforms;

pub(crate) struct GpuState {
    context: GpuContext,
    pipeline: GlowPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uploaded: Option<GlowUniforms>,
    frames_since_stats: u32,
    last_stats: Instant,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        surface_alpha: SurfaceAlpha,
        num_stops: usize,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, surface_alpha)?;
        let pipeline = GlowPipeline::new(&context.device, context.surface_format, num_stops);

        let uniform_buffer =
            context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("glow uniform buffer"),
                    contents: bytemuck::bytes_of(&<GlowUniforms as bytemuck::Zeroable>::zeroed()),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("glow uniform bind group"),
                layout: &pipeline.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        tracing::info!(
            width = context.size.width,
            height = context.size.height,
            format = ?context.surface_format,
            num_stops,
            "GPU surface ready"
        );

        Ok(Self {
            context,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uploaded: None,
            frames_since_stats: 0,
            last_stats: Instant::now(),
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Uploads `frame` (when it changed) and presents one frame.
    pub(crate) fn render(&mut self, frame: &FrameUniforms) -> Result<(), wgpu::SurfaceError> {
        let surface_texture = self.context.surface.get_current_texture()?;

        let block = GlowUniforms::from_frame(frame);
        if self.uploaded != Some(block) {
            self.context
                .queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&block));
            self.uploaded = Some(block);
        }

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("glow encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glow pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        self.record_stats(frame);
        Ok(())
    }

    fn record_stats(&mut self, frame: &FrameUniforms) {
        self.frames_since_stats += 1;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_stats);
        if elapsed >= Duration::from_secs(1) {
            debug!(
                fps = (self.frames_since_stats as f32 / elapsed.as_secs_f32()).round(),
                mix = frame.mix,
                width = self.context.size.width,
                height = self.context.size.height,
                "render stats"
            );
            self.frames_since_stats = 0;
            self.last_stats = now;
        }
    }
}
