//! Off-screen device for running the effect without a window, plus texture
//! upload and readback helpers.

use std::sync::Arc;

use crate::backend::{GPUTexture, RenderTarget, WgpuMotionBlurBackend};
use crate::error::{Result, WgpuBackendError};
use crate::render_targets::{self, DEPTH_FORMAT};

pub struct HeadlessContext {
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl HeadlessContext {
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(WgpuBackendError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Camera Motion Blur Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))?;

        log::info!(
            "Headless device initialized: {} ({})",
            adapter.get_info().name,
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    pub fn create_backend(&self, output_format: wgpu::TextureFormat) -> Result<WgpuMotionBlurBackend> {
        WgpuMotionBlurBackend::new(self.device.clone(), self.queue.clone(), &self.adapter, output_format)
    }

    /// Upload tightly packed RGBA8 pixels.
    pub fn upload_rgba8(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        pixels: &[u8],
    ) -> Result<GPUTexture> {
        render_targets::create_texture_with_data(&self.device, &self.queue, label, width, height, format, pixels, 4)
    }

    pub fn create_target(&self, label: &str, width: u32, height: u32, format: wgpu::TextureFormat) -> RenderTarget {
        render_targets::create_render_target(&self.device, width, height, label, format)
    }

    /// Depth texture filled with a constant device depth.
    pub fn create_constant_depth(&self, label: &str, width: u32, height: u32, depth: f32) -> GPUTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Depth Fill"),
        });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Depth Fill Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        GPUTexture {
            texture,
            view,
            width,
            height,
        }
    }

    /// Read back a 4-byte-per-pixel texture as tightly packed rows.
    pub fn read_rgba8(&self, texture: &wgpu::Texture, width: u32, height: u32) -> Result<Vec<u8>> {
        const BYTES_PER_PIXEL: u32 = 4;
        let padded = padded_bytes_per_row(width, BYTES_PER_PIXEL);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| WgpuBackendError::ReadbackDisconnected)??;

        let pixels = {
            let mapped = slice.get_mapped_range();
            strip_row_padding(&mapped, width, height, BYTES_PER_PIXEL, padded)
        };
        buffer.unmap();
        Ok(pixels)
    }
}

/// Row pitch rounded up to `COPY_BYTES_PER_ROW_ALIGNMENT`.
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

pub fn strip_row_padding(data: &[u8], width: u32, height: u32, bytes_per_pixel: u32, padded: u32) -> Vec<u8> {
    let row = (width * bytes_per_pixel) as usize;
    data.chunks(padded as usize)
        .take(height as usize)
        .flat_map(|chunk| &chunk[..row])
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_row() {
        assert_eq!(padded_bytes_per_row(64, 4), 256);
        assert_eq!(padded_bytes_per_row(65, 4), 512);
        assert_eq!(padded_bytes_per_row(1, 4), 256);
    }

    #[test]
    fn test_strip_row_padding() {
        let padded = 256;
        let mut data = vec![0u8; padded as usize * 2];
        data[0..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[256..264].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);
        let pixels = strip_row_padding(&data, 2, 2, 4, padded);
        assert_eq!(pixels, (1..=16).collect::<Vec<u8>>());
    }
}
