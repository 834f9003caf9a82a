//! Render target and texture creation for the motion blur passes.

use crate::backend::{GPUTexture, RenderTarget};
use crate::error::{Result, WgpuBackendError};

/// HDR color format; also the velocity fallback format.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Depth format.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Two-channel float format (velocity buffer).
pub const RG16_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;
/// Format of uploaded 8-bit textures (noise, default).
pub const RGBA8_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Whether `format` can be both rendered to and sampled on this adapter.
pub fn is_renderable(adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> bool {
    adapter
        .get_texture_format_features(format)
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING)
}

/// Create a render target with a specific format.
pub fn create_render_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    label: &str,
    format: wgpu::TextureFormat,
) -> RenderTarget {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let color_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

    RenderTarget {
        color_texture,
        color_view,
        width,
        height,
    }
}

/// Byte length of `width * height` pixels of `channels` bytes each.
pub fn texture_data_len(width: u32, height: u32, channels: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(channels as usize))
        .ok_or(WgpuBackendError::TextureTooLarge { width, height })
}

/// Widen 1-, 3- or 4-channel 8-bit pixels to RGBA. `pixels` must hold whole pixels.
pub fn expand_to_rgba(pixels: &[u8], channels: u32) -> Result<Vec<u8>> {
    if !matches!(channels, 1 | 3 | 4) {
        return Err(WgpuBackendError::UnsupportedChannels(channels));
    }
    let stride = channels as usize;
    if pixels.len() % stride != 0 {
        return Err(WgpuBackendError::TextureDataSize {
            expected: pixels.len().next_multiple_of(stride),
            actual: pixels.len(),
        });
    }

    Ok(match channels {
        4 => pixels.to_vec(),
        3 => pixels
            .chunks_exact(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
            .collect(),
        _ => pixels.iter().flat_map(|&g| [g, g, g, 255]).collect(),
    })
}

/// Upload 8-bit pixel data into a sampled texture.
pub fn create_texture_with_data(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    pixels: &[u8],
    channels: u32,
) -> Result<GPUTexture> {
    let expected = texture_data_len(width, height, channels)?;
    if pixels.len() != expected {
        return Err(WgpuBackendError::TextureDataSize {
            expected,
            actual: pixels.len(),
        });
    }
    let data = expand_to_rgba(pixels, channels)?;
    let bytes_per_row = width
        .checked_mul(4)
        .ok_or(WgpuBackendError::TextureTooLarge { width, height })?;

    let texture_size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: texture_size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_row),
            rows_per_image: Some(height),
        },
        texture_size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    Ok(GPUTexture {
        texture,
        view,
        width,
        height,
    })
}

/// 1x1 white texture bound wherever a pass has nothing to read.
pub fn create_default_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<GPUTexture> {
    create_texture_with_data(device, queue, "Default Texture", 1, 1, RGBA8_FORMAT, &[255; 4], 4)
}

/// Clamp-to-edge linear sampler shared by the fullscreen passes.
pub fn create_linear_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Motion Blur Linear Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
