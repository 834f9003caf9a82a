//! Transient render targets reused across frames.

use std::collections::HashMap;
use std::sync::Arc;

use camblur_render::Extent;

/// Frames an idle texture survives in the pool.
pub const MAX_AGE: u64 = 60;

/// Key for texture pool lookup
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct TextureKey {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureKey {
    /// Sampled render target of `extent` and `format`.
    pub fn render_target(extent: Extent, format: wgpu::TextureFormat) -> Self {
        Self {
            width: extent.width.max(1),
            height: extent.height.max(1),
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        }
    }

    pub fn to_descriptor<'a>(&self, label: Option<&'a str>) -> wgpu::TextureDescriptor<'a> {
        wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: self.usage,
            view_formats: &[],
        }
    }
}

pub struct PooledTexture {
    pub key: TextureKey,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

struct IdleTexture {
    texture: PooledTexture,
    last_used: u64,
}

pub fn is_stale(last_used: u64, current_frame: u64) -> bool {
    current_frame.saturating_sub(last_used) >= MAX_AGE
}

/// Pool for reusing textures
pub struct TexturePool {
    device: Arc<wgpu::Device>,
    available: HashMap<TextureKey, Vec<IdleTexture>>,
}

impl TexturePool {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            available: HashMap::new(),
        }
    }

    /// Acquire a texture from the pool (or create new one)
    pub fn acquire(&mut self, label: &str, key: TextureKey) -> PooledTexture {
        if let Some(idle) = self.available.get_mut(&key).and_then(Vec::pop) {
            log::trace!("Reusing pooled texture {:?}", key);
            return idle.texture;
        }

        log::debug!("Creating pooled texture '{label}' {:?}", key);
        let texture = self.device.create_texture(&key.to_descriptor(Some(label)));
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        PooledTexture { key, texture, view }
    }

    /// Release a texture back to the pool
    pub fn release(&mut self, texture: PooledTexture, frame: u64) {
        self.available
            .entry(texture.key)
            .or_default()
            .push(IdleTexture { texture, last_used: frame });
    }

    /// Drop idle textures not used for `MAX_AGE` frames.
    pub fn cleanup_old(&mut self, current_frame: u64) {
        self.available.retain(|_key, textures| {
            textures.retain(|idle| !is_stale(idle.last_used, current_frame));
            !textures.is_empty()
        });
    }
}
