use camblur_render::MotionBlurError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WgpuBackendError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("texture readback failed: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),

    #[error("texture readback channel closed")]
    ReadbackDisconnected,

    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u32),

    #[error("texture of {width}x{height} is too large to upload")]
    TextureTooLarge { width: u32, height: u32 },

    #[error("texture data size mismatch: expected {expected} bytes, got {actual}")]
    TextureDataSize { expected: usize, actual: usize },

    #[error(transparent)]
    MotionBlur(#[from] MotionBlurError),
}

pub type Result<T> = std::result::Result<T, WgpuBackendError>;
