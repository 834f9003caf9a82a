//! wgpu implementation of [`camblur_render::MotionBlurBackend`]: shader
//! pipelines, pooled intermediate targets and a headless device for
//! offline rendering.

pub mod backend;
pub mod error;
pub mod handle;
pub mod headless;
pub mod passes;
pub mod pipeline;
pub mod pool;
pub mod render_targets;

pub use backend::{
    probe_capabilities, FrameInputs, GPUMesh, GPUTexture, LayerDraw, MeshHandle, RenderTarget, WgpuFrame,
    WgpuMotionBlurBackend,
};
pub use error::{Result, WgpuBackendError};
pub use headless::HeadlessContext;
pub use pool::{PooledTexture, TextureKey, TexturePool};
