//! The seam between the effect's orchestration and a GPU API.

use std::mem::ManuallyDrop;

use camblur_gpu_shared::uniforms::MotionBlurUniforms;

use crate::error::{MotionBlurError, Result};
use crate::exclusion::ExclusionCamera;
use crate::extent::{BufferLayout, Extent};
use crate::plan::{ShaderPass, Surface};
use crate::settings::TextureHandle;

/// What the device can do, probed once by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub depth_textures: bool,
    pub hdr_targets: bool,
    /// Two-channel half-float render targets (preferred velocity format).
    pub two_channel_half_float: bool,
    pub motion_blur_program: bool,
    pub velocity_clear_program: bool,
}

impl Capabilities {
    pub const FULL: Capabilities = Capabilities {
        depth_textures: true,
        hdr_targets: true,
        two_channel_half_float: true,
        motion_blur_program: true,
        velocity_clear_program: true,
    };

    /// Everything the effect cannot run without. The velocity-clear program
    /// is optional: without it excluded layers are simply not patched.
    pub fn check(&self) -> Result<()> {
        if !self.depth_textures {
            return Err(MotionBlurError::Unsupported("depth textures"));
        }
        if !self.hdr_targets {
            return Err(MotionBlurError::Unsupported("half-float render targets"));
        }
        if !self.motion_blur_program {
            return Err(MotionBlurError::Unsupported("motion blur shader program"));
        }
        Ok(())
    }

    pub fn velocity_format(&self) -> wgpu::TextureFormat {
        if self.two_channel_half_float {
            wgpu::TextureFormat::Rg16Float
        } else {
            wgpu::TextureFormat::Rgba16Float
        }
    }
}

/// One shader pass: read `input` (bound as the main texture), write `output`.
#[derive(Clone, Copy, Debug)]
pub struct PassRequest<'a> {
    pub pass: ShaderPass,
    pub input: Surface,
    pub output: Surface,
    pub uniforms: &'a MotionBlurUniforms,
    pub noise: Option<TextureHandle>,
}

/// Per-invocation temporaries, one per intermediate surface.
#[derive(Debug)]
pub struct FrameTemporaries<T> {
    pub velocity: T,
    pub tile_max: T,
    pub neighbour_max: T,
}

pub trait MotionBlurBackend {
    /// Host-provided per-invocation state: command recording, source,
    /// depth and destination images.
    type Frame;
    /// A pooled intermediate image.
    type Temporary;

    fn capabilities(&self) -> Capabilities;

    fn source_extent(&self, frame: &Self::Frame) -> Extent;

    fn acquire_temporary(
        &mut self,
        label: &'static str,
        extent: Extent,
        format: wgpu::TextureFormat,
    ) -> Self::Temporary;

    fn release_temporary(&mut self, temporary: Self::Temporary);

    fn run_pass(
        &mut self,
        frame: &mut Self::Frame,
        temporaries: &FrameTemporaries<Self::Temporary>,
        request: &PassRequest<'_>,
    );

    fn clear_temporary(&mut self, frame: &mut Self::Frame, temporary: &Self::Temporary);

    /// Draw the geometry of `camera.culling_mask` into `target` with the
    /// velocity-clear program, without clearing it first.
    fn render_excluded(
        &mut self,
        frame: &mut Self::Frame,
        camera: &ExclusionCamera,
        target: &Self::Temporary,
    );

    /// Copy source to destination unmodified.
    fn blit(&mut self, frame: &mut Self::Frame);
}

/// Owns the invocation's temporaries and hands them back to the backend
/// when dropped, on every exit path.
pub struct TemporaryGuard<'a, B: MotionBlurBackend> {
    backend: &'a mut B,
    temporaries: ManuallyDrop<FrameTemporaries<B::Temporary>>,
}

impl<'a, B: MotionBlurBackend> TemporaryGuard<'a, B> {
    pub fn acquire(backend: &'a mut B, layout: &BufferLayout, velocity_format: wgpu::TextureFormat) -> Self {
        let temporaries = FrameTemporaries {
            velocity: backend.acquire_temporary("Motion Blur Velocity Buffer", layout.velocity, velocity_format),
            tile_max: backend.acquire_temporary("Motion Blur Tile Max Buffer", layout.tile, velocity_format),
            neighbour_max: backend.acquire_temporary(
                "Motion Blur Neighbour Max Buffer",
                layout.tile,
                velocity_format,
            ),
        };
        Self { backend, temporaries: ManuallyDrop::new(temporaries) }
    }

    pub fn split(&mut self) -> (&mut B, &FrameTemporaries<B::Temporary>) {
        (&mut *self.backend, &self.temporaries)
    }
}

impl<B: MotionBlurBackend> Drop for TemporaryGuard<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `temporaries` is not touched again after this take; the
        // guard is being dropped.
        let FrameTemporaries { velocity, tile_max, neighbour_max } =
            unsafe { ManuallyDrop::take(&mut self.temporaries) };
        self.backend.release_temporary(velocity);
        self.backend.release_temporary(tile_max);
        self.backend.release_temporary(neighbour_max);
    }
}
