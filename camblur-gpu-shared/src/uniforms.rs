use bytemuck::{Pod, Zeroable};

/// Motion blur uniform block. Matches `MotionBlurUniforms` in motion_blur.wgsl,
/// bind group 0, binding 0. Shared by every shader pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MotionBlurUniforms {
    pub inv_view_proj: [[f32; 4]; 4],
    pub prev_view_proj: [[f32; 4]; 4],
    /// `prev_view_proj * inv_view_proj`, precomputed once per frame.
    pub to_prev_view_proj: [[f32; 4]; 4],
    /// Packed global blur vector (pass 6 only): x = pitch, y = yaw, z = yaw when looking down, w = forward.
    pub blur_direction: [f32; 4],
    /// (width, height, 1/width, 1/height) of the velocity buffer.
    pub vel_buffer_size: [f32; 4],
    /// (width, height, 1/width, 1/height) of the tile-max / neighbour-max buffers.
    pub tile_buffer_size: [f32; 4],
    pub max_velocity: f32,
    pub min_velocity: f32,
    pub velocity_scale: f32,
    pub soft_z_distance: f32,
    pub display_velocity_scale: f32,
    pub has_noise: u32,
    pub _pad1: f32,
    pub _pad2: f32,
}

impl MotionBlurUniforms {
    /// Pack (w, h, 1/w, 1/h) the way the shaders expect buffer sizes.
    pub fn size_vector(width: u32, height: u32) -> [f32; 4] {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        [w, h, 1.0 / w, 1.0 / h]
    }
}

/// Per-draw data for the exclusion (velocity clear) pass.
/// Padded to 256 bytes so draws can share one buffer with dynamic offsets.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ExclusionDrawUniforms {
    pub model_view_proj: [[f32; 4]; 4],
    pub _alignment_pad: [[f32; 4]; 12],
}

/// Dynamic offset stride of [`ExclusionDrawUniforms`].
pub const EXCLUSION_DRAW_STRIDE: u64 = std::mem::size_of::<ExclusionDrawUniforms>() as u64;
