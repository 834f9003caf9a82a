//! Effect parameters, written by the authoring side and read once per frame.

use glam::Vec3;

use crate::error::{MotionBlurError, Result};

/// Largest blur radius the composite programs sample, in velocity-buffer pixels.
/// Also the tile side length of the tile-max buffer.
pub const MAX_RADIUS: u32 = camblur_gpu_shared::shaders::MAX_RADIUS;

/// Lower bound applied to `soft_z_distance` before it reaches the shader.
pub const MIN_SOFT_Z_DISTANCE: f32 = 0.001;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MotionBlurFilter {
    /// Global screen blur derived from camera motion, no velocity buffer.
    CameraMotion = 0,
    /// Cheap gather along each pixel's velocity, no dilation.
    LocalBlur = 1,
    /// Tile-dilated reconstruction filter.
    #[default]
    Reconstruction = 2,
}

impl MotionBlurFilter {
    pub fn uses_velocity_buffer(self) -> bool {
        !matches!(self, MotionBlurFilter::CameraMotion)
    }
}

/// Renderable layer bitfield (32 layers).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub fn layer(index: u8) -> Self {
        LayerMask(1u32.checked_shl(index as u32).unwrap_or(0))
    }

    pub fn has(self, index: u8) -> bool {
        self.intersects(LayerMask::layer(index))
    }

    pub fn set(&mut self, index: u8) {
        self.0 |= LayerMask::layer(index).0;
    }

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Opaque handle of a texture registered with a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub struct MotionBlurSettings {
    pub filter: MotionBlurFilter,
    /// Show the blur a given movement would produce, without real camera motion.
    pub preview: bool,
    pub preview_scale: Vec3,

    pub movement_scale: f32,
    pub rotation_scale: f32,
    /// Maximum velocity in velocity-buffer pixels.
    pub max_velocity: f32,
    /// Minimum velocity in velocity-buffer pixels; anything slower is not blurred.
    pub min_velocity: f32,
    pub velocity_scale: f32,
    /// Soft depth overlap distance, reconstruction filter only.
    pub soft_z_distance: f32,
    /// Velocity buffer resolution divisor.
    pub velocity_downsample: u32,
    pub exclude_layers: LayerMask,
    pub noise_texture: Option<TextureHandle>,

    pub show_velocity: bool,
    pub show_velocity_scale: f32,

    /// Apply the `MAX_RADIUS` clamp to the local blur filter as well.
    pub clamp_local_blur: bool,
}

impl Default for MotionBlurSettings {
    fn default() -> Self {
        Self {
            filter: MotionBlurFilter::Reconstruction,
            preview: false,
            preview_scale: Vec3::ONE,
            movement_scale: 0.0,
            rotation_scale: 1.0,
            max_velocity: 8.0,
            min_velocity: 0.1,
            velocity_scale: 0.375,
            soft_z_distance: 0.01,
            velocity_downsample: 1,
            exclude_layers: LayerMask::NONE,
            noise_texture: None,
            show_velocity: false,
            show_velocity_scale: 1.0,
            clamp_local_blur: false,
        }
    }
}

impl MotionBlurSettings {
    /// Whether `max_velocity` is bounded by `MAX_RADIUS` for the current filter.
    pub fn clamps_max_velocity(&self) -> bool {
        match self.filter {
            MotionBlurFilter::Reconstruction => true,
            MotionBlurFilter::LocalBlur => self.clamp_local_blur,
            MotionBlurFilter::CameraMotion => false,
        }
    }

    /// Clamp out-of-range values in place. Returns true if anything changed.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = false;

        if self.velocity_downsample < 1 {
            log::debug!("velocity_downsample {} clamped to 1", self.velocity_downsample);
            self.velocity_downsample = 1;
            changed = true;
        }

        let max_radius = MAX_RADIUS as f32;
        if self.clamps_max_velocity() && self.max_velocity > max_radius {
            log::debug!("max_velocity {} clamped to {max_radius}", self.max_velocity);
            self.max_velocity = max_radius;
            changed = true;
        }

        changed
    }

    pub fn effective_soft_z_distance(&self) -> f32 {
        self.soft_z_distance.max(MIN_SOFT_Z_DISTANCE)
    }

    /// Reject values no clamp can repair (NaN / infinite scalars).
    pub fn validate(&self) -> Result<()> {
        let scalars = [
            ("movement_scale", self.movement_scale),
            ("rotation_scale", self.rotation_scale),
            ("max_velocity", self.max_velocity),
            ("min_velocity", self.min_velocity),
            ("velocity_scale", self.velocity_scale),
            ("soft_z_distance", self.soft_z_distance),
            ("show_velocity_scale", self.show_velocity_scale),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(MotionBlurError::InvalidSettings(format!("{name} is {value}")));
            }
        }
        if !self.preview_scale.is_finite() {
            return Err(MotionBlurError::InvalidSettings("preview_scale is not finite".into()));
        }
        Ok(())
    }
}
