use glam::{Mat4, Quat, Vec3, Vec4};

use crate::settings::LayerMask;

/// World up axis.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Depth range of a projection matrix's clip space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClipDepth {
    /// z in [0, 1] (wgpu, D3D, Metal, Vulkan).
    #[default]
    ZeroToOne,
    /// z in [-1, 1] (OpenGL convention).
    NegativeOneToOne,
}

/// Remap `projection` to the GPU's [0, 1] clip depth.
pub fn gpu_projection(projection: Mat4, clip_depth: ClipDepth) -> Mat4 {
    match clip_depth {
        ClipDepth::ZeroToOne => projection,
        ClipDepth::NegativeOneToOne => {
            // z' = 0.5 * z + 0.5 * w
            let remap = Mat4::from_cols(
                Vec4::X,
                Vec4::Y,
                Vec4::new(0.0, 0.0, 0.5, 0.0),
                Vec4::new(0.0, 0.0, 0.5, 1.0),
            );
            remap * projection
        }
    }
}

/// Orthonormal camera axes in world space. Forward is -Z, right +X, up +Y
/// in camera-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl CameraBasis {
    pub const WORLD: CameraBasis = CameraBasis {
        forward: Vec3::NEG_Z,
        right: Vec3::X,
        up: Vec3::Y,
    };

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            forward: rotation * Vec3::NEG_Z,
            right: rotation * Vec3::X,
            up: rotation * Vec3::Y,
        }
    }
}

impl Default for CameraBasis {
    fn default() -> Self {
        Self::WORLD
    }
}

/// The rendering camera as seen by the effect for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraView {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub projection: Mat4,
    pub clip_depth: ClipDepth,
    pub fov_y_degrees: f32,
    pub culling_mask: LayerMask,
}

impl CameraView {
    /// Right-handed perspective camera with [0, 1] clip depth.
    pub fn perspective(
        name: impl Into<String>,
        position: Vec3,
        rotation: Quat,
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            rotation,
            scale: Vec3::ONE,
            projection: Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            clip_depth: ClipDepth::ZeroToOne,
            fov_y_degrees,
            culling_mask: LayerMask::ALL,
        }
    }

    pub fn world_to_camera(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn gpu_projection(&self) -> Mat4 {
        gpu_projection(self.projection, self.clip_depth)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.gpu_projection() * self.world_to_camera()
    }

    pub fn basis(&self) -> CameraBasis {
        CameraBasis::from_rotation(self.rotation)
    }
}
