//! Analytic blur vector for the camera-motion filter, derived from how the
//! camera's axes and position changed since the last committed frame.
//!
//! Packed as (x = pitch, y = yaw, z = yaw while looking down, w = forward),
//! in source pixels.

use glam::{Vec3, Vec4};

use crate::camera::{CameraBasis, WORLD_UP};

/// Displacements and movement scales at or below this are treated as zero.
pub const MOVEMENT_EPSILON: f32 = f32::MIN_POSITIVE;

const ROTATION_PIXELS_PER_WIDTH: f32 = 0.75;
const MOVEMENT_PIXELS_PER_WIDTH: f32 = 0.5;

/// Angle between two vectors in degrees, in [0, 180].
/// Identical (or zero) vectors give exactly 0.
pub fn angle_degrees(a: Vec3, b: Vec3) -> f32 {
    if a == b {
        return 0.0;
    }
    let denominator = (a.length_squared() * b.length_squared()).sqrt();
    if denominator <= f32::MIN_POSITIVE {
        return 0.0;
    }
    let cos = (a.dot(b) / denominator).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

#[derive(Clone, Copy, Debug)]
pub struct CameraMotionInput {
    pub basis: CameraBasis,
    pub previous_basis: CameraBasis,
    pub position: Vec3,
    pub previous_position: Vec3,
    pub fov_y_degrees: f32,
    pub source_width: u32,
    pub rotation_scale: f32,
    pub movement_scale: f32,
}

pub fn blur_direction(input: &CameraMotionInput) -> Vec4 {
    let width = input.source_width as f32;
    let fov = input.fov_y_degrees.max(f32::MIN_POSITIVE);
    let CameraBasis { forward, right, up } = input.basis;

    let look_up_down = up.dot(WORLD_UP);
    let pitch = angle_degrees(up, input.previous_basis.up) / fov * width * ROTATION_PIXELS_PER_WIDTH;
    let yaw = angle_degrees(forward, input.previous_basis.forward) / fov
        * width
        * ROTATION_PIXELS_PER_WIDTH;

    let mut blur = Vec4::new(
        input.rotation_scale * pitch,
        input.rotation_scale * look_up_down * yaw,
        input.rotation_scale * (1.0 - look_up_down) * yaw,
        0.0,
    );

    let displacement = input.previous_position - input.position;
    if displacement.length() > MOVEMENT_EPSILON && input.movement_scale > MOVEMENT_EPSILON {
        let movement = input.movement_scale * width * MOVEMENT_PIXELS_PER_WIDTH;
        blur.w = movement * forward.dot(displacement).clamp(0.0, 1.0);
        blur.x += movement * up.dot(displacement).clamp(0.0, 1.0);
        blur.y += movement * right.dot(displacement).clamp(0.0, 1.0);
    }

    blur
}
