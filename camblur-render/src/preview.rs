//! Synthetic previous-frame data for previewing blur strength on a static
//! camera. Nothing here touches the temporal tracker.

use glam::{Mat4, Vec3, Vec4};

use crate::camera::CameraView;

/// Scale applied to the preview displacement before offsetting the camera.
pub const PREVIEW_OFFSET_SCALE: f32 = 0.25;

/// Current view-projection with the world shifted by a quarter of `displacement`.
pub fn previous_view_proj(camera: &CameraView, displacement: Vec3) -> Mat4 {
    let offset = Mat4::from_translation(displacement * PREVIEW_OFFSET_SCALE);
    camera.gpu_projection() * camera.world_to_camera() * offset
}

/// Packed blur vector for the camera-motion filter while previewing.
pub fn blur_direction(displacement: Vec3, fov_y_degrees: f32) -> Vec4 {
    Vec4::new(displacement.y, displacement.x, 0.0, displacement.z) * 0.5 * fov_y_degrees
}
