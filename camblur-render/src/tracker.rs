//! Previous-frame camera state used to reproject the current frame.

use glam::{Mat4, Vec3};

use crate::camera::{CameraBasis, CameraView};

/// Fraction of the way the remembered position moves toward the current one
/// at the start of each camera-motion frame.
pub const POSITION_BLEND: f32 = 0.75;

#[derive(Clone, Debug)]
pub struct TemporalCameraTracker {
    previous_view_proj: Mat4,
    previous_basis: CameraBasis,
    previous_position: Vec3,
    last_committed_frame: Option<u64>,
    was_active: bool,
}

impl Default for TemporalCameraTracker {
    fn default() -> Self {
        Self {
            previous_view_proj: Mat4::IDENTITY,
            previous_basis: CameraBasis::WORLD,
            previous_position: Vec3::ZERO,
            last_committed_frame: None,
            was_active: false,
        }
    }
}

impl TemporalCameraTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// GPU-adjusted projection times world-to-camera. Pure.
    pub fn compute_current(camera: &CameraView) -> Mat4 {
        camera.view_proj()
    }

    /// Overwrite the previous-frame state with `camera`, so the next
    /// reprojection sees no motion.
    pub fn remember(&mut self, camera: &CameraView) {
        self.previous_view_proj = Self::compute_current(camera);
        self.previous_basis = camera.basis();
        self.previous_position = camera.position;
    }

    /// Remember the current frame once per distinct frame index.
    /// Returns false if `frame_index` was already committed.
    pub fn commit(&mut self, frame_index: u64, camera: &CameraView) -> bool {
        if self.last_committed_frame == Some(frame_index) {
            return false;
        }
        self.remember(camera);
        self.last_committed_frame = Some(frame_index);
        true
    }

    /// Smooth the remembered position toward `position` (camera-motion filter).
    pub fn start_frame(&mut self, position: Vec3) {
        self.previous_position = self.previous_position.lerp(position, POSITION_BLEND);
    }

    /// Track activity; on an inactive -> active transition, remember the
    /// current frame and return true.
    pub fn resync_if_reactivated(&mut self, active: bool, camera: &CameraView) -> bool {
        let reactivated = active && !self.was_active;
        if reactivated {
            log::debug!("motion blur history resynced for camera '{}'", camera.name);
            self.remember(camera);
        }
        self.was_active = active;
        reactivated
    }

    pub fn deactivate(&mut self) {
        self.was_active = false;
    }

    pub fn previous_view_proj(&self) -> Mat4 {
        self.previous_view_proj
    }

    pub fn previous_basis(&self) -> CameraBasis {
        self.previous_basis
    }

    pub fn previous_position(&self) -> Vec3 {
        self.previous_position
    }

    pub fn last_committed_frame(&self) -> Option<u64> {
        self.last_committed_frame
    }
}
