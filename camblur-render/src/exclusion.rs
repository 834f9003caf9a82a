//! Auxiliary camera that re-renders excluded layers into the velocity buffer
//! with a zero-velocity program, so those objects are never blurred.

use glam::Mat4;

use crate::backend::MotionBlurBackend;
use crate::camera::CameraView;
use crate::settings::LayerMask;

/// Exclusion camera for `main_camera` is named `_<main_camera>_MotionBlurTmpCam`.
pub fn exclusion_camera_name(main_camera: &str) -> String {
    format!("_{main_camera}_MotionBlurTmpCam")
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExclusionCamera {
    pub name: String,
    /// Mirrors the main camera's transform and projection every frame.
    pub view: CameraView,
    /// Never rendered by the host on its own; only on demand by the effect.
    pub enabled: bool,
    pub depth_texture: bool,
    pub clears_target: bool,
    pub culling_mask: LayerMask,
}

impl ExclusionCamera {
    fn new(name: String, main: &CameraView) -> Self {
        Self {
            name,
            view: main.clone(),
            enabled: false,
            depth_texture: false,
            clears_target: false,
            culling_mask: LayerMask::NONE,
        }
    }

    fn mirror(&mut self, main: &CameraView) {
        self.view.clone_from(main);
        self.view.name.clone_from(&self.name);
    }

    pub fn view_proj(&self) -> Mat4 {
        self.view.view_proj()
    }
}

/// Lazily created, reused across frames, destroyed when the effect is disabled.
#[derive(Debug, Default)]
pub struct ExclusionCameraProxy {
    camera: Option<ExclusionCamera>,
    created: u32,
}

impl ExclusionCameraProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(&self) -> Option<&ExclusionCamera> {
        self.camera.as_ref()
    }

    /// Number of times the auxiliary camera has been constructed.
    pub fn created_count(&self) -> u32 {
        self.created
    }

    /// Find the camera for `main` or create it, then sync it to `main`.
    pub fn acquire(&mut self, main: &CameraView) -> &mut ExclusionCamera {
        let name = exclusion_camera_name(&main.name);
        if self.camera.as_ref().is_some_and(|camera| camera.name != name) {
            self.camera = None;
        }
        if self.camera.is_none() {
            log::debug!("creating exclusion camera '{name}'");
            self.created += 1;
        }
        let camera = self
            .camera
            .get_or_insert_with(|| ExclusionCamera::new(name, main));
        camera.mirror(main);
        camera
    }

    /// Render `mask` into `velocity` with zero velocity. Returns whether
    /// anything was drawn.
    pub fn patch<B: MotionBlurBackend>(
        &mut self,
        backend: &mut B,
        frame: &mut B::Frame,
        velocity: &B::Temporary,
        main: &CameraView,
        mask: LayerMask,
    ) -> bool {
        if mask.is_empty() {
            return false;
        }
        if !backend.capabilities().velocity_clear_program {
            log::warn!("velocity clear program unavailable; excluded layers not patched");
            return false;
        }
        let camera = self.acquire(main);
        camera.culling_mask = mask;
        backend.render_excluded(frame, camera, velocity);
        true
    }

    pub fn destroy(&mut self) {
        if let Some(camera) = self.camera.take() {
            log::debug!("destroying exclusion camera '{}'", camera.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Capabilities, MotionBlurBackend};
    use crate::extent::Extent;
    use crate::testing::{Event, RecordingBackend};
    use glam::{Quat, Vec3};

    fn main_camera(name: &str) -> CameraView {
        CameraView::perspective(name, Vec3::ZERO, Quat::IDENTITY, 60.0, 1.0, 0.1, 100.0)
    }

    #[test]
    fn test_name() {
        assert_eq!(exclusion_camera_name("Main Camera"), "_Main Camera_MotionBlurTmpCam");
    }

    #[test]
    fn test_empty_mask_never_constructs() {
        let mut backend = RecordingBackend::new(Extent::new(16, 16));
        let velocity = backend.acquire_temporary("v", Extent::new(16, 16), wgpu::TextureFormat::Rg16Float);
        let mut proxy = ExclusionCameraProxy::new();
        for _ in 0..3 {
            assert!(!proxy.patch(&mut backend, &mut (), &velocity, &main_camera("main"), LayerMask::NONE));
        }
        assert!(proxy.camera().is_none());
        assert_eq!(proxy.created_count(), 0);
        assert!(!backend.events.iter().any(|e| matches!(e, Event::Excluded { .. })));
    }

    #[test]
    fn test_reused_across_frames() {
        let mut backend = RecordingBackend::new(Extent::new(16, 16));
        let velocity = backend.acquire_temporary("v", Extent::new(16, 16), wgpu::TextureFormat::Rg16Float);
        let mut proxy = ExclusionCameraProxy::new();
        let mut main = main_camera("main");
        assert!(proxy.patch(&mut backend, &mut (), &velocity, &main, LayerMask::layer(2)));
        main.position = Vec3::new(1.0, 0.0, 0.0);
        assert!(proxy.patch(&mut backend, &mut (), &velocity, &main, LayerMask::layer(2)));
        assert_eq!(proxy.created_count(), 1);

        let camera = proxy.camera().expect("camera created");
        assert_eq!(camera.view.position, main.position);
        assert_eq!(camera.culling_mask, LayerMask::layer(2));
        assert!(!camera.enabled && !camera.depth_texture && !camera.clears_target);
    }

    #[test]
    fn test_renamed_main_camera_recreates() {
        let mut proxy = ExclusionCameraProxy::new();
        proxy.acquire(&main_camera("a"));
        let camera = proxy.acquire(&main_camera("b"));
        assert_eq!(camera.name, "_b_MotionBlurTmpCam");
        assert_eq!(proxy.created_count(), 2);
    }

    #[test]
    fn test_skipped_without_clear_program() {
        let mut backend = RecordingBackend::new(Extent::new(16, 16));
        backend.capabilities = Capabilities { velocity_clear_program: false, ..Capabilities::FULL };
        let velocity = backend.acquire_temporary("v", Extent::new(16, 16), wgpu::TextureFormat::Rg16Float);
        let mut proxy = ExclusionCameraProxy::new();
        assert!(!proxy.patch(&mut backend, &mut (), &velocity, &main_camera("main"), LayerMask::ALL));
        assert!(proxy.camera().is_none());
    }

    #[test]
    fn test_destroy() {
        let mut proxy = ExclusionCameraProxy::new();
        proxy.acquire(&main_camera("main"));
        proxy.destroy();
        assert!(proxy.camera().is_none());
    }
}
