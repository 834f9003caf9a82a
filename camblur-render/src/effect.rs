//! Per-frame orchestration of the camera motion blur effect.

use glam::{Mat4, Vec4};

use camblur_gpu_shared::uniforms::MotionBlurUniforms;

use crate::backend::{MotionBlurBackend, PassRequest, TemporaryGuard};
use crate::camera::CameraView;
use crate::camera_motion::{self, CameraMotionInput};
use crate::error::{MotionBlurError, Result};
use crate::exclusion::ExclusionCameraProxy;
use crate::extent::BufferLayout;
use crate::plan::{Composite, FramePlan, Step};
use crate::preview;
use crate::settings::{MotionBlurFilter, MotionBlurSettings};
use crate::tracker::TemporalCameraTracker;

/// Inputs the host pipeline must provide once the effect is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnableRequirements {
    pub depth_texture: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PassThroughReason {
    Disabled,
    Unsupported(MotionBlurError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Rendered(Composite),
    PassThrough(PassThroughReason),
}

/// What one invocation did.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub outcome: FrameOutcome,
    pub layout: Option<BufferLayout>,
    pub steps: Vec<Step>,
    pub uniforms: Option<MotionBlurUniforms>,
    pub resynced: bool,
    pub committed: bool,
    pub excluded_layers_patched: bool,
}

impl FrameReport {
    fn pass_through(reason: PassThroughReason) -> Self {
        Self {
            outcome: FrameOutcome::PassThrough(reason),
            layout: None,
            steps: Vec::new(),
            uniforms: None,
            resynced: false,
            committed: false,
            excluded_layers_patched: false,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.outcome, FrameOutcome::Rendered(_))
    }
}

pub struct CameraMotionBlur {
    pub settings: MotionBlurSettings,
    tracker: TemporalCameraTracker,
    exclusion: ExclusionCameraProxy,
    enabled: bool,
    unsupported_reported: bool,
}

impl CameraMotionBlur {
    pub fn new(settings: MotionBlurSettings) -> Self {
        Self {
            settings,
            tracker: TemporalCameraTracker::new(),
            exclusion: ExclusionCameraProxy::new(),
            enabled: true,
            unsupported_reported: false,
        }
    }

    pub fn on_enable(&mut self) -> EnableRequirements {
        self.enabled = true;
        EnableRequirements { depth_texture: true }
    }

    /// Tear down the exclusion camera; the next enabled frame resyncs history.
    pub fn on_disable(&mut self) {
        self.enabled = false;
        self.tracker.deactivate();
        self.exclusion.destroy();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn tracker(&self) -> &TemporalCameraTracker {
        &self.tracker
    }

    pub fn exclusion(&self) -> &ExclusionCameraProxy {
        &self.exclusion
    }

    /// Check device support, warning once per unsupported streak.
    pub fn check_resources<B: MotionBlurBackend>(&mut self, backend: &B) -> Result<()> {
        match backend.capabilities().check() {
            Ok(()) => {
                self.unsupported_reported = false;
                Ok(())
            }
            Err(err) => {
                if !self.unsupported_reported {
                    log::warn!("camera motion blur disabled: {err}");
                    self.unsupported_reported = true;
                }
                Err(err)
            }
        }
    }

    /// Composite one frame from `frame`'s source into its destination.
    pub fn render<B: MotionBlurBackend>(
        &mut self,
        backend: &mut B,
        frame: &mut B::Frame,
        camera: &CameraView,
        frame_index: u64,
    ) -> FrameReport {
        if !self.enabled {
            backend.blit(frame);
            return FrameReport::pass_through(PassThroughReason::Disabled);
        }

        let layout = BufferLayout::new(backend.source_extent(frame), self.settings.velocity_downsample.max(1));
        let velocity_format = backend.capabilities().velocity_format();
        let mut guard = TemporaryGuard::acquire(backend, &layout, velocity_format);
        let (backend, temporaries) = guard.split();

        if let Err(err) = self.check_resources(backend) {
            backend.blit(frame);
            return FrameReport::pass_through(PassThroughReason::Unsupported(err));
        }

        self.settings.sanitize();
        let settings = &self.settings;
        let previewing = settings.preview;

        if settings.filter == MotionBlurFilter::CameraMotion && !previewing {
            self.tracker.start_frame(camera.position);
        }

        let current = TemporalCameraTracker::compute_current(camera);
        // Preview frames count as inactive, so leaving preview resyncs.
        let resynced = self.tracker.resync_if_reactivated(!previewing, camera);

        let previous = if previewing {
            preview::previous_view_proj(camera, settings.preview_scale)
        } else {
            self.tracker.previous_view_proj()
        };

        let blur_direction = match (settings.filter, previewing) {
            (MotionBlurFilter::CameraMotion, true) => {
                preview::blur_direction(settings.preview_scale, camera.fov_y_degrees)
            }
            (MotionBlurFilter::CameraMotion, false) => camera_motion::blur_direction(&CameraMotionInput {
                basis: camera.basis(),
                previous_basis: self.tracker.previous_basis(),
                position: camera.position,
                previous_position: self.tracker.previous_position(),
                fov_y_degrees: camera.fov_y_degrees,
                source_width: layout.source.width,
                rotation_scale: settings.rotation_scale,
                movement_scale: settings.movement_scale,
            }),
            _ => Vec4::ZERO,
        };

        let uniforms = build_uniforms(settings, current, previous, blur_direction, &layout);
        let plan = FramePlan::build(settings);
        log::trace!("motion blur frame {frame_index}: {:?}", plan.steps);

        let mut excluded_layers_patched = false;
        for step in &plan.steps {
            match *step {
                Step::Pass { pass, input, output } => backend.run_pass(
                    frame,
                    temporaries,
                    &PassRequest {
                        pass,
                        input,
                        output,
                        uniforms: &uniforms,
                        noise: settings.noise_texture,
                    },
                ),
                Step::ClearVelocity => backend.clear_temporary(frame, &temporaries.velocity),
                Step::PatchExcludedLayers => {
                    excluded_layers_patched = self.exclusion.patch(
                        backend,
                        frame,
                        &temporaries.velocity,
                        camera,
                        settings.exclude_layers,
                    );
                }
            }
        }

        let committed = !previewing && self.tracker.commit(frame_index, camera);

        FrameReport {
            outcome: FrameOutcome::Rendered(plan.composite),
            layout: Some(layout),
            steps: plan.steps,
            uniforms: Some(uniforms),
            resynced,
            committed,
            excluded_layers_patched,
        }
    }
}

impl Default for CameraMotionBlur {
    fn default() -> Self {
        Self::new(MotionBlurSettings::default())
    }
}

fn build_uniforms(
    settings: &MotionBlurSettings,
    current: Mat4,
    previous: Mat4,
    blur_direction: Vec4,
    layout: &BufferLayout,
) -> MotionBlurUniforms {
    let inv_view_proj = current.inverse();
    MotionBlurUniforms {
        inv_view_proj: inv_view_proj.to_cols_array_2d(),
        prev_view_proj: previous.to_cols_array_2d(),
        to_prev_view_proj: (previous * inv_view_proj).to_cols_array_2d(),
        blur_direction: blur_direction.to_array(),
        vel_buffer_size: MotionBlurUniforms::size_vector(layout.velocity.width, layout.velocity.height),
        tile_buffer_size: MotionBlurUniforms::size_vector(layout.tile.width, layout.tile.height),
        max_velocity: settings.max_velocity,
        min_velocity: settings.min_velocity,
        velocity_scale: settings.velocity_scale,
        soft_z_distance: settings.effective_soft_z_distance(),
        display_velocity_scale: settings.show_velocity_scale,
        has_noise: settings.noise_texture.is_some() as u32,
        _pad1: 0.0,
        _pad2: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Capabilities;
    use crate::extent::Extent;
    use crate::plan::{ShaderPass, Surface};
    use crate::settings::{LayerMask, TextureHandle};
    use crate::testing::{Event, RecordingBackend};
    use glam::{Quat, Vec3};

    fn camera_at(position: Vec3, yaw_degrees: f32) -> CameraView {
        CameraView::perspective(
            "Main Camera",
            position,
            Quat::from_rotation_y(yaw_degrees.to_radians()),
            60.0,
            16.0 / 9.0,
            0.3,
            1000.0,
        )
    }

    fn mat(m: [[f32; 4]; 4]) -> Mat4 {
        Mat4::from_cols_array_2d(&m)
    }

    fn assert_mat_near(a: Mat4, b: Mat4) {
        assert!(a.abs_diff_eq(b, 1e-4), "{a:?}\n!=\n{b:?}");
    }

    #[test]
    fn test_enable_requests_depth() {
        let mut effect = CameraMotionBlur::default();
        assert_eq!(effect.on_enable(), EnableRequirements { depth_texture: true });
    }

    #[test]
    fn test_reconstruction_1080p_end_to_end() {
        let mut backend = RecordingBackend::new(Extent::new(1920, 1080));
        let mut effect = CameraMotionBlur::default();
        let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 1);

        assert_eq!(report.outcome, FrameOutcome::Rendered(Composite::Reconstruction));
        let layout = report.layout.expect("layout");
        assert_eq!(layout.velocity, Extent::new(1920, 1080));
        assert_eq!(layout.tile, Extent::new(240, 135));
        assert_eq!(
            backend.temporary("Motion Blur Velocity Buffer").map(|t| t.extent),
            Some(Extent::new(1920, 1080))
        );
        assert_eq!(
            backend.temporary("Motion Blur Neighbour Max Buffer").map(|t| t.extent),
            Some(Extent::new(240, 135))
        );
        assert_eq!(
            backend.passes(),
            vec![
                ShaderPass::Velocity,
                ShaderPass::TileMax,
                ShaderPass::NeighbourMax,
                ShaderPass::Reconstruction
            ]
        );
        let last = backend.events.last().expect("events");
        assert!(matches!(
            last,
            Event::Pass { pass: ShaderPass::Reconstruction, output: Surface::Destination, .. }
        ));
        assert!(backend.live.is_empty());
    }

    #[test]
    fn test_velocity_buffer_extent_downsampled() {
        let mut backend = RecordingBackend::new(Extent::new(1279, 719));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            velocity_downsample: 4,
            ..Default::default()
        });
        let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        let layout = report.layout.expect("layout");
        assert_eq!(layout.velocity, Extent::new(320, 180));
        assert_eq!(layout.tile, Extent::new(40, 23));

        let uniforms = report.uniforms.expect("uniforms");
        assert_eq!(uniforms.vel_buffer_size[0], 320.0);
        assert_eq!(uniforms.tile_buffer_size[1], 23.0);
    }

    #[test]
    fn test_max_velocity_clamped_before_upload() {
        let mut backend = RecordingBackend::new(Extent::new(640, 480));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            max_velocity: 50.0,
            velocity_downsample: 0,
            ..Default::default()
        });
        let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        assert_eq!(report.uniforms.map(|u| u.max_velocity), Some(8.0));
        assert_eq!(effect.settings.velocity_downsample, 1);

        let mut local = CameraMotionBlur::new(MotionBlurSettings {
            filter: MotionBlurFilter::LocalBlur,
            max_velocity: 50.0,
            ..Default::default()
        });
        let report = local.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        assert_eq!(report.uniforms.map(|u| u.max_velocity), Some(50.0));
    }

    #[test]
    fn test_show_velocity_writes_debug_view() {
        for filter in [
            MotionBlurFilter::Reconstruction,
            MotionBlurFilter::LocalBlur,
            MotionBlurFilter::CameraMotion,
        ] {
            let mut backend = RecordingBackend::new(Extent::new(320, 240));
            let mut effect = CameraMotionBlur::new(MotionBlurSettings {
                filter,
                show_velocity: true,
                ..Default::default()
            });
            let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
            assert_eq!(report.outcome, FrameOutcome::Rendered(Composite::DebugVelocity));

            let destination_writers: Vec<_> = backend
                .events
                .iter()
                .filter_map(|e| match e {
                    Event::Pass { pass, output: Surface::Destination, .. } => Some(*pass),
                    _ => None,
                })
                .collect();
            assert_eq!(destination_writers, vec![ShaderPass::DebugVelocity], "{filter:?}");
        }
    }

    #[test]
    fn test_first_frame_suppresses_blur() {
        let mut backend = RecordingBackend::new(Extent::new(320, 240));
        let mut effect = CameraMotionBlur::default();
        let camera = camera_at(Vec3::new(3.0, 1.0, 0.0), 20.0);
        let report = effect.render(&mut backend, &mut (), &camera, 0);
        assert!(report.resynced);
        let uniforms = report.uniforms.expect("uniforms");
        assert_mat_near(mat(uniforms.prev_view_proj), camera.view_proj());
        assert_mat_near(mat(uniforms.to_prev_view_proj), Mat4::IDENTITY);
    }

    #[test]
    fn test_moving_camera_reprojects_from_previous_frame() {
        let mut backend = RecordingBackend::new(Extent::new(320, 240));
        let mut effect = CameraMotionBlur::default();
        let a = camera_at(Vec3::ZERO, 0.0);
        let b = camera_at(Vec3::new(0.5, 0.0, 0.0), 5.0);
        effect.render(&mut backend, &mut (), &a, 0);
        let report = effect.render(&mut backend, &mut (), &b, 1);
        assert!(!report.resynced);
        assert!(report.committed);
        let uniforms = report.uniforms.expect("uniforms");
        assert_mat_near(mat(uniforms.prev_view_proj), a.view_proj());
        assert_mat_near(mat(uniforms.inv_view_proj), b.view_proj().inverse());
        assert_eq!(effect.tracker().previous_view_proj(), b.view_proj());
    }

    #[test]
    fn test_second_camera_same_frame_does_not_commit() {
        let mut backend = RecordingBackend::new(Extent::new(320, 240));
        let mut effect = CameraMotionBlur::default();
        let a = camera_at(Vec3::ZERO, 0.0);
        let b = camera_at(Vec3::new(10.0, 0.0, 0.0), 45.0);
        assert!(effect.render(&mut backend, &mut (), &a, 4).committed);
        assert!(!effect.render(&mut backend, &mut (), &b, 4).committed);
        assert_eq!(effect.tracker().previous_view_proj(), a.view_proj());
    }

    #[test]
    fn test_disable_then_enable_resyncs() {
        let mut backend = RecordingBackend::new(Extent::new(320, 240));
        let mut effect = CameraMotionBlur::default();
        effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        effect.render(&mut backend, &mut (), &camera_at(Vec3::X, 10.0), 1);

        effect.on_disable();
        let skipped = effect.render(&mut backend, &mut (), &camera_at(Vec3::Y, 20.0), 2);
        assert_eq!(skipped.outcome, FrameOutcome::PassThrough(PassThroughReason::Disabled));
        assert_eq!(backend.events.last(), Some(&Event::Blit));

        effect.on_enable();
        let c = camera_at(Vec3::new(0.0, 0.0, 9.0), 90.0);
        let report = effect.render(&mut backend, &mut (), &c, 3);
        assert!(report.resynced);
        let uniforms = report.uniforms.expect("uniforms");
        assert_mat_near(mat(uniforms.to_prev_view_proj), Mat4::IDENTITY);
    }

    #[test]
    fn test_preview_leaves_history_untouched() {
        let mut backend = RecordingBackend::new(Extent::new(320, 240));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            filter: MotionBlurFilter::CameraMotion,
            ..Default::default()
        });
        let a = camera_at(Vec3::ZERO, 0.0);
        effect.render(&mut backend, &mut (), &a, 0);
        let before = effect.tracker().clone();

        effect.settings.preview = true;
        effect.settings.preview_scale = Vec3::new(1.0, 2.0, 3.0);
        for frame in 1..6 {
            let moved = camera_at(Vec3::splat(frame as f32), frame as f32 * 7.0);
            let report = effect.render(&mut backend, &mut (), &moved, frame);
            assert!(!report.committed);
            let uniforms = report.uniforms.expect("uniforms");
            assert_eq!(uniforms.blur_direction, [60.0, 30.0, 0.0, 90.0]);
        }

        assert_eq!(effect.tracker().previous_view_proj(), before.previous_view_proj());
        assert_eq!(effect.tracker().previous_position(), before.previous_position());
        assert_eq!(effect.tracker().previous_basis(), before.previous_basis());
        assert_eq!(effect.tracker().last_committed_frame(), Some(0));

        effect.settings.preview = false;
        let report = effect.render(&mut backend, &mut (), &a, 6);
        assert!(report.resynced);
    }

    #[test]
    fn test_preview_previous_matrix_is_offset_current() {
        let mut backend = RecordingBackend::new(Extent::new(320, 240));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            preview: true,
            preview_scale: Vec3::new(4.0, 0.0, 0.0),
            ..Default::default()
        });
        let camera = camera_at(Vec3::ZERO, 0.0);
        let report = effect.render(&mut backend, &mut (), &camera, 0);
        let uniforms = report.uniforms.expect("uniforms");
        let expected = camera.view_proj() * Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        assert_mat_near(mat(uniforms.prev_view_proj), expected);
    }

    #[test]
    fn test_stationary_camera_motion_has_zero_blur() {
        let mut backend = RecordingBackend::new(Extent::new(1920, 1080));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            filter: MotionBlurFilter::CameraMotion,
            movement_scale: 1.0,
            ..Default::default()
        });
        let camera = camera_at(Vec3::new(2.0, 0.0, 5.0), 30.0);
        for frame in 0..3 {
            let report = effect.render(&mut backend, &mut (), &camera, frame);
            assert_eq!(report.uniforms.map(|u| u.blur_direction), Some([0.0; 4]));
        }
        assert_eq!(backend.passes(), vec![ShaderPass::CameraMotion; 3]);
    }

    #[test]
    fn test_camera_motion_yaw_blurs() {
        let mut backend = RecordingBackend::new(Extent::new(1920, 1080));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            filter: MotionBlurFilter::CameraMotion,
            ..Default::default()
        });
        effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 6.0), 1);
        let blur = report.uniforms.expect("uniforms").blur_direction;
        assert!((blur[1] - 144.0).abs() < 0.05, "{blur:?}");
    }

    #[test]
    fn test_unsupported_passes_through_and_releases() {
        let mut backend = RecordingBackend::new(Extent::new(320, 240));
        backend.capabilities = Capabilities { hdr_targets: false, ..Capabilities::FULL };
        let mut effect = CameraMotionBlur::default();

        for frame in 0..2 {
            let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), frame);
            assert_eq!(
                report.outcome,
                FrameOutcome::PassThrough(PassThroughReason::Unsupported(MotionBlurError::Unsupported(
                    "half-float render targets"
                )))
            );
        }
        assert_eq!(backend.events, vec![Event::Blit, Event::Blit]);
        assert_eq!(backend.acquired.len(), 6);
        assert!(backend.live.is_empty());
        assert!(effect.unsupported_reported);
        assert_eq!(effect.tracker().last_committed_frame(), None);
    }

    #[test]
    fn test_unsupported_warning_rearms_after_recovery() {
        let mut backend = RecordingBackend::new(Extent::new(32, 32));
        backend.capabilities = Capabilities { depth_textures: false, ..Capabilities::FULL };
        let mut effect = CameraMotionBlur::default();
        assert!(effect.check_resources(&backend).is_err());
        assert!(effect.unsupported_reported);
        backend.capabilities = Capabilities::FULL;
        assert!(effect.check_resources(&backend).is_ok());
        assert!(!effect.unsupported_reported);
    }

    #[test]
    fn test_half_float_fallback_format() {
        let mut backend = RecordingBackend::new(Extent::new(64, 64));
        backend.capabilities = Capabilities { two_channel_half_float: false, ..Capabilities::FULL };
        let mut effect = CameraMotionBlur::default();
        effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        assert!(backend
            .acquired
            .iter()
            .all(|t| t.format == wgpu::TextureFormat::Rgba16Float));
    }

    #[test]
    fn test_excluded_layers_patched_after_velocity() {
        let mut backend = RecordingBackend::new(Extent::new(64, 64));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            exclude_layers: LayerMask::layer(8),
            ..Default::default()
        });
        let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        assert!(report.excluded_layers_patched);
        let velocity_id = backend.temporary("Motion Blur Velocity Buffer").map(|t| t.id);
        assert!(matches!(backend.events[0], Event::Pass { pass: ShaderPass::Velocity, .. }));
        match &backend.events[1] {
            Event::Excluded { camera, mask, target } => {
                assert_eq!(camera, "_Main Camera_MotionBlurTmpCam");
                assert_eq!(*mask, LayerMask::layer(8));
                assert_eq!(Some(*target), velocity_id);
            }
            other => panic!("expected exclusion draw, got {other:?}"),
        }

        effect.on_disable();
        assert!(effect.exclusion().camera().is_none());
    }

    #[test]
    fn test_empty_exclude_mask_never_builds_camera() {
        let mut backend = RecordingBackend::new(Extent::new(64, 64));
        let mut effect = CameraMotionBlur::default();
        for frame in 0..4 {
            effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), frame);
        }
        assert_eq!(effect.exclusion().created_count(), 0);
    }

    #[test]
    fn test_noise_handle_forwarded() {
        let mut backend = RecordingBackend::new(Extent::new(64, 64));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            noise_texture: Some(TextureHandle(3)),
            ..Default::default()
        });
        let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        assert_eq!(report.uniforms.map(|u| u.has_noise), Some(1));
        assert!(backend
            .events
            .iter()
            .all(|e| !matches!(e, Event::Pass { noise: None, .. })));
    }

    #[test]
    fn test_soft_z_floored_in_uniforms() {
        let mut backend = RecordingBackend::new(Extent::new(64, 64));
        let mut effect = CameraMotionBlur::new(MotionBlurSettings {
            soft_z_distance: 0.0,
            ..Default::default()
        });
        let report = effect.render(&mut backend, &mut (), &camera_at(Vec3::ZERO, 0.0), 0);
        assert_eq!(report.uniforms.map(|u| u.soft_z_distance), Some(0.001));
    }
}
