use std::path::{Path, PathBuf};

use anyhow::Context;
use camblur_render::{
    CameraMotionBlur, CameraView, Extent, FrameOutcome, FrameReport, MotionBlurSettings, PassThroughReason,
};
use camblur_wgpu::{FrameInputs, HeadlessContext};
use glam::{EulerRot, Quat};

use crate::cli::{CameraPathArgs, EffectArgs};

/// sRGB so the passes blur in linear space and the PNG round-trips.
const IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;

/// Camera placed `frame` steps along the path.
pub fn camera_at(path: &CameraPathArgs, frame: u32, aspect: f32) -> CameraView {
    let t = frame as f32;
    let rotation = Quat::from_euler(
        EulerRot::YXZ,
        (path.yaw * t).to_radians(),
        (path.pitch * t).to_radians(),
        0.0,
    );
    CameraView::perspective("Main Camera", path.movement * t, rotation, path.fov, aspect, NEAR, FAR)
}

/// Reject settings a still image cannot honor. A single image carries no
/// per-layer geometry, so excluded layers would never be patched.
pub fn check_still_image_settings(settings: &MotionBlurSettings) -> anyhow::Result<()> {
    if !settings.exclude_layers.is_empty() {
        anyhow::bail!("--exclude-layer needs scene geometry; `render` only has a flat image (use `plan` to inspect it)");
    }
    Ok(())
}

fn load_rgba(path: &Path) -> anyhow::Result<image::RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .to_rgba8())
}

pub fn run(
    input: PathBuf,
    output: PathBuf,
    noise: Option<PathBuf>,
    camera: CameraPathArgs,
    effect: EffectArgs,
) -> anyhow::Result<()> {
    let mut settings = effect.settings();
    settings.validate().context("invalid motion blur settings")?;
    check_still_image_settings(&settings)?;

    let source_image = load_rgba(&input)?;
    let (width, height) = source_image.dimensions();
    println!("Rendering {} ({}x{}) over {} frame(s)...", input.display(), width, height, camera.frames);

    let ctx = HeadlessContext::new().context("failed to initialize a headless GPU device")?;
    let mut backend = ctx.create_backend(IMAGE_FORMAT)?;

    if let Some(path) = &noise {
        let noise_image = load_rgba(path)?;
        let (w, h) = noise_image.dimensions();
        settings.noise_texture = Some(backend.upload_noise_texture(noise_image.as_raw(), w, h, 4)?);
    }

    let source = ctx.upload_rgba8("Source Image", width, height, IMAGE_FORMAT, source_image.as_raw())?;
    let depth = ctx.create_constant_depth("Source Depth", width, height, camera.depth.clamp(0.0, 1.0));
    let destination = ctx.create_target("Destination Image", width, height, IMAGE_FORMAT);

    let mut blur = CameraMotionBlur::new(settings);
    let requirements = blur.on_enable();
    log::debug!("Effect enabled, requires {:?}", requirements);

    let aspect = width as f32 / height.max(1) as f32;
    let mut last_report: Option<FrameReport> = None;
    for frame in 0..camera.frames {
        let view = camera_at(&camera, frame, aspect);
        let mut gpu_frame = backend.begin_frame(FrameInputs {
            source: source.texture.create_view(&wgpu::TextureViewDescriptor::default()),
            source_extent: Extent::new(width, height),
            depth: depth.texture.create_view(&wgpu::TextureViewDescriptor::default()),
            destination: destination.color_texture.create_view(&wgpu::TextureViewDescriptor::default()),
            layer_draws: Vec::new(),
        });
        let report = blur.render(&mut backend, &mut gpu_frame, &view, u64::from(frame));
        ctx.queue.submit(std::iter::once(gpu_frame.finish()));
        log::debug!(
            "Frame {}: {:?} (resynced: {}, committed: {})",
            frame,
            report.outcome,
            report.resynced,
            report.committed
        );
        last_report = Some(report);
    }
    blur.on_disable();

    match last_report.map(|report| report.outcome) {
        Some(FrameOutcome::Rendered(composite)) => println!("  Composite: {:?}", composite),
        Some(FrameOutcome::PassThrough(PassThroughReason::Unsupported(err))) => {
            println!("  Motion blur unavailable ({err}); writing the source unmodified")
        }
        Some(FrameOutcome::PassThrough(PassThroughReason::Disabled)) | None => {}
    }

    let pixels = ctx.read_rgba8(&destination.color_texture, width, height)?;
    let result = image::RgbaImage::from_raw(width, height, pixels)
        .context("readback size does not match the image")?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    result
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Wrote {}", output.display());
    Ok(())
}
