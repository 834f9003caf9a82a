use std::path::PathBuf;

use camblur_render::{LayerMask, MotionBlurFilter, MotionBlurSettings};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glam::Vec3;

#[derive(Parser)]
#[command(
    name = "camblur",
    about = "Camera motion blur for still images",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Blur an image as seen from a moving camera
    Render {
        /// Source PNG
        input: PathBuf,
        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,
        /// Jitter texture for the reconstruction filter
        #[arg(long)]
        noise: Option<PathBuf>,
        #[command(flatten)]
        camera: CameraPathArgs,
        #[command(flatten)]
        effect: EffectArgs,
    },
    /// Print the buffer layout and pass sequence without touching the GPU
    Plan {
        #[arg(long, default_value_t = 1920)]
        width: u32,
        #[arg(long, default_value_t = 1080)]
        height: u32,
        #[command(flatten)]
        effect: EffectArgs,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    /// Whole-screen blur from camera motion, no velocity buffer
    CameraMotion,
    /// Per-pixel blur along the velocity buffer
    LocalBlur,
    /// Tile-dilated reconstruction
    Reconstruction,
}

impl From<FilterArg> for MotionBlurFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::CameraMotion => MotionBlurFilter::CameraMotion,
            FilterArg::LocalBlur => MotionBlurFilter::LocalBlur,
            FilterArg::Reconstruction => MotionBlurFilter::Reconstruction,
        }
    }
}

/// Camera path simulated over the rendered frames.
#[derive(Args, Clone, Debug)]
pub struct CameraPathArgs {
    /// Number of frames to run; the last one is written
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    pub frames: u32,
    /// Yaw per frame, degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub yaw: f32,
    /// Pitch per frame, degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub pitch: f32,
    /// Translation per frame as x,y,z
    #[arg(long = "move", default_value = "0,0,0", value_parser = parse_vec3, allow_hyphen_values = true)]
    pub movement: Vec3,
    /// Vertical field of view, degrees
    #[arg(long, default_value_t = 60.0)]
    pub fov: f32,
    /// Device depth written for every pixel, in [0, 1]
    #[arg(long, default_value_t = 0.9)]
    pub depth: f32,
}

#[derive(Args, Clone, Debug)]
pub struct EffectArgs {
    #[arg(long, value_enum, default_value_t = FilterArg::Reconstruction)]
    pub filter: FilterArg,
    #[arg(long, default_value_t = 1.0)]
    pub rotation_scale: f32,
    #[arg(long, default_value_t = 0.0)]
    pub movement_scale: f32,
    /// Maximum velocity in velocity-buffer pixels
    #[arg(long, default_value_t = 8.0)]
    pub max_velocity: f32,
    /// Velocities below this are not blurred
    #[arg(long, default_value_t = 0.1)]
    pub min_velocity: f32,
    #[arg(long, default_value_t = 0.375)]
    pub velocity_scale: f32,
    #[arg(long, default_value_t = 0.01)]
    pub soft_z_distance: f32,
    /// Velocity buffer resolution divisor
    #[arg(long, default_value_t = 1)]
    pub velocity_downsample: u32,
    /// Layer whose velocity is zeroed (repeatable; `plan` only, a flat image has no layers)
    #[arg(long = "exclude-layer", value_parser = clap::value_parser!(u8).range(0..32))]
    pub exclude_layers: Vec<u8>,
    /// Simulate the blur of a movement instead of tracking the camera
    #[arg(long)]
    pub preview: bool,
    /// Simulated movement as x,y,z
    #[arg(long, default_value = "1,1,1", value_parser = parse_vec3, allow_hyphen_values = true)]
    pub preview_scale: Vec3,
    /// Write the velocity visualization instead of the blurred image
    #[arg(long)]
    pub show_velocity: bool,
    #[arg(long, default_value_t = 1.0)]
    pub show_velocity_scale: f32,
    /// Clamp the local blur filter to the maximum sample radius
    #[arg(long)]
    pub clamp_local_blur: bool,
}

impl EffectArgs {
    /// Settings for these flags; the noise texture is attached by the caller.
    pub fn settings(&self) -> MotionBlurSettings {
        let mut exclude_layers = LayerMask::NONE;
        for &layer in &self.exclude_layers {
            exclude_layers.set(layer);
        }

        MotionBlurSettings {
            filter: self.filter.into(),
            preview: self.preview,
            preview_scale: self.preview_scale,
            movement_scale: self.movement_scale,
            rotation_scale: self.rotation_scale,
            max_velocity: self.max_velocity,
            min_velocity: self.min_velocity,
            velocity_scale: self.velocity_scale,
            soft_z_distance: self.soft_z_distance,
            velocity_downsample: self.velocity_downsample,
            exclude_layers,
            noise_texture: None,
            show_velocity: self.show_velocity,
            show_velocity_scale: self.show_velocity_scale,
            clamp_local_blur: self.clamp_local_blur,
        }
    }
}

pub fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts = s
        .split(',')
        .map(|part| part.trim().parse::<f32>().map_err(|e| format!("'{part}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got {} component(s)", parts.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("1, -2.5,3").unwrap(), Vec3::new(1.0, -2.5, 3.0));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,x,3").is_err());
    }

    #[test]
    fn test_defaults_match_settings() {
        let cli = parse(&["camblur", "plan"]);
        let Command::Plan { width, height, effect } = cli.command else {
            panic!("expected plan");
        };
        assert_eq!((width, height), (1920, 1080));
        assert_eq!(effect.settings(), MotionBlurSettings::default());
    }

    #[test]
    fn test_render_flags() {
        let cli = parse(&[
            "camblur",
            "render",
            "in.png",
            "-o",
            "out.png",
            "--filter",
            "local-blur",
            "--yaw",
            "-2",
            "--move",
            "0,0,-1",
            "--exclude-layer",
            "3",
            "--exclude-layer",
            "5",
            "--velocity-downsample",
            "2",
        ]);
        let Command::Render { input, output, noise, camera, effect } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(input, PathBuf::from("in.png"));
        assert_eq!(output, PathBuf::from("out.png"));
        assert!(noise.is_none());
        assert_eq!(camera.frames, 2);
        assert_eq!(camera.yaw, -2.0);
        assert_eq!(camera.movement, Vec3::new(0.0, 0.0, -1.0));

        let settings = effect.settings();
        assert_eq!(settings.filter, MotionBlurFilter::LocalBlur);
        assert_eq!(settings.velocity_downsample, 2);
        assert!(settings.exclude_layers.has(3));
        assert!(settings.exclude_layers.has(5));
        assert!(!settings.exclude_layers.has(4));
    }

    #[test]
    fn test_rejects_zero_frames() {
        assert!(Cli::try_parse_from(["camblur", "render", "a.png", "-o", "b.png", "--frames", "0"]).is_err());
    }

    #[test]
    fn test_rejects_layer_out_of_range() {
        assert!(Cli::try_parse_from(["camblur", "plan", "--exclude-layer", "32"]).is_err());
    }
}
