//! Camera motion blur: tracks the camera across frames, plans the shader
//! passes for the selected filter and drives them through a
//! [`MotionBlurBackend`].

pub mod backend;
pub mod camera;
pub mod camera_motion;
pub mod effect;
pub mod error;
pub mod exclusion;
pub mod extent;
pub mod plan;
pub mod preview;
pub mod settings;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use backend::{Capabilities, FrameTemporaries, MotionBlurBackend, PassRequest, TemporaryGuard};
pub use camera::{CameraBasis, CameraView, ClipDepth};
pub use effect::{CameraMotionBlur, EnableRequirements, FrameOutcome, FrameReport, PassThroughReason};
pub use error::{MotionBlurError, Result};
pub use exclusion::{ExclusionCamera, ExclusionCameraProxy};
pub use extent::{BufferLayout, Extent};
pub use plan::{Composite, FramePlan, ShaderPass, Step, Surface};
pub use settings::{LayerMask, MotionBlurFilter, MotionBlurSettings, TextureHandle, MAX_RADIUS};
pub use tracker::TemporalCameraTracker;
