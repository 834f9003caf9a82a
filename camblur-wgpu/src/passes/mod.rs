//! Render pass implementations for the motion blur effect.

pub mod exclusion;
pub mod motion_blur;
