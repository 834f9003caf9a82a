//! Data shared between the CPU side of the motion blur and its WGSL programs.

pub mod shaders;
pub mod uniforms;
