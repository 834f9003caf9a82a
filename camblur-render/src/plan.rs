//! Which shader passes run for a given configuration, and in what order.

use camblur_gpu_shared::shaders::PASS_ENTRY_POINTS;

use crate::settings::{MotionBlurFilter, MotionBlurSettings};

/// Shader pass indices of the motion blur program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderPass {
    Velocity = 0,
    DebugVelocity = 1,
    TileMax = 2,
    NeighbourMax = 3,
    Reconstruction = 4,
    LocalBlur = 5,
    CameraMotion = 6,
}

impl ShaderPass {
    pub const ALL: [ShaderPass; 7] = [
        ShaderPass::Velocity,
        ShaderPass::DebugVelocity,
        ShaderPass::TileMax,
        ShaderPass::NeighbourMax,
        ShaderPass::Reconstruction,
        ShaderPass::LocalBlur,
        ShaderPass::CameraMotion,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn entry_point(self) -> &'static str {
        PASS_ENTRY_POINTS[self.index()]
    }

    pub fn label(self) -> &'static str {
        match self {
            ShaderPass::Velocity => "Motion Blur Velocity",
            ShaderPass::DebugVelocity => "Motion Blur Debug Velocity",
            ShaderPass::TileMax => "Motion Blur Tile Max",
            ShaderPass::NeighbourMax => "Motion Blur Neighbour Max",
            ShaderPass::Reconstruction => "Motion Blur Reconstruction",
            ShaderPass::LocalBlur => "Motion Blur Local Blur",
            ShaderPass::CameraMotion => "Motion Blur Camera Motion",
        }
    }
}

/// Images a pass can read from or write to during one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
    Source,
    Destination,
    Velocity,
    TileMax,
    NeighbourMax,
}

/// The pass that writes the destination image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Composite {
    DebugVelocity,
    Reconstruction,
    LocalBlur,
    CameraMotion,
}

impl Composite {
    /// `show_velocity` overrides the filter.
    pub fn select(show_velocity: bool, filter: MotionBlurFilter) -> Self {
        if show_velocity {
            return Composite::DebugVelocity;
        }
        match filter {
            MotionBlurFilter::Reconstruction => Composite::Reconstruction,
            MotionBlurFilter::LocalBlur => Composite::LocalBlur,
            MotionBlurFilter::CameraMotion => Composite::CameraMotion,
        }
    }

    pub fn pass(self) -> ShaderPass {
        match self {
            Composite::DebugVelocity => ShaderPass::DebugVelocity,
            Composite::Reconstruction => ShaderPass::Reconstruction,
            Composite::LocalBlur => ShaderPass::LocalBlur,
            Composite::CameraMotion => ShaderPass::CameraMotion,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Pass { pass: ShaderPass, input: Surface, output: Surface },
    /// Zero the velocity buffer (debug view without a velocity pass).
    ClearVelocity,
    /// Zero velocity where excluded layers are drawn.
    PatchExcludedLayers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePlan {
    pub composite: Composite,
    pub steps: Vec<Step>,
}

impl FramePlan {
    pub fn build(settings: &MotionBlurSettings) -> Self {
        let composite = Composite::select(settings.show_velocity, settings.filter);
        let mut steps = Vec::with_capacity(5);

        if settings.filter.uses_velocity_buffer() {
            steps.push(Step::Pass {
                pass: ShaderPass::Velocity,
                input: Surface::Source,
                output: Surface::Velocity,
            });
            if !settings.exclude_layers.is_empty() {
                steps.push(Step::PatchExcludedLayers);
            }
        } else if composite == Composite::DebugVelocity {
            steps.push(Step::ClearVelocity);
        }

        match composite {
            Composite::DebugVelocity => steps.push(Step::Pass {
                pass: ShaderPass::DebugVelocity,
                input: Surface::Velocity,
                output: Surface::Destination,
            }),
            Composite::Reconstruction => {
                steps.push(Step::Pass {
                    pass: ShaderPass::TileMax,
                    input: Surface::Velocity,
                    output: Surface::TileMax,
                });
                steps.push(Step::Pass {
                    pass: ShaderPass::NeighbourMax,
                    input: Surface::TileMax,
                    output: Surface::NeighbourMax,
                });
                steps.push(Step::Pass {
                    pass: ShaderPass::Reconstruction,
                    input: Surface::Source,
                    output: Surface::Destination,
                });
            }
            Composite::LocalBlur | Composite::CameraMotion => steps.push(Step::Pass {
                pass: composite.pass(),
                input: Surface::Source,
                output: Surface::Destination,
            }),
        }

        Self { composite, steps }
    }

    pub fn passes(&self) -> impl Iterator<Item = ShaderPass> + '_ {
        self.steps.iter().filter_map(|step| match step {
            Step::Pass { pass, .. } => Some(*pass),
            _ => None,
        })
    }
}
