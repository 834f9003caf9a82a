use anyhow::Context;
use camblur_render::{BufferLayout, Extent, FramePlan, Step};

use crate::cli::EffectArgs;

pub fn run(width: u32, height: u32, effect: EffectArgs) -> anyhow::Result<()> {
    let mut settings = effect.settings();
    settings.validate().context("invalid motion blur settings")?;
    if settings.sanitize() {
        println!("Settings adjusted to the supported range");
    }

    let layout = BufferLayout::new(Extent::new(width, height), settings.velocity_downsample);
    let plan = FramePlan::build(&settings);

    println!("Composite: {:?}", plan.composite);
    println!("  Source:   {}", describe_extent(layout.source));
    println!("  Velocity: {}", describe_extent(layout.velocity));
    println!("  Tiles:    {}", describe_extent(layout.tile));
    println!("  Max velocity: {}", settings.max_velocity);
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  {}. {}", i + 1, describe_step(step));
    }

    Ok(())
}

fn describe_extent(extent: Extent) -> String {
    format!("{}x{}", extent.width, extent.height)
}

pub fn describe_step(step: &Step) -> String {
    match step {
        Step::Pass { pass, input, output } => format!("{} ({:?} -> {:?})", pass.label(), input, output),
        Step::ClearVelocity => "Clear velocity buffer".to_string(),
        Step::PatchExcludedLayers => "Zero velocity of excluded layers".to_string(),
    }
}
