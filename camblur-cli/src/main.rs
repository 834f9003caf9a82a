mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Render {
            input,
            output,
            noise,
            camera,
            effect,
        } => commands::render::run(input, output, noise, camera, effect),
        cli::Command::Plan {
            width,
            height,
            effect,
        } => commands::plan::run(width, height, effect),
    }
}
