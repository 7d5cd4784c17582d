use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cadence::background::BackgroundPass;
use cadence::{Engine, EngineConfig};
use cadence_gpu::GpuContext;
use cadence_gpu::ash::vk;
use cadence_window::WinitWindow;

fn setup(config: &EngineConfig) -> Result<(WinitWindow, Engine<GpuContext, BackgroundPass>)> {
    let window = WinitWindow::new(&config.window.title, config.window.width, config.window.height)?;
    let gpu = GpuContext::new(&config.context_settings(), window.window())
        .context("Failed to create GPU context")?;
    let (width, height) = window.drawable_extent();
    let engine = Engine::initialize(
        gpu,
        BackgroundPass::from_shader_path(config.background_shader.clone()),
        config,
        vk::Extent2D { width, height },
    )?;
    Ok((window, engine))
}

fn main() -> ExitCode {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match EngineConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = cadence::logging::init(&config.logging) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }
    if config.profiling {
        tracy_client::Client::start();
        tracing::info!("Tracy profiling enabled");
    }

    let (mut window, mut engine) = match setup(&config) {
        Ok(setup) => setup,
        Err(err) => {
            tracing::error!("Setup failed: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = engine.run_main_loop(&mut window) {
        tracing::error!("Fatal error in frame loop: {err:#}");
        std::process::abort();
    }
    if let Err(err) = engine.shutdown() {
        tracing::error!("Shutdown failed: {err:#}");
        return ExitCode::FAILURE;
    }
    // the window must outlive the Vulkan surface created from it
    drop(engine);
    drop(window);
    ExitCode::SUCCESS
}
