mod config;
mod recording;

use crate::{config::Config, recording::Recording};
use anyhow::{Context, Result};
use cetvel::{
    assets::DirAssets,
    config::RenderConfig,
    gpu::RecordingBackend,
    settings::UnitSettings,
    tracking::ScriptedSession,
    ui::{ui_channel, UiEvent},
    FrameOrchestrator,
};
use clap::Parser;
use log::{info, warn};
use std::fs;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Config::parse();

    let render_config = match &args.config {
        Some(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_slice::<RenderConfig>(&bytes)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => RenderConfig::default(),
    };

    let mut units = match &args.settings {
        Some(path) => UnitSettings::load(path)
            .with_context(|| format!("loading unit settings {}", path.display()))?,
        None => UnitSettings::default(),
    };
    if let Some(unit) = args.unit {
        units.select(unit.into());
    }

    let recording = Recording::load(&args.recording)?;
    let depth_supported = recording.depth_supported;
    let (script, inputs) = recording.into_script()?;
    info!(
        "Loaded {} frames from {}",
        script.len(),
        args.recording.display()
    );

    let assets = DirAssets::new(&args.assets);
    let missing = assets.missing();
    if !missing.is_empty() {
        warn!(
            "{} assets missing under {}: {:?}",
            missing.len(),
            args.assets.display(),
            missing
        );
    }

    let (ui, events) = ui_channel();
    let session = ScriptedSession::new(script).with_depth_support(depth_supported);
    let mut orchestrator = FrameOrchestrator::new(
        session,
        RecordingBackend::new(),
        Box::new(assets),
        render_config,
        ui,
    );
    orchestrator
        .depth_settings_mut()
        .set_use_depth_for_occlusion(args.occlusion);
    orchestrator
        .depth_settings_mut()
        .set_depth_color_visualization(args.depth_visualization);

    orchestrator.on_resume();
    orchestrator
        .on_surface_created()
        .context("setting up the rendering surface")?;
    orchestrator.on_surface_changed(args.width, args.height);
    orchestrator.select_marker(Some(args.marker.into()));

    let taps = orchestrator.tap_sender();
    for (index, input) in inputs.iter().enumerate() {
        if let Some(name) = input.select {
            orchestrator.select_marker(Some(name));
        }
        if let Some(tap) = input.tap {
            taps.on_tap(tap.x, tap.y);
        }

        let report = orchestrator.draw_frame()?;
        for event in events.try_iter() {
            match event {
                UiEvent::SuggestOcclusion => {
                    info!("Depth is supported; occlusion can be enabled with --occlusion")
                }
                UiEvent::Error(message) => warn!("{message}"),
            }
        }
        if let Some(placed) = report.placed {
            info!("Frame {index}: placed {} marker", placed.name);
        }

        let commands = orchestrator.backend_mut().take_commands();
        let status = report
            .status
            .map(|s| s.render(&units))
            .unwrap_or_default();
        println!("{index:>5}  {status:<60}  {:>4} GPU commands", commands.len());
    }

    match orchestrator.anchors().distance() {
        Some(distance) => println!("Final distance: {}", units.format_distance(distance)),
        None => println!("No distance measured"),
    }
    orchestrator.on_pause();

    if args.save_settings {
        if let Some(path) = &args.settings {
            units
                .save(path)
                .with_context(|| format!("saving unit settings {}", path.display()))?;
            info!("Saved unit settings to {}", path.display());
        }
    }
    Ok(())
}
