//! # Tilequest Harness
//!
//! Headless runner for the Tilequest simulation.
//!
//! Loads a map and an optional input script, runs a fixed number of frames
//! and prints the final render snapshot as JSON.
//!
//! Usage: `tilequest [config.toml]`, or `tilequest --write-config [path]` to
//! write the default configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod script;

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tilequest_sim::{GameEvent, GameWorld, MapModel};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{HarnessConfig, CONFIG_FILE};
use crate::script::InputScript;

/// Main entry point.
fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let first = args.next();
    if first.as_deref() == Some("--write-config") {
        let path = args.next().map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
        HarnessConfig::default()
            .save_to(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config_path = first.map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = HarnessConfig::load_from(&config_path);
    config.validate();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("Invalid log filter")?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Tilequest harness starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    run(&config)?;

    info!("Tilequest harness finished");
    Ok(())
}

fn run(config: &HarnessConfig) -> Result<()> {
    let source = fs::read_to_string(&config.map_path)
        .with_context(|| format!("Failed to read map {}", config.map_path.display()))?;
    let map = MapModel::from_json_str(&source)
        .with_context(|| format!("Failed to load map {}", config.map_path.display()))?;

    let script = match &config.script_path {
        Some(path) => InputScript::load(path)
            .with_context(|| format!("Failed to load input script {}", path.display()))?,
        None => InputScript::default(),
    };

    if !script.steps().is_empty() {
        info!(
            "Script covers {} of {} frames",
            script.total_frames().min(u64::from(config.frames)),
            config.frames
        );
    }

    let mut world = GameWorld::new(map, &config.world);
    info!(
        "Running {} frames at {:.4}s ({:.1}s simulated)",
        config.frames,
        config.timestep,
        config.duration()
    );

    for input in script.frames().take(config.frames as usize) {
        world.step(config.timestep, input.intent, &input.actions);
        let events = world.drain_events();
        if config.log_events {
            for event in &events {
                log_event(world.frame(), event);
            }
        }
    }

    let snapshot = world.snapshot();
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to encode snapshot")?;
    match &config.snapshot_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, json)
                .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
            info!("Snapshot written to {}", path.display());
        },
        None => println!("{json}"),
    }

    let character = world.character();
    info!(
        "Final state: health {}/{}, level {}, {} enemies left",
        character.health(),
        character.max_health(),
        character.progression.level(),
        world.enemies().iter().filter(|e| e.is_alive()).count()
    );
    Ok(())
}

fn log_event(frame: u64, event: &GameEvent) {
    match event {
        GameEvent::EnemyDamaged { .. } | GameEvent::ArrowFired { .. } | GameEvent::EnemyRemoved { .. } => {
            debug!("[frame {frame}] {event:?}");
        },
        _ => info!("[frame {frame}] {event:?}"),
    }
}
