//! Tessera - headless ECS demo
//!
//! Runs a fixed number of frames of a particle simulation and logs the
//! population as it evolves.

mod settings;
mod sim;

use anyhow::{Context, Result};
use tessera_ecs::World;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::settings::Settings;
use crate::sim::{Aging, Movement, Spawner};

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting Tessera demo...");

    let settings = Settings::load();
    let mut world = World::with_config(settings.ecs).context("Invalid ECS configuration")?;
    sim::setup(&mut world, &settings.simulation).context("Failed to set up simulation")?;

    let simulation = &settings.simulation;
    for _ in 0..simulation.frames {
        world
            .update(simulation.fixed_timestep)
            .with_context(|| format!("Frame {} failed", world.frame()))?;
        if simulation.report_every > 0
            && world.frame() % u64::from(simulation.report_every) == 0
        {
            info!(
                "Frame {}: {} entities, {} moving",
                world.frame(),
                world.entity_count(),
                world.system_entities::<Movement>().map_or(0, |e| e.len()),
            );
        }
    }

    let spawned = world.get_system::<Spawner>().map_or(0, |s| s.spawned);
    let expired = world.get_system::<Aging>().map_or(0, |s| s.expired);
    info!(
        "Finished {} frames: {} spawned, {} expired, {} alive",
        world.frame(),
        spawned,
        expired,
        world.entity_count()
    );
    for (name, count) in world.components().occupancy() {
        info!("  {}: {} stored", name, count);
    }
    anyhow::ensure!(world.check_consistency(), "ECS bookkeeping is inconsistent");
    Ok(())
}
