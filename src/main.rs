//! Headless demo: agents wandering between waypoints across a small yard
//!
//! Usage: `wayfarer [config.ron]`

use std::error::Error;

use wayfarer::prelude::*;

/// Simulated seconds to run
const RUN_SECONDS: f32 = 30.0;
const DT: f32 = 1.0 / 60.0;

/// Ground slab, a muddy strip that costs extra to cross and a few walls
fn build_yard(config: &GridConfig) -> Physics {
    let mut physics = Physics::new();

    let extent = Vec3::new(
        config.width as f32 * config.cell_size,
        0.0,
        config.height as f32 * config.cell_size,
    );
    let center = config.origin + extent * 0.5;

    physics.add_ground(
        Vec3::new(center.x, -0.5, center.z),
        Vec3::new(extent.x * 0.5, 0.5, extent.z * 0.5),
        None,
    );
    physics.add_ground(
        Vec3::new(center.x, 0.05, center.z),
        Vec3::new(extent.x * 0.1, 0.05, extent.z * 0.5),
        Some(60.0),
    );

    for (x, z, half_x, half_z) in [
        (0.25, 0.3, 0.15, 0.02),
        (0.75, 0.7, 0.15, 0.02),
        (0.3, 0.75, 0.02, 0.15),
    ] {
        physics.add_obstacle(
            config.origin + Vec3::new(extent.x * x, 1.0, extent.z * z),
            Vec3::new(extent.x * half_x, 1.0, extent.z * half_z),
        );
    }

    physics
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {path}");
            SimulationConfig::load_ron(&path)?
        }
        None => SimulationConfig {
            grid: GridConfig::new(Vec3::ZERO, 40, 40, 1.0),
            ..SimulationConfig::default()
        },
    };

    let physics = build_yard(&config.grid);
    let grid = config.grid;
    let mut sim = Simulation::new(config, physics)?;

    let far = grid.origin
        + Vec3::new(
            grid.width.saturating_sub(2) as f32 * grid.cell_size,
            0.0,
            grid.height.saturating_sub(2) as f32 * grid.cell_size,
        );
    let near = grid.origin + Vec3::new(grid.cell_size, 0.0, grid.cell_size);
    for marker in [
        near,
        far,
        Vec3::new(near.x, 0.0, far.z),
        Vec3::new(far.x, 0.0, near.z),
    ] {
        sim.add_goal_marker(marker);
    }

    for i in 0..12 {
        let offset = Vec3::new((i % 4) as f32, 0.0, (i / 4) as f32) * 2.0 * grid.cell_size;
        sim.spawn_agent(format!("Agent {i}"), near + offset + Vec3::Y * 0.5);
    }

    let ticks = (RUN_SECONDS / DT) as usize;
    let mut arrivals = 0;
    let mut failures = 0;
    for tick in 0..ticks {
        sim.tick(DT);

        for event in sim.events().iter() {
            match event {
                NavEvent::PathCompleted { .. } => arrivals += 1,
                NavEvent::PathFailed { .. } | NavEvent::GoalsMissing { .. } => failures += 1,
                _ => {}
            }
        }

        if tick % 600 == 0 {
            log::info!("{}", sim.debug().stats.format_stats());
        }
    }

    log::info!("{}", sim.debug().stats.format_stats());
    println!(
        "{} agents, {} arrivals, {} failed goals in {RUN_SECONDS}s",
        sim.agent_count(),
        arrivals,
        failures
    );

    Ok(())
}
