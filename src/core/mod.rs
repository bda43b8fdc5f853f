//! Core simulation module
//!
//! Contains the Simulation root, its configuration, events and debug output

mod config;
mod debug;
mod events;
mod simulation;

pub use config::{ConfigError, GridConfig, SimulationConfig, SteeringConfig};
pub use debug::{Color, DebugDraw, DebugInfo, DebugLine, DebugLines, TickStats, draw_grid};
pub use events::{EventQueue, NavEvent};
pub use simulation::Simulation;
