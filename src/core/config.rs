//! Simulation configuration
//!
//! Loaded from and saved to RON or JSON. Every field has a default, so a
//! config file only needs to name what it changes.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::NavError;

/// Layout of the navigation grid and how it is sampled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// World position of cell (0, 0)
    pub origin: Vec3,
    /// Cells along X
    pub width: usize,
    /// Cells along Z
    pub height: usize,
    /// Cell edge length in world units
    pub cell_size: f32,
    /// Height above a cell the ground ray starts from
    pub sample_height: f32,
    /// Penalty for cells whose surface carries no annotation
    pub default_extra_cost: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            width: 100,
            height: 100,
            cell_size: 1.0,
            sample_height: 20.0,
            default_extra_cost: 40.0,
        }
    }
}

impl GridConfig {
    /// Create a grid layout anchored at `origin`
    #[must_use]
    pub fn new(origin: Vec3, width: usize, height: usize, cell_size: f32) -> Self {
        Self {
            origin,
            width,
            height,
            cell_size,
            ..Default::default()
        }
    }

    /// Set the penalty for unannotated surfaces
    #[must_use]
    pub fn with_default_extra_cost(mut self, cost: f32) -> Self {
        self.default_extra_cost = cost;
        self
    }

    /// Reject layouts that would produce a degenerate grid
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] for empty dimensions, a
    /// non-positive cell size or non-finite values.
    pub fn validate(&self) -> Result<(), NavError> {
        if self.width == 0 || self.height == 0 {
            return Err(NavError::Configuration(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if i32::try_from(self.width).is_err() || i32::try_from(self.height).is_err() {
            return Err(NavError::Configuration(format!(
                "grid dimensions {}x{} exceed the addressable range",
                self.width, self.height
            )));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(NavError::Configuration(format!(
                "cell size must be positive, got {}",
                self.cell_size
            )));
        }
        if !self.origin.is_finite() || !self.sample_height.is_finite() {
            return Err(NavError::Configuration(
                "origin and sample height must be finite".to_string(),
            ));
        }
        if !self.default_extra_cost.is_finite() || self.default_extra_cost < 0.0 {
            return Err(NavError::Configuration(format!(
                "default extra cost must be non-negative, got {}",
                self.default_extra_cost
            )));
        }
        Ok(())
    }
}

/// Tuning for agent motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Speed cap in world units per second
    pub max_speed: f32,
    /// Largest velocity change seeking may apply per tick
    pub max_steer_force: f32,
    /// Distance at which a waypoint counts as reached
    pub arrival_radius: f32,
    /// Radius of the neighbour query
    pub neighbor_radius: f32,
    /// Neighbours closer than this push the agent away
    pub separation_distance: f32,
    pub separation_weight: f32,
    /// Length of the forward avoidance probe
    pub avoid_distance: f32,
    /// Largest velocity change avoidance may apply per tick
    pub avoid_strength: f32,
    /// Seconds an idle agent waits after a failed goal selection
    pub goal_retry_delay: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            max_steer_force: 10.0,
            arrival_radius: 0.1,
            neighbor_radius: 5.0,
            separation_distance: 1.0,
            separation_weight: 3.0,
            avoid_distance: 1.0,
            avoid_strength: 10.0,
            goal_retry_delay: 1.0,
        }
    }
}

/// Top-level simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub steering: SteeringConfig,
    /// Tag of the goal markers agents wander between
    pub goal_tag: String,
    /// Seed for goal selection
    pub seed: u64,
    /// Radius of the agent collision bodies
    pub agent_radius: f32,
    /// Path searches allowed per tick, the rest wait for the next tick
    pub max_searches_per_tick: usize,
    /// Record search traces and debug lines
    pub debug: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            steering: SteeringConfig::default(),
            goal_tag: String::from("Waypoint"),
            seed: 42,
            agent_radius: 0.5,
            max_searches_per_tick: 8,
            debug: false,
        }
    }
}

impl SimulationConfig {
    /// Parse a config from RON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Render the config as pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Save the config to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let ron_string = self.to_ron_string()?;
        fs::write(path, ron_string).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a config from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save the config to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a config from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }
}

/// Errors that can occur while loading or saving a config
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Deserialization error: {0}")]
    Deserialize(String),
}
