//! Debug drawing and statistics module

use std::collections::VecDeque;
use std::time::Duration;

use glam::Vec3;

use crate::nav::{NavGrid, SearchTrace};

/// How long search relax lines stay visible, in seconds
const SEARCH_LINE_DURATION: f32 = 200.0;

/// Length of the grid sample rays drawn by [`draw_grid`]
const SAMPLE_RAY_LENGTH: f32 = 10.0;

/// Linear RGBA color for debug primitives
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);
    pub const RED: Self = Self([1.0, 0.0, 0.0, 1.0]);
    pub const GREEN: Self = Self([0.0, 1.0, 0.0, 1.0]);
    pub const BLUE: Self = Self([0.0, 0.0, 1.0, 1.0]);
    pub const CYAN: Self = Self([0.0, 1.0, 1.0, 1.0]);
    pub const YELLOW: Self = Self([1.0, 1.0, 0.0, 1.0]);
}

/// Sink for debug line primitives
pub trait DebugDraw {
    /// Draw a line that stays visible for `duration` seconds
    fn line(&mut self, from: Vec3, to: Vec3, color: Color, duration: f32);
}

/// A recorded debug line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    pub from: Vec3,
    pub to: Vec3,
    pub color: Color,
    /// Seconds left before the line expires
    pub remaining: f32,
}

/// Records debug lines until they expire
#[derive(Debug, Clone, Default)]
pub struct DebugLines {
    lines: Vec<DebugLine>,
}

impl DebugLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count down every line by `dt` and drop the expired ones
    pub fn age(&mut self, dt: f32) {
        for line in &mut self.lines {
            line.remaining -= dt;
        }
        self.lines.retain(|line| line.remaining > 0.0);
    }

    /// Live lines
    pub fn lines(&self) -> &[DebugLine] {
        &self.lines
    }

    /// Live lines of one color
    pub fn with_color(&self, color: Color) -> impl Iterator<Item = &DebugLine> {
        self.lines.iter().filter(move |line| line.color == color)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl DebugDraw for DebugLines {
    fn line(&mut self, from: Vec3, to: Vec3, color: Color, duration: f32) {
        self.lines.push(DebugLine {
            from,
            to,
            color,
            remaining: duration,
        });
    }
}

impl SearchTrace for DebugLines {
    fn relaxed(&mut self, from: Vec3, to: Vec3) {
        self.line(from, to, Color::CYAN, SEARCH_LINE_DURATION);
    }
}

/// Draw every grid node as a short vertical tick colored by state: green
/// walkable, red blocked, blue without ground. With `show_rays` the ground
/// sample ray of every node that hit something is drawn too.
pub fn draw_grid(grid: &NavGrid, draw: &mut dyn DebugDraw, show_rays: bool) {
    let marker = Vec3::Y * grid.cell_size() * 0.5;

    for node in grid.nodes() {
        let color = if !node.has_ground {
            Color::BLUE
        } else if node.walkable {
            Color::GREEN
        } else {
            Color::RED
        };
        let base = node.waypoint();
        draw.line(base, base + marker, color, 0.0);

        if show_rays {
            if let Some(hit) = node.hit_point {
                draw.line(node.position + Vec3::Y * SAMPLE_RAY_LENGTH, hit, color, 0.0);
            }
        }
    }
}

/// Tick statistics tracker
#[derive(Debug)]
pub struct TickStats {
    /// Tick time history for averaging
    tick_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Average tick time in milliseconds
    avg_tick_time_ms: f32,
    /// Maximum tick time in milliseconds
    max_tick_time_ms: f32,
    /// Total ticks recorded
    total_ticks: u64,
    /// Path searches run during the last tick
    searches_last_tick: usize,
    /// Path searches run since creation
    total_searches: u64,
    /// Searches that ended without a path
    failed_searches: u64,
    /// Most nodes closed by a single search
    max_expanded: usize,
}

impl TickStats {
    /// Create a new tick stats tracker
    pub fn new() -> Self {
        Self {
            tick_times: VecDeque::with_capacity(120),
            max_samples: 120,
            avg_tick_time_ms: 0.0,
            max_tick_time_ms: 0.0,
            total_ticks: 0,
            searches_last_tick: 0,
            total_searches: 0,
            failed_searches: 0,
            max_expanded: 0,
        }
    }

    /// Record one tick that took `elapsed` and ran `searches` path searches
    pub fn record_tick(&mut self, elapsed: Duration, searches: usize) {
        self.total_ticks += 1;
        self.searches_last_tick = searches;
        self.total_searches += searches as u64;

        if self.tick_times.len() >= self.max_samples {
            self.tick_times.pop_front();
        }
        self.tick_times.push_back(elapsed);

        self.update_stats();
    }

    /// Record the outcome of one search
    pub fn record_search(&mut self, expanded: usize, found: bool) {
        self.max_expanded = self.max_expanded.max(expanded);
        if !found {
            self.failed_searches += 1;
        }
    }

    fn update_stats(&mut self) {
        if self.tick_times.is_empty() {
            return;
        }

        let mut total = Duration::ZERO;
        let mut max = Duration::ZERO;
        for &dt in &self.tick_times {
            total += dt;
            max = max.max(dt);
        }

        let count = self.tick_times.len() as f32;
        self.avg_tick_time_ms = total.as_secs_f32() / count * 1000.0;
        self.max_tick_time_ms = max.as_secs_f32() * 1000.0;
    }

    /// Get average tick time in milliseconds
    pub fn avg_tick_time_ms(&self) -> f32 {
        self.avg_tick_time_ms
    }

    /// Get maximum tick time in milliseconds
    pub fn max_tick_time_ms(&self) -> f32 {
        self.max_tick_time_ms
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn searches_last_tick(&self) -> usize {
        self.searches_last_tick
    }

    pub fn total_searches(&self) -> u64 {
        self.total_searches
    }

    pub fn failed_searches(&self) -> u64 {
        self.failed_searches
    }

    pub fn max_expanded(&self) -> usize {
        self.max_expanded
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "Ticks: {} | Tick: {:.2}ms (max: {:.2}) | Searches: {} ({} failed, max {} nodes)",
            self.total_ticks,
            self.avg_tick_time_ms,
            self.max_tick_time_ms,
            self.total_searches,
            self.failed_searches,
            self.max_expanded
        )
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Debug overlay information
#[derive(Debug, Default)]
pub struct DebugInfo {
    /// Record search traces and grid lines
    pub enabled: bool,
    /// Tick statistics, always recorded
    pub stats: TickStats,
    /// Recorded debug lines
    pub lines: DebugLines,
}

impl DebugInfo {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    /// Toggle debug recording
    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }
}
