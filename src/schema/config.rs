//! Configuration types for the shell compiler's timing and cost constants.

use serde::{Deserialize, Serialize};

/// Smallest value any time constant is clamped to before use.
pub const MIN_TIME_CONSTANT: f32 = 1e-4;

/// Compile-time constants for ignition propagation, clustering and fallback records.
///
/// Values missing from a blueprint file take their defaults. Nothing here is
/// ever rejected: [`CompilerConfig::sanitized`] clamps out-of-range values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Ignition time to cross one voxel at full fuel density (seconds).
    pub seconds_per_voxel: f32,
    /// Fuel density written into every cell inside the shell (0-255).
    pub base_fuel: u8,
    /// Extra delay added when entering a paper cell, scaled by paper strength.
    pub paper_extra_delay_per_cell: f32,
    /// Maximum ignition-time span of one burst region (seconds).
    pub cluster_window: f32,
    /// Star voxels igniting after this time are excluded from every burst.
    pub max_ignition_time: f32,
    /// Fuse burn speed used when no fuse profile resolves.
    pub fuse_burn_speed: f32,
    /// Fuse ignite cost used when no fuse profile resolves.
    pub fuse_ignite_cost: f32,
    /// Washi ejection delay used when no paper profile resolves.
    pub washi_delay: f32,
    /// Washi collimation used when no paper profile resolves.
    pub washi_collimation: f32,
    /// Scatter strength used when no scatter profile resolves.
    pub scatter_strength: f32,
    /// Scatter ignite cost multiplier used when no scatter profile resolves.
    pub scatter_ignite_cost_multiplier: f32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            seconds_per_voxel: 0.02,
            base_fuel: 80,
            paper_extra_delay_per_cell: 0.04,
            cluster_window: 0.06,
            max_ignition_time: 8.0,
            fuse_burn_speed: 1.0,
            fuse_ignite_cost: 0.01,
            washi_delay: 0.08,
            washi_collimation: 0.7,
            scatter_strength: 1.0,
            scatter_ignite_cost_multiplier: 1.0,
        }
    }
}

impl CompilerConfig {
    /// Return a copy with every constant clamped into its usable range.
    ///
    /// Time constants that are zero, negative or NaN become
    /// [`MIN_TIME_CONSTANT`]; delays become non-negative; ratios are clamped to
    /// `[0, 1]`.
    pub fn sanitized(&self) -> Self {
        Self {
            seconds_per_voxel: positive(self.seconds_per_voxel),
            base_fuel: self.base_fuel.max(1),
            paper_extra_delay_per_cell: non_negative(self.paper_extra_delay_per_cell),
            cluster_window: positive(self.cluster_window),
            max_ignition_time: positive(self.max_ignition_time),
            fuse_burn_speed: positive(self.fuse_burn_speed),
            fuse_ignite_cost: non_negative(self.fuse_ignite_cost),
            washi_delay: non_negative(self.washi_delay),
            washi_collimation: unit(self.washi_collimation),
            scatter_strength: non_negative(self.scatter_strength),
            scatter_ignite_cost_multiplier: positive(self.scatter_ignite_cost_multiplier),
        }
    }
}

#[inline]
pub(crate) fn positive(v: f32) -> f32 {
    if v.is_nan() {
        MIN_TIME_CONSTANT
    } else {
        v.max(MIN_TIME_CONSTANT)
    }
}

#[inline]
pub(crate) fn non_negative(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.max(0.0) }
}

#[inline]
pub(crate) fn unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
