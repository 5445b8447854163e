//! Compiled show types and their persisted binary form.
//!
//! # Binary Format
//!
//! Little-endian throughout:
//!
//! ```text
//! Header (20 bytes):
//!   Magic: "HNB1" or "HNB2" (4 bytes)
//!   Version: i32
//!   Seed: u32
//!   Burst count: i32
//!   Particle count: i32
//!
//! Launch parameters (version 2 only, 20 bytes):
//!   speed, fuse duration, gravity scale, wind scale, drag scale: f32 x 5
//!
//! Burst records (28 bytes each):
//!   time: f32, position: f32 x 3, effect id: i32, count: i32, start: i32
//!
//! Particle records (46 bytes each):
//!   position: f32 x 3, velocity: f32 x 3, life: f32, size: f32,
//!   color: u8 x 4, delay: f32, profile id: u16, seed: u32
//! ```

mod file;
mod format;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::schema::{LaunchDef, Rgba};

pub use file::{ShowFileError, load_show, save_show};
pub use format::{
    BURST_RECORD_SIZE, FormatError, FormatVersion, HEADER_SIZE, LAUNCH_SIZE, MAGIC_V1, MAGIC_V2,
    PARTICLE_RECORD_SIZE, decode, decode_into, encode,
};

/// Mortar launch parameters carried with a show.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchParams {
    pub speed: f32,
    pub fuse_duration: f32,
    pub gravity_scale: f32,
    pub wind_scale: f32,
    pub drag_scale: f32,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self::from(&LaunchDef::default())
    }
}

impl From<&LaunchDef> for LaunchParams {
    fn from(def: &LaunchDef) -> Self {
        Self {
            speed: def.speed,
            fuse_duration: def.fuse_duration,
            gravity_scale: def.gravity_scale,
            wind_scale: def.wind_scale,
            drag_scale: def.drag_scale,
        }
    }
}

/// One timestamped explosion referencing a contiguous particle range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstEvent {
    /// Seconds after the shell's break charge lights.
    pub time: f32,
    /// Shell-local centroid.
    pub position: Vec3,
    /// Decorative effect id, -1 for none.
    pub effect_id: i32,
    pub count: u32,
    pub start: u32,
}

impl BurstEvent {
    /// Index range into the particle array.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.start as usize + self.count as usize
    }
}

/// Initial conditions of one star particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleInit {
    pub position: Vec3,
    pub velocity: Vec3,
    pub life: f32,
    pub size: f32,
    pub color: Rgba,
    /// Spawn delay relative to the owning burst.
    pub delay: f32,
    pub profile_id: u16,
    /// Seed for render-time pseudo-randomness.
    pub seed: u32,
}

/// Everything playback needs for one shell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledShow {
    pub seed: u32,
    pub launch: LaunchParams,
    /// Ascending by `time`.
    pub bursts: Vec<BurstEvent>,
    pub particles: Vec<ParticleInit>,
}

impl CompiledShow {
    /// Whether burst timestamps are non-decreasing.
    pub fn is_time_ordered(&self) -> bool {
        self.bursts.windows(2).all(|w| w[0].time <= w[1].time)
    }

    /// Time of the last burst, or 0 for an empty show.
    pub fn duration(&self) -> f32 {
        self.bursts.last().map(|b| b.time).unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty() && self.particles.is_empty()
    }

    /// Encode with the current format version.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self, FormatVersion::V2)
    }
}
