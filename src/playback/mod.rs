//! Playback module - Runtime simulation of compiled shows.
//!
//! A [`ShowPlayer`] fires bursts from a decoded [`CompiledShow`](crate::show::CompiledShow)
//! into a fixed-capacity [`ParticleIntegrator`], which is stepped once per frame
//! and read out as [`RenderParticle`] snapshots.

mod integrator;
mod player;
mod snapshot;

pub use integrator::*;
pub use player::*;
pub use snapshot::*;
