//! Firework Shell - Compile declarative shell blueprints into replayable bursts.
//!
//! A blueprint is voxelized, ignition times are propagated through its fuel
//! with a multi-source Dijkstra, stars that ignite together are clustered into
//! burst events, and every star gets solved initial conditions. The result is
//! a [`CompiledShow`](show::CompiledShow) with a compact binary encoding that a
//! fixed-capacity particle integrator plays back at runtime.
//!
//! # Architecture
//!
//! - `schema`: Blueprint, compiler configuration and profile database types
//! - `compute`: The compile pipeline (baker, ignition, clustering, kinematics)
//! - `show`: Compiled show types, binary codec and show files
//! - `playback`: Particle integrator, render snapshots and show player
//!
//! # Example
//!
//! ```rust,no_run
//! use firework_shell::{
//!     compute::compile,
//!     playback::{KindTable, RenderParticle, ShowPlayer},
//!     schema::Blueprint,
//!     show::{CompiledShow, decode},
//! };
//!
//! let blueprint = Blueprint::example();
//! let show = compile(&blueprint, None, Some(12345));
//!
//! // Persist and reload
//! let bytes = show.to_bytes();
//! let show: CompiledShow = decode(&bytes).expect("valid show");
//!
//! // Play back
//! let mut player = ShowPlayer::new(show, 65_536);
//! let mut frame = vec![RenderParticle::default(); 200_000];
//! let kinds = KindTable::builtin();
//! while !player.is_finished() {
//!     player.update(1.0 / 60.0);
//!     let n = player.integrator().fill_particles_by_kind(&kinds, &mut frame);
//!     println!("{} points at t={:.2}", n, player.clock());
//! }
//! ```

pub mod compute;
pub mod playback;
pub mod schema;
pub mod show;

// Re-export commonly used types
pub use compute::{CompileStats, compile, compile_with_stats};
pub use playback::{ParticleIntegrator, ShowPlayer};
pub use schema::{Blueprint, CompilerConfig, ProfileDatabase, ProfileIndex};
pub use show::{CompiledShow, FormatVersion};
