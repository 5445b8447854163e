//! Compute module - The shell compilation pipeline.
//!
//! Baker -> ignition solver -> region clustering -> kinematics solver,
//! orchestrated by [`compile`].

mod baker;
mod clustering;
mod compiler;
mod hash;
mod ignition;
mod kinematics;
mod volume;

pub use baker::*;
pub use clustering::*;
pub use compiler::*;
pub use hash::*;
pub use ignition::*;
pub use kinematics::*;
pub use volume::*;
