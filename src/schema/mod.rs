//! Schema module - Blueprint, configuration and profile types for shell compilation.

mod blueprint;
mod config;
mod profile;

pub use blueprint::*;
pub use config::*;
pub use profile::*;
