//! Time-driven playback of a compiled show.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::integrator::{GRAVITY, ParticleIntegrator};
use crate::schema::Intent;
use crate::show::CompiledShow;

/// Default number of live particle slots.
pub const DEFAULT_CAPACITY: usize = 65_536;

/// Ambient conditions applied every step, before launch scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub wind: Vec3,
    pub drag: f32,
    pub gravity_scale: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_intent(&Intent::default())
    }
}

impl Environment {
    /// Conditions the blueprint author expected at playback.
    pub fn from_intent(intent: &Intent) -> Self {
        Self {
            wind: intent.wind,
            drag: intent.drag,
            gravity_scale: 1.0,
        }
    }
}

/// Fires a show's bursts into an integrator as its clock advances.
///
/// The shell rises for `launch.fuse_duration` seconds, then each burst fires
/// at `fuse_duration + burst.time`, offset to the apex of the launch.
pub struct ShowPlayer {
    show: CompiledShow,
    integrator: ParticleIntegrator,
    environment: Environment,
    origin: Vec3,
    clock: f32,
    next_burst: usize,
}

impl ShowPlayer {
    pub fn new(show: CompiledShow, capacity: usize) -> Self {
        Self {
            show,
            integrator: ParticleIntegrator::new(capacity),
            environment: Environment::default(),
            origin: Vec3::ZERO,
            clock: 0.0,
            next_burst: 0,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Mortar position in world space.
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn show(&self) -> &CompiledShow {
        &self.show
    }

    pub fn integrator(&self) -> &ParticleIntegrator {
        &self.integrator
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Bursts fired so far.
    pub fn fired(&self) -> usize {
        self.next_burst
    }

    /// World-space break point of the shell.
    pub fn apex(&self) -> Vec3 {
        let launch = &self.show.launch;
        let g = GRAVITY.length() * launch.gravity_scale * self.environment.gravity_scale;
        // Height after the fuse burns, capped at the top of the arc.
        let t = launch.fuse_duration.max(0.0);
        let height = if g > 0.0 {
            let rise = (launch.speed / g).min(t);
            launch.speed * rise - 0.5 * g * rise * rise
        } else {
            launch.speed * t
        };
        self.origin + Vec3::Y * height.max(0.0)
    }

    /// Clock time at which burst `index` fires.
    pub fn fire_time(&self, index: usize) -> Option<f32> {
        self.show
            .bursts
            .get(index)
            .map(|b| self.show.launch.fuse_duration + b.time)
    }

    /// Advance by `dt`: fire due bursts in order, then step the integrator.
    ///
    /// Returns the number of bursts fired this call.
    pub fn update(&mut self, dt: f32) -> usize {
        self.clock += dt;

        let apex = self.apex();
        let mut fired = 0;
        while let Some(at) = self.fire_time(self.next_burst) {
            if self.clock < at {
                break;
            }
            let burst = self.show.bursts[self.next_burst];
            self.integrator
                .append_spawn(&self.show.particles, burst.range(), apex + burst.position);
            self.next_burst += 1;
            fired += 1;
        }

        let launch = &self.show.launch;
        let env = &self.environment;
        self.integrator.step(
            dt,
            env.wind * launch.wind_scale,
            env.drag * launch.drag_scale,
            env.gravity_scale * launch.gravity_scale,
        );

        fired
    }

    /// All bursts fired and every particle expired.
    pub fn is_finished(&self) -> bool {
        self.next_burst >= self.show.bursts.len() && self.integrator.is_empty()
    }

    /// Rewind to the launch.
    pub fn reset(&mut self) {
        self.clock = 0.0;
        self.next_burst = 0;
        self.integrator.clear();
    }
}
