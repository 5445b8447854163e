//! Fixed-capacity structure-of-arrays particle integrator.

use std::ops::Range;

use glam::Vec3;

use crate::schema::Rgba;
use crate::show::ParticleInit;

/// Gravitational acceleration in shell-local units.
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Number of past positions kept per slot for trail effects.
pub const TRAIL_LEN: usize = 8;

/// Live particle state, one entry per slot in every array.
///
/// Slots `0..len` are live. All arrays are allocated to `capacity` up front and
/// never grow; spawns beyond capacity are dropped.
#[derive(Debug, Clone)]
pub struct ParticleIntegrator {
    capacity: usize,
    len: usize,
    tick: u64,
    pub(super) position: Vec<Vec3>,
    pub(super) velocity: Vec<Vec3>,
    /// Negative while waiting for the spawn delay to elapse.
    pub(super) age: Vec<f32>,
    pub(super) life: Vec<f32>,
    pub(super) color: Vec<Rgba>,
    pub(super) size: Vec<f32>,
    pub(super) profile_id: Vec<u16>,
    pub(super) seed: Vec<u32>,
    pub(super) trail: Vec<[Vec3; TRAIL_LEN]>,
    /// Next write position in each trail ring.
    pub(super) trail_head: Vec<u8>,
}

impl ParticleIntegrator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            len: 0,
            tick: 0,
            position: vec![Vec3::ZERO; capacity],
            velocity: vec![Vec3::ZERO; capacity],
            age: vec![0.0; capacity],
            life: vec![0.0; capacity],
            color: vec![Rgba::WHITE; capacity],
            size: vec![0.0; capacity],
            profile_id: vec![0; capacity],
            seed: vec![0; capacity],
            trail: vec![[Vec3::ZERO; TRAIL_LEN]; capacity],
            trail_head: vec![0; capacity],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live slots, including ones still waiting to spawn.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Steps taken since creation or the last [`clear`](Self::clear).
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether slot `i` has passed its spawn delay.
    #[inline]
    pub fn is_visible(&self, i: usize) -> bool {
        i < self.len && self.age[i] >= 0.0
    }

    /// Number of slots past their spawn delay.
    pub fn visible_count(&self) -> usize {
        self.age[..self.len].iter().filter(|&&a| a >= 0.0).count()
    }

    pub fn position(&self, i: usize) -> Vec3 {
        self.position[i]
    }

    pub fn velocity(&self, i: usize) -> Vec3 {
        self.velocity[i]
    }

    pub fn age(&self, i: usize) -> f32 {
        self.age[i]
    }

    pub fn seed(&self, i: usize) -> u32 {
        self.seed[i]
    }

    /// Past positions of slot `i`, newest first.
    pub fn trail(&self, i: usize) -> impl Iterator<Item = Vec3> + '_ {
        let head = self.trail_head[i] as usize;
        let ring = &self.trail[i];
        (1..=TRAIL_LEN).map(move |k| ring[(head + TRAIL_LEN - k) % TRAIL_LEN])
    }

    /// Drop every live slot.
    pub fn clear(&mut self) {
        self.len = 0;
        self.tick = 0;
    }

    /// Spawn `particles[range]` offset by `offset`.
    ///
    /// Each slot starts at `age = -delay`. Particles that do not fit are
    /// dropped. Returns the number actually spawned.
    pub fn append_spawn(&mut self, particles: &[ParticleInit], range: Range<usize>, offset: Vec3) -> usize {
        let end = range.end.min(particles.len());
        let start = range.start.min(end);
        let requested = end - start;
        let count = requested.min(self.remaining());

        if count < requested {
            log::warn!(
                "Integrator full: dropped {} of {} spawned particles",
                requested - count,
                requested
            );
        }

        for p in &particles[start..start + count] {
            let slot = self.len;
            let position = p.position + offset;
            self.position[slot] = position;
            self.velocity[slot] = p.velocity;
            self.age[slot] = -p.delay.max(0.0);
            self.life[slot] = p.life;
            self.color[slot] = p.color;
            self.size[slot] = p.size;
            self.profile_id[slot] = p.profile_id;
            self.seed[slot] = p.seed;
            self.trail[slot] = [position; TRAIL_LEN];
            self.trail_head[slot] = 0;
            self.len += 1;
        }

        count
    }

    /// Advance every live slot by `dt` and compact out expired ones.
    ///
    /// Survivors keep their relative order.
    pub fn step(&mut self, dt: f32, wind: Vec3, drag: f32, gravity_scale: f32) {
        let accel = GRAVITY * gravity_scale + wind;
        let mut write = 0;

        for read in 0..self.len {
            self.age[read] += dt;
            let age = self.age[read];

            if age >= 0.0 {
                if age >= self.life[read] {
                    continue;
                }

                let mut v = self.velocity[read] + accel * dt;
                v *= (1.0 - drag * v.length() * dt).max(0.0);
                self.velocity[read] = v;

                let head = self.trail_head[read] as usize;
                self.trail[read][head] = self.position[read];
                self.trail_head[read] = ((head + 1) % TRAIL_LEN) as u8;

                self.position[read] += v * dt;
            }

            if write != read {
                self.move_slot(read, write);
            }
            write += 1;
        }

        self.len = write;
        self.tick += 1;
    }

    fn move_slot(&mut self, from: usize, to: usize) {
        self.position[to] = self.position[from];
        self.velocity[to] = self.velocity[from];
        self.age[to] = self.age[from];
        self.life[to] = self.life[from];
        self.color[to] = self.color[from];
        self.size[to] = self.size[from];
        self.profile_id[to] = self.profile_id[from];
        self.seed[to] = self.seed[from];
        self.trail[to] = self.trail[from];
        self.trail_head[to] = self.trail_head[from];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn particle(seed: u32, life: f32, delay: f32) -> ParticleInit {
        ParticleInit {
            position: Vec3::ZERO,
            velocity: Vec3::new(1.0, 2.0, 0.0),
            life,
            size: 0.05,
            color: Rgba::WHITE,
            delay,
            profile_id: 0,
            seed,
        }
    }

    #[test]
    fn test_spawn_applies_offset_and_delay() {
        let particles = vec![particle(0, 1.0, 0.25), particle(1, 1.0, 0.0)];
        let mut integrator = ParticleIntegrator::new(4);

        let spawned = integrator.append_spawn(&particles, 0..2, Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(spawned, 2);
        assert_eq!(integrator.position(0), Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(integrator.age(0), -0.25);
        assert!(!integrator.is_visible(0));
        assert!(integrator.is_visible(1));
        assert!(integrator.trail(0).all(|p| p == Vec3::new(0.0, 10.0, 0.0)));
    }

    #[test]
    fn test_spawn_truncates_at_capacity() {
        let particles: Vec<_> = (0..10).map(|i| particle(i, 1.0, 0.0)).collect();
        let mut integrator = ParticleIntegrator::new(6);

        assert_eq!(integrator.append_spawn(&particles, 0..4, Vec3::ZERO), 4);
        assert_eq!(integrator.append_spawn(&particles, 4..10, Vec3::ZERO), 2);
        assert_eq!(integrator.len(), 6);
        assert_eq!(integrator.append_spawn(&particles, 0..10, Vec3::ZERO), 0);
        assert_eq!(integrator.seed(5), 5);
    }

    #[test]
    fn test_spawn_clamps_range_to_slice() {
        let particles = vec![particle(0, 1.0, 0.0)];
        let mut integrator = ParticleIntegrator::new(4);
        assert_eq!(integrator.append_spawn(&particles, 0..5, Vec3::ZERO), 1);
        assert_eq!(integrator.append_spawn(&particles, 3..5, Vec3::ZERO), 0);
    }

    #[test]
    fn test_delayed_slot_does_not_move() {
        let particles = vec![particle(0, 1.0, 0.5)];
        let mut integrator = ParticleIntegrator::new(1);
        integrator.append_spawn(&particles, 0..1, Vec3::ZERO);

        integrator.step(0.1, Vec3::ZERO, 0.0, 1.0);
        assert_eq!(integrator.len(), 1);
        assert_eq!(integrator.position(0), Vec3::ZERO);
        assert!(!integrator.is_visible(0));
        assert!((integrator.age(0) + 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_gravity_and_trail() {
        let particles = vec![particle(0, 5.0, 0.0)];
        let mut integrator = ParticleIntegrator::new(1);
        integrator.append_spawn(&particles, 0..1, Vec3::ZERO);

        integrator.step(0.1, Vec3::ZERO, 0.0, 1.0);
        let v = integrator.velocity(0);
        assert!((v.y - (2.0 - 0.981)).abs() < 1e-5, "Gravity should pull down: {:?}", v);
        assert!((integrator.position(0) - v * 0.1).length() < 1e-6);

        let first = integrator.position(0);
        integrator.step(0.1, Vec3::ZERO, 0.0, 1.0);
        let trail: Vec<_> = integrator.trail(0).collect();
        assert_eq!(trail[0], first, "Newest trail entry is the pre-step position");
        assert_eq!(trail[1], Vec3::ZERO);
    }

    #[test]
    fn test_drag_and_wind() {
        let particles = vec![particle(0, 5.0, 0.0)];
        let mut integrator = ParticleIntegrator::new(1);
        integrator.append_spawn(&particles, 0..1, Vec3::ZERO);

        integrator.step(0.1, Vec3::new(5.0, 0.0, 0.0), 0.0, 0.0);
        assert!((integrator.velocity(0).x - 1.5).abs() < 1e-5);

        let mut damped = ParticleIntegrator::new(1);
        damped.append_spawn(&particles, 0..1, Vec3::ZERO);
        damped.step(0.1, Vec3::ZERO, 0.5, 0.0);
        assert!(damped.velocity(0).length() < particles[0].velocity.length());
    }

    #[test]
    fn test_expired_slots_compact_in_order() {
        let particles = vec![
            particle(0, 1.0, 0.0),
            particle(1, 0.05, 0.0),
            particle(2, 1.0, 0.0),
            particle(3, 0.05, 0.0),
            particle(4, 1.0, 0.0),
        ];
        let mut integrator = ParticleIntegrator::new(8);
        integrator.append_spawn(&particles, 0..5, Vec3::ZERO);

        integrator.step(0.1, Vec3::ZERO, 0.0, 1.0);
        let seeds: Vec<_> = (0..integrator.len()).map(|i| integrator.seed(i)).collect();
        assert_eq!(seeds, vec![0, 2, 4]);
    }

    proptest! {
        #[test]
        fn prop_capacity_never_exceeded(
            capacity in 0usize..64,
            batches in proptest::collection::vec(0usize..40, 1..6),
        ) {
            let particles: Vec<_> = (0..40).map(|i| particle(i, 1.0, 0.0)).collect();
            let mut integrator = ParticleIntegrator::new(capacity);

            for n in batches {
                let before = integrator.len();
                let spawned = integrator.append_spawn(&particles, 0..n, Vec3::ZERO);
                prop_assert_eq!(spawned, n.min(capacity - before));
                prop_assert_eq!(integrator.len(), (before + n).min(capacity));
            }
        }

        #[test]
        fn prop_step_compacts_stably(
            lives in proptest::collection::vec(0.01f32..1.0, 1..48),
            delays in proptest::collection::vec(0.0f32..0.5, 48),
            dt in 0.01f32..0.3,
        ) {
            let particles: Vec<_> = lives
                .iter()
                .zip(&delays)
                .enumerate()
                .map(|(i, (&life, &delay))| particle(i as u32, life, delay))
                .collect();
            let mut integrator = ParticleIntegrator::new(particles.len());
            integrator.append_spawn(&particles, 0..particles.len(), Vec3::ZERO);

            for _ in 0..4 {
                integrator.step(dt, Vec3::ZERO, 0.1, 1.0);
                for i in 0..integrator.len() {
                    let p = &particles[integrator.seed(i) as usize];
                    prop_assert!(integrator.age(i) < p.life, "Expired slot survived");
                    if i > 0 {
                        prop_assert!(integrator.seed(i - 1) < integrator.seed(i), "Order changed");
                    }
                    if !integrator.is_visible(i) {
                        prop_assert_eq!(integrator.position(i), Vec3::ZERO);
                    }
                }
            }
        }
    }
}
