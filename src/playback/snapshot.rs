//! Read-only snapshots of integrator state for rendering.

use std::f32::consts::{FRAC_PI_2, TAU};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::integrator::{ParticleIntegrator, TRAIL_LEN};
use crate::compute::{hash_pair, hash_u32, hash_unit};
use crate::schema::{ProfileIndex, StarKind};

/// Strobe blink frequency in Hz.
const STROBE_HZ: f32 = 7.5;
/// Glitter sparkle changes every this many ticks.
const GLITTER_TICKS: u64 = 3;
/// Fraction of life after which crackle and crossette stars split.
const SPLIT_AT: f32 = 0.7;
const CRACKLE_FRAGMENTS: u32 = 5;
const CROSSETTE_ARMS: u32 = 4;
const COMET_STREAK: usize = 4;
const WILLOW_TINT: [f32; 3] = [1.0, 0.72, 0.32];

/// One renderable point.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct RenderParticle {
    pub position: [f32; 3],
    pub size: f32,
    /// Linear RGBA in `[0, 1]`.
    pub color: [f32; 4],
}

impl RenderParticle {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    fn new(position: Vec3, size: f32, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            size,
            color,
        }
    }
}

/// Maps profile ids to visual kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct KindTable {
    kinds: Vec<StarKind>,
}

impl KindTable {
    /// Table for shows compiled without a database (profile id = kind).
    pub fn builtin() -> Self {
        Self {
            kinds: StarKind::ALL.to_vec(),
        }
    }

    pub fn new(kinds: Vec<StarKind>) -> Self {
        Self { kinds }
    }

    /// Table matching the profile ids `compile` assigns for `profiles`.
    pub fn for_profiles(profiles: Option<&ProfileIndex>) -> Self {
        match profiles.map(|p| p.kind_table()) {
            Some(kinds) if !kinds.is_empty() => Self::new(kinds),
            _ => Self::builtin(),
        }
    }

    /// Kind for `profile_id`; unknown ids render as [`StarKind::Solid`].
    pub fn kind(&self, profile_id: u16) -> StarKind {
        self.kinds
            .get(profile_id as usize)
            .copied()
            .unwrap_or(StarKind::Solid)
    }
}

impl Default for KindTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Bounded writer over a caller-provided buffer.
struct Sink<'a> {
    out: &'a mut [RenderParticle],
    len: usize,
}

impl Sink<'_> {
    fn is_full(&self) -> bool {
        self.len == self.out.len()
    }

    fn push(&mut self, p: RenderParticle) {
        if let Some(slot) = self.out.get_mut(self.len) {
            *slot = p;
            self.len += 1;
        }
    }
}

/// Uniform unit vector from a hash.
fn hashed_direction(h: u32) -> Vec3 {
    let z = hash_unit(h) * 2.0 - 1.0;
    let phi = hash_unit(hash_u32(h ^ 0x5bd1_e995)) * TAU;
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

impl ParticleIntegrator {
    /// Visible slots as plain points, without kind modulation.
    ///
    /// Returns the number of entries written; stops when `out` is full.
    pub fn fill_particles(&self, out: &mut [RenderParticle]) -> usize {
        let mut sink = Sink { out, len: 0 };
        for i in 0..self.len() {
            if sink.is_full() {
                break;
            }
            if self.is_visible(i) {
                sink.push(self.plain(i, self.fade(i)));
            }
        }
        sink.len
    }

    /// Visible slots with per-kind modulation and derived trail or split points.
    ///
    /// A single slot may write several entries. Returns the number written.
    pub fn fill_particles_by_kind(&self, kinds: &KindTable, out: &mut [RenderParticle]) -> usize {
        let mut sink = Sink { out, len: 0 };
        for i in 0..self.len() {
            if sink.is_full() {
                break;
            }
            if self.is_visible(i) {
                self.emit(i, kinds.kind(self.profile_id[i]), &mut sink);
            }
        }
        sink.len
    }

    /// Fraction of life elapsed, in `[0, 1]`.
    fn life_fraction(&self, i: usize) -> f32 {
        (self.age[i] / self.life[i].max(f32::EPSILON)).clamp(0.0, 1.0)
    }

    fn fade(&self, i: usize) -> f32 {
        1.0 - self.life_fraction(i)
    }

    fn rgba(&self, i: usize, alpha: f32) -> [f32; 4] {
        let c = self.color[i];
        [
            c.r as f32 / 255.0,
            c.g as f32 / 255.0,
            c.b as f32 / 255.0,
            c.a as f32 / 255.0 * alpha,
        ]
    }

    fn plain(&self, i: usize, alpha: f32) -> RenderParticle {
        RenderParticle::new(self.position[i], self.size[i], self.rgba(i, alpha))
    }

    /// Seconds since the split point, if past it.
    fn split_age(&self, i: usize) -> Option<f32> {
        let split = self.life[i] * SPLIT_AT;
        (self.age[i] >= split).then(|| self.age[i] - split)
    }

    fn emit(&self, i: usize, kind: StarKind, sink: &mut Sink<'_>) {
        let fade = self.fade(i);
        let seed = self.seed[i];

        match kind {
            StarKind::Solid => sink.push(self.plain(i, fade)),
            StarKind::Tail => {
                sink.push(self.plain(i, fade));
                self.emit_trail(i, fade, None, sink);
            }
            StarKind::Willow => {
                let t = self.life_fraction(i);
                let slow_fade = 1.0 - t * t;
                sink.push(self.plain(i, slow_fade));
                self.emit_trail(i, slow_fade, Some(WILLOW_TINT), sink);
            }
            StarKind::Comet => {
                let head = self.plain(i, fade);
                sink.push(RenderParticle {
                    size: head.size * 1.4,
                    ..head
                });
                let back = -self.velocity[i].normalize_or_zero();
                let spacing = self.size[i] * 1.5;
                for k in 1..=COMET_STREAK {
                    let falloff = 1.0 - k as f32 / (COMET_STREAK + 1) as f32;
                    sink.push(RenderParticle::new(
                        self.position[i] + back * spacing * k as f32,
                        self.size[i] * falloff,
                        self.rgba(i, fade * falloff),
                    ));
                }
            }
            StarKind::Strobe => {
                let phase = hash_unit(seed);
                if (self.age[i] * STROBE_HZ + phase).fract() < 0.5 {
                    sink.push(self.plain(i, fade));
                }
            }
            StarKind::Glitter => {
                let bucket = (self.tick() / GLITTER_TICKS) as u32;
                let sparkle = hash_unit(hash_pair(seed, bucket));
                let p = self.plain(i, fade * (0.15 + 0.85 * sparkle * sparkle));
                sink.push(RenderParticle {
                    size: p.size * (0.5 + sparkle),
                    ..p
                });
            }
            StarKind::Crackle => {
                let Some(since) = self.split_age(i) else {
                    sink.push(self.plain(i, fade));
                    return;
                };
                sink.push(self.plain(i, fade * 0.5));
                let radius = since * self.velocity[i].length() * 0.3 + self.size[i];
                let tick = self.tick() as u32;
                for k in 0..CRACKLE_FRAGMENTS {
                    let h = hash_pair(seed, k);
                    if hash_unit(hash_pair(h, tick)) < 0.3 {
                        continue;
                    }
                    sink.push(RenderParticle::new(
                        self.position[i] + hashed_direction(h) * radius,
                        self.size[i] * 0.45,
                        [1.0, 0.95, 0.8, fade],
                    ));
                }
            }
            StarKind::Crossette => {
                let Some(since) = self.split_age(i) else {
                    sink.push(self.plain(i, fade));
                    return;
                };
                let axis = self.velocity[i].normalize_or_zero();
                let axis = if axis == Vec3::ZERO { Vec3::Y } else { axis };
                let u = axis.any_orthonormal_vector();
                let w = axis.cross(u);
                let radius = since * self.velocity[i].length() * 0.5 + self.size[i];
                let base = hash_unit(seed) * FRAC_PI_2;
                for k in 0..CROSSETTE_ARMS {
                    let theta = base + k as f32 * FRAC_PI_2;
                    let offset = (u * theta.cos() + w * theta.sin()) * radius;
                    sink.push(RenderParticle::new(
                        self.position[i] + offset,
                        self.size[i] * 0.7,
                        self.rgba(i, fade),
                    ));
                }
            }
        }
    }

    fn emit_trail(&self, i: usize, alpha: f32, tint: Option<[f32; 3]>, sink: &mut Sink<'_>) {
        let mut color = self.rgba(i, 1.0);
        if let Some(tint) = tint {
            for (c, t) in color.iter_mut().zip(tint) {
                *c = (*c + t) * 0.5;
            }
        }
        let base_alpha = color[3] * alpha;

        for (k, p) in self.trail(i).enumerate() {
            let falloff = 1.0 - (k + 1) as f32 / (TRAIL_LEN + 1) as f32;
            color[3] = base_alpha * falloff * 0.6;
            sink.push(RenderParticle::new(p, self.size[i] * (0.4 + 0.6 * falloff), color));
        }
    }
}
