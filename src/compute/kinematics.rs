//! Per-star initial particle state.
//!
//! Speed comes from the fuel around a star and along the path from the shell
//! center; direction starts radial and is perturbed, collimated by paper and
//! biased back toward radial by uniformity.

use std::collections::BTreeMap;

use glam::Vec3;
use rand::prelude::*;
use rand_distr::UnitBall;

use super::{IgnitionField, VoxelVolume};
use crate::schema::{Rgba, ScatterDef, StarKind, StarProfile, WashiDef};
use crate::show::ParticleInit;

/// Fuel samples taken along the center-to-star ray.
pub const RAY_SAMPLES: usize = 24;
/// Weight of the 3x3x3 neighborhood fuel average in the speed multiplier.
pub const LOCAL_FUEL_WEIGHT: f32 = 0.6;
/// Weight of the ray-marched fuel integral in the speed multiplier.
pub const RAY_FUEL_WEIGHT: f32 = 0.9;
/// Fraction of the way uniformity slerps a direction back to radial.
pub const RADIAL_BIAS: f32 = 0.5;
/// Lower bound on particle life (seconds).
pub const MIN_LIFE: f32 = 0.05;
/// Lower bound on particle size.
pub const MIN_SIZE: f32 = 0.001;

/// Life multiplier at the slowest and fastest relative speed, per kind.
///
/// Indexed by `StarKind as usize`.
const LIFE_CURVES: [(f32, f32); 8] = [
    (1.10, 0.80), // Solid
    (0.90, 1.20), // Tail
    (0.95, 1.35), // Comet
    (1.00, 1.10), // Strobe
    (1.05, 0.90), // Glitter
    (1.00, 0.85), // Crackle
    (0.95, 1.05), // Crossette
    (1.20, 1.60), // Willow
];

/// Life multiplier for a kind at normalized relative speed `t` in `[0, 1]`.
pub fn life_scale(kind: StarKind, t: f32) -> f32 {
    let (slow, fast) = LIFE_CURVES[kind as usize];
    lerp(slow, fast, t.clamp(0.0, 1.0))
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn signed_unit(rng: &mut impl Rng) -> f32 {
    rng.r#gen::<f32>() * 2.0 - 1.0
}

/// Spherical interpolation between unit vectors.
pub fn slerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let dot = a.dot(b).clamp(-1.0, 1.0);
    let theta = dot.acos();
    let sin_theta = theta.sin();
    if sin_theta.abs() < 1e-4 {
        return a.lerp(b, t).try_normalize().unwrap_or(b);
    }
    (a * ((1.0 - t) * theta).sin() + b * (t * theta).sin()) / sin_theta
}

/// Inputs shared by every star of one compile.
pub struct KinematicsSolver<'a> {
    pub volume: &'a VoxelVolume,
    pub field: &'a IgnitionField,
    pub palette: &'a [Rgba],
    /// Star profiles keyed by the profile id stored in the volume.
    pub profiles: &'a BTreeMap<u16, StarProfile>,
    /// Used for ids missing from `profiles`.
    pub fallback_profile: &'a StarProfile,
    pub scatter: &'a ScatterDef,
    pub washi: &'a WashiDef,
}

impl<'a> KinematicsSolver<'a> {
    /// Average normalized fuel over the 3x3x3 block around a cell.
    pub fn local_fuel(&self, i: usize) -> f32 {
        let volume = self.volume;
        let (x, y, z) = volume.coords(i);
        let res = volume.res as i64;
        let mut sum = 0.0;
        let mut count = 0;

        for dz in -1i64..=1 {
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let (nx, ny, nz) = (x as i64 + dx, y as i64 + dy, z as i64 + dz);
                    if (0..res).contains(&nx) && (0..res).contains(&ny) && (0..res).contains(&nz) {
                        let n = volume.idx(nx as usize, ny as usize, nz as usize);
                        sum += volume.fuel[n] as f32 / 255.0;
                        count += 1;
                    }
                }
            }
        }

        if count > 0 { sum / count as f32 } else { 0.0 }
    }

    /// March from the shell center to `p`.
    ///
    /// Returns the mean normalized fuel along the ray and the strongest paper
    /// crossed (0 when none, 1 for a wall without strength).
    pub fn march(&self, p: Vec3) -> (f32, f32) {
        let volume = self.volume;
        let mut fuel = 0.0;
        let mut paper = 0.0f32;

        for k in 0..RAY_SAMPLES {
            let t = (k as f32 + 0.5) / RAY_SAMPLES as f32;
            let Some(i) = volume.cell_at(p * t) else {
                continue;
            };
            fuel += volume.fuel[i] as f32 / 255.0;
            if volume.has_paper(i) {
                let strength = match volume.paper_strength[i] {
                    0 => 1.0,
                    s => s as f32 / 255.0,
                };
                paper = paper.max(strength);
            }
        }

        (fuel / RAY_SAMPLES as f32, paper)
    }

    fn profile(&self, id: u16) -> &StarProfile {
        self.profiles.get(&id).unwrap_or(self.fallback_profile)
    }

    fn color(&self, index: u8, brightness: f32) -> Rgba {
        let mut color = match self.palette.len() {
            0 => Rgba::WHITE,
            n => self.palette[(index as usize).min(n - 1)],
        };
        color.a = (color.a as f32 * brightness.clamp(0.0, 1.0)).round() as u8;
        color
    }

    /// Compute the initial state of one star voxel.
    ///
    /// `region_start` is the owning region's start time for clustered
    /// compiles; the star's delay then includes its offset within the region.
    pub fn solve_star(&self, voxel: u32, region_start: Option<f32>, rng: &mut StdRng) -> ParticleInit {
        let i = voxel as usize;
        let profile_id = self.volume.star_profile[i];
        let profile = self.profile(profile_id);
        let p = self.volume.cell_center(i);
        let radial = p.try_normalize().unwrap_or(Vec3::Y);

        let local = self.local_fuel(i);
        let (ray, paper) = self.march(p);

        let fuel_boost = 1.0 + LOCAL_FUEL_WEIGHT * local + RAY_FUEL_WEIGHT * ray;
        let mut speed = profile.base_speed * fuel_boost;
        speed *= 1.0 + profile.speed_jitter * signed_unit(rng);
        speed *= self.scatter.strength;
        speed = speed.max(0.0);

        let uniformity = self.scatter.uniformity.clamp(0.0, 1.0);
        let spread = self.scatter.strength * lerp(1.1, 0.15, uniformity);
        let jitter = Vec3::from_array(UnitBall.sample(rng));
        let mut dir = (radial + jitter * spread).try_normalize().unwrap_or(radial);

        if paper > 0.0 {
            let blend = (self.washi.collimation * paper).clamp(0.0, 1.0);
            let axial = (radial * dir.dot(radial).max(0.0))
                .try_normalize()
                .unwrap_or(radial);
            dir = dir.lerp(axial, blend).try_normalize().unwrap_or(radial);
        }

        dir = slerp(dir, radial, uniformity * RADIAL_BIAS);

        let relative_speed = if profile.base_speed > 0.0 {
            speed / profile.base_speed
        } else {
            1.0
        };
        let mut life = profile.base_life + profile.life_jitter * signed_unit(rng);
        life *= life_scale(profile.kind, (relative_speed - 1.0) / 1.5);
        let life = life.max(MIN_LIFE);

        let size = (profile.base_size + profile.size_jitter * signed_unit(rng)).max(MIN_SIZE);

        let mut delay = if paper > 0.0 {
            self.washi.delay * paper
        } else {
            0.0
        };
        if let Some(start) = region_start {
            delay += (self.field.time(i) - start).max(0.0);
        }

        ParticleInit {
            position: p,
            velocity: dir * speed,
            life,
            size,
            color: self.color(self.volume.star_color[i], profile.brightness),
            delay,
            profile_id,
            seed: 0,
        }
    }

    /// Solve a set of star voxels, appending to `out` in input order.
    pub fn solve(
        &self,
        voxels: &[u32],
        region_start: Option<f32>,
        rng: &mut StdRng,
        out: &mut Vec<ParticleInit>,
    ) {
        out.reserve(voxels.len());
        for &v in voxels {
            out.push(self.solve_star(v, region_start, rng));
        }
    }
}
