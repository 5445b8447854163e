//! Blueprint to voxel volume baking.
//!
//! Fuel fills the unit sphere, fuse lines and igniter leads are marked as fuse
//! cells, stars are scattered over a torus-like band and paper discs are
//! rasterized last.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::prelude::*;

use super::VoxelVolume;
use crate::schema::Blueprint;

/// Source of fuel density for cells inside the shell.
pub trait FuelField {
    /// Fuel density (0-255) at a shell-local position inside the unit sphere.
    fn density(&self, p: Vec3) -> u8;
}

/// Constant fuel density everywhere.
#[derive(Debug, Clone, Copy)]
pub struct UniformFuel(pub u8);

impl FuelField for UniformFuel {
    #[inline]
    fn density(&self, _p: Vec3) -> u8 {
        self.0
    }
}

/// Values the compiler resolves from tags before baking.
#[derive(Debug, Clone, Default)]
pub struct BakeOptions {
    /// Star profile id written into every star cell.
    pub star_profile: u16,
    /// Fuse slot per igniter (`None` = no fuse lead).
    pub igniter_fuse_slots: Vec<Option<u8>>,
    /// Fuse slot per fuse line.
    pub fuse_line_slots: Vec<u8>,
}

/// Bake a blueprint into a voxel volume.
///
/// `seed` drives star placement, so identical inputs produce identical volumes.
pub fn bake<F: FuelField>(
    blueprint: &Blueprint,
    seed: u32,
    fuel: &F,
    options: &BakeOptions,
) -> VoxelVolume {
    let res = blueprint.size.resolution();
    let base_fuel = blueprint.compiler.base_fuel.max(1);
    let mut volume = VoxelVolume::new(res);

    for i in 0..volume.len() {
        let p = volume.cell_center(i);
        if p.length() <= 1.0 {
            volume.fuel[i] = fuel.density(p);
        }
    }

    for (line, &slot) in blueprint.fuses.iter().zip(options.fuse_line_slots.iter()) {
        mark_fuse_line(&mut volume, line.start, line.end, slot, base_fuel);
    }

    for (igniter, slot) in blueprint
        .igniters
        .iter()
        .zip(options.igniter_fuse_slots.iter())
    {
        if let Some(slot) = slot {
            let i = volume.nearest_cell(igniter.position);
            if volume.is_passable(i) {
                volume.fuse[i] = slot.saturating_add(1);
            }
        }
    }

    let placed = scatter_stars(&mut volume, blueprint, seed, options.star_profile, base_fuel);

    for disc in &blueprint.papers {
        rasterize_paper(&mut volume, disc.center, disc.normal, disc.radius, disc.wall_id, disc.strength);
    }

    log::debug!(
        "Baked {}^3 volume: {} star samples placed, {} star cells",
        res,
        placed,
        volume.star_count()
    );

    volume
}

/// Scatter ring samples and mark their nearest cells as stars.
///
/// Returns the number of accepted samples. Rejected samples are not retried.
fn scatter_stars(
    volume: &mut VoxelVolume,
    blueprint: &Blueprint,
    seed: u32,
    profile: u16,
    base_fuel: u8,
) -> usize {
    let ring = &blueprint.stars;
    let thickness = ring.thickness.max(0.0);
    let mut rng = StdRng::seed_from_u64(seed as u64);
    let mut placed = 0;

    for _ in 0..ring.count {
        let theta = rng.r#gen::<f32>() * TAU;
        let r = ring.radius + (rng.r#gen::<f32>() * 2.0 - 1.0) * thickness;
        let h = (rng.r#gen::<f32>() * 2.0 - 1.0) * thickness;
        let p = Vec3::new(r * theta.cos(), h, r * theta.sin());

        if p.length() > 1.0 {
            continue;
        }

        let i = volume.nearest_cell(p);
        volume.star[i] = true;
        volume.star_color[i] = 0;
        volume.star_profile[i] = profile;
        volume.fuel[i] = volume.fuel[i].max(base_fuel);
        placed += 1;
    }

    placed
}

/// Clip a segment to the `[-1, 1]^3` grid cube.
fn clip_to_grid(start: Vec3, end: Vec3) -> Option<(Vec3, Vec3)> {
    let d = end - start;
    if !start.is_finite() || !d.is_finite() {
        return None;
    }

    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    for axis in 0..3 {
        let (s, v) = (start[axis], d[axis]);
        if v == 0.0 {
            if s.abs() > 1.0 {
                return None;
            }
            continue;
        }
        let a = (-1.0 - s) / v;
        let b = (1.0 - s) / v;
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
    }

    (t0 <= t1).then(|| (start + d * t0, start + d * t1))
}

fn mark_fuse_line(volume: &mut VoxelVolume, start: Vec3, end: Vec3, slot: u8, base_fuel: u8) {
    let Some((start, end)) = clip_to_grid(start, end) else {
        return;
    };
    let step = volume.voxel_size() * 0.5;
    let steps = ((end - start).length() / step).ceil().max(1.0) as usize;

    for s in 0..=steps {
        let p = start.lerp(end, s as f32 / steps as f32);
        if let Some(i) = volume.cell_at(p) {
            volume.fuse[i] = slot.saturating_add(1);
            volume.fuel[i] = volume.fuel[i].max(base_fuel);
        }
    }
}

/// Mark every cell within `radius` of the disc axis and within 1.2 cells of
/// its plane. Later discs overwrite earlier ones.
fn rasterize_paper(
    volume: &mut VoxelVolume,
    center: Vec3,
    normal: Vec3,
    radius: f32,
    wall_id: u16,
    strength: u8,
) {
    let n = normal.try_normalize().unwrap_or(Vec3::Y);
    let voxel = volume.voxel_size();
    let plane_tolerance = 1.2 * voxel;
    // The disc never needs to reach past the grid
    let reach = (radius.max(0.0) / voxel).ceil().min(volume.res as f32) as i64 + 1;
    let res = volume.res as i64;

    let c = volume.nearest_cell(center);
    let (cx, cy, cz) = volume.coords(c);
    let (cx, cy, cz) = (cx as i64, cy as i64, cz as i64);

    for z in (cz - reach).max(0)..=(cz + reach).min(res - 1) {
        for y in (cy - reach).max(0)..=(cy + reach).min(res - 1) {
            for x in (cx - reach).max(0)..=(cx + reach).min(res - 1) {
                let i = volume.idx(x as usize, y as usize, z as usize);
                let d = volume.cell_center(i) - center;
                let height = d.dot(n);
                let in_plane = d - n * height;

                if in_plane.length() <= radius && height.abs() <= plane_tolerance {
                    volume.paper_wall[i] = wall_id;
                    volume.paper_strength[i] = strength;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FuseLine, Igniter, PaperDisc, StarRing};

    fn ring_blueprint(count: u32) -> Blueprint {
        Blueprint {
            stars: StarRing {
                count,
                radius: 0.85,
                thickness: 0.08,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_fuel_fills_unit_sphere_only() {
        let blueprint = ring_blueprint(0);
        let volume = bake(&blueprint, 1, &UniformFuel(80), &BakeOptions::default());

        assert_eq!(volume.fuel[volume.center_cell()], 80);
        assert_eq!(volume.fuel[0], 0, "Corner lies outside the shell");
        assert_eq!(volume.star_count(), 0);
    }

    #[test]
    fn test_star_count_bounded_by_request() {
        let blueprint = ring_blueprint(1500);
        let volume = bake(&blueprint, 12345, &UniformFuel(80), &BakeOptions::default());

        let stars = volume.star_count();
        assert!(stars > 0);
        assert!(stars <= 1500);

        for i in volume.star_indices() {
            let p = volume.cell_center(i as usize);
            let planar = (p.x * p.x + p.z * p.z).sqrt();
            assert!(
                (planar - 0.85).abs() <= 0.08 + volume.voxel_size() * 2.0,
                "Star at radius {} is off the ring",
                planar
            );
            assert!(volume.is_passable(i as usize));
        }
    }

    #[test]
    fn test_out_of_sphere_samples_are_dropped() {
        // Band straddles the sphere boundary, so some samples must be rejected.
        let blueprint = Blueprint {
            stars: StarRing {
                count: 2000,
                radius: 0.98,
                thickness: 0.1,
            },
            ..Default::default()
        };
        let mut volume = VoxelVolume::new(blueprint.size.resolution());
        let placed = scatter_stars(&mut volume, &blueprint, 3, 0, 80);
        assert!(placed < 2000);
    }

    #[test]
    fn test_bake_is_deterministic() {
        let blueprint = ring_blueprint(800);
        let a = bake(&blueprint, 99, &UniformFuel(80), &BakeOptions::default());
        let b = bake(&blueprint, 99, &UniformFuel(80), &BakeOptions::default());
        assert_eq!(a, b);

        let c = bake(&blueprint, 100, &UniformFuel(80), &BakeOptions::default());
        assert_ne!(a.star, c.star);
    }

    #[test]
    fn test_paper_disc_rasterization() {
        let blueprint = Blueprint {
            papers: vec![PaperDisc {
                center: Vec3::new(0.0, 0.5, 0.0),
                normal: Vec3::Y,
                radius: 0.3,
                wall_id: 7,
                strength: 128,
            }],
            ..ring_blueprint(0)
        };
        let volume = bake(&blueprint, 1, &UniformFuel(80), &BakeOptions::default());

        let on_disc = volume.nearest_cell(Vec3::new(0.1, 0.5, 0.1));
        assert_eq!(volume.paper_wall[on_disc], 7);
        assert_eq!(volume.paper_strength[on_disc], 128);

        let off_plane = volume.nearest_cell(Vec3::new(0.0, 0.2, 0.0));
        assert_eq!(volume.paper_wall[off_plane], 0);

        let outside_radius = volume.nearest_cell(Vec3::new(0.6, 0.5, 0.0));
        assert_eq!(volume.paper_wall[outside_radius], 0);
    }

    #[test]
    fn test_overlapping_paper_last_write_wins() {
        let disc = |wall_id| PaperDisc {
            center: Vec3::ZERO,
            normal: Vec3::Z,
            radius: 0.2,
            wall_id,
            strength: 50,
        };
        let blueprint = Blueprint {
            papers: vec![disc(1), disc(2)],
            ..ring_blueprint(0)
        };
        let volume = bake(&blueprint, 1, &UniformFuel(80), &BakeOptions::default());
        assert_eq!(volume.paper_wall[volume.center_cell()], 2);
    }

    #[test]
    fn test_unbounded_paper_radius_covers_plane() {
        let blueprint = Blueprint {
            papers: vec![PaperDisc {
                center: Vec3::ZERO,
                normal: Vec3::Y,
                radius: f32::INFINITY,
                wall_id: 3,
                strength: 10,
            }],
            ..ring_blueprint(0)
        };
        let volume = bake(&blueprint, 1, &UniformFuel(80), &BakeOptions::default());

        let edge = volume.nearest_cell(Vec3::new(0.99, 0.0, -0.99));
        assert_eq!(volume.paper_wall[edge], 3, "Plane should be covered edge to edge");
        let off_plane = volume.nearest_cell(Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(volume.paper_wall[off_plane], 0);

        let huge = Blueprint {
            papers: vec![PaperDisc {
                radius: 1e30,
                ..blueprint.papers[0].clone()
            }],
            ..blueprint.clone()
        };
        let again = bake(&huge, 1, &UniformFuel(80), &BakeOptions::default());
        assert_eq!(again.paper_wall, volume.paper_wall);
    }

    #[test]
    fn test_far_fuse_line_is_clipped_to_grid() {
        let line = |end| FuseLine {
            start: Vec3::ZERO,
            end,
            fuse: "quickmatch".into(),
        };
        let blueprint = Blueprint {
            fuses: vec![line(Vec3::new(0.0, 1e12, 0.0)), line(Vec3::new(f32::INFINITY, 0.0, 0.0))],
            ..ring_blueprint(0)
        };
        let options = BakeOptions {
            fuse_line_slots: vec![0, 1],
            ..Default::default()
        };
        let volume = bake(&blueprint, 1, &UniformFuel(80), &options);

        let high = volume.nearest_cell(Vec3::new(0.0, 0.9, 0.0));
        assert_eq!(volume.fuse[high], 1, "Segment should run to the grid boundary");
        let low = volume.nearest_cell(Vec3::new(0.0, -0.5, 0.0));
        assert_eq!(volume.fuse[low], 0);
        let side = volume.nearest_cell(Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(volume.fuse[side], 0, "Non-finite segments are skipped");
    }

    #[test]
    fn test_clip_to_grid() {
        let (a, b) = clip_to_grid(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)).unwrap();
        assert!((a.x + 1.0).abs() < 1e-6 && (b.x - 1.0).abs() < 1e-6);

        assert!(clip_to_grid(Vec3::new(2.0, 2.0, 0.0), Vec3::new(3.0, 2.0, 0.0)).is_none());

        let inside = (Vec3::splat(-0.5), Vec3::splat(0.5));
        assert_eq!(clip_to_grid(inside.0, inside.1), Some(inside));
    }

    #[test]
    fn test_fuse_cells() {
        let blueprint = Blueprint {
            igniters: vec![Igniter {
                position: Vec3::new(0.0, -0.5, 0.0),
                fuse: "lead".into(),
                start_delay: 0.0,
            }],
            fuses: vec![FuseLine {
                start: Vec3::new(-0.5, 0.0, 0.0),
                end: Vec3::new(0.5, 0.0, 0.0),
                fuse: "quickmatch".into(),
            }],
            ..ring_blueprint(0)
        };
        let options = BakeOptions {
            star_profile: 0,
            igniter_fuse_slots: vec![Some(0)],
            fuse_line_slots: vec![1],
        };
        let volume = bake(&blueprint, 1, &UniformFuel(80), &options);

        let lead = volume.nearest_cell(Vec3::new(0.0, -0.5, 0.0));
        assert_eq!(volume.fuse[lead], 1);

        for x in [-0.45, -0.1, 0.0, 0.3, 0.49] {
            let i = volume.nearest_cell(Vec3::new(x, 0.0, 0.0));
            assert_eq!(volume.fuse[i], 2, "Fuse line gap at x={}", x);
        }
        assert_eq!(volume.fuse[volume.nearest_cell(Vec3::new(0.0, 0.3, 0.0))], 0);
    }
}
