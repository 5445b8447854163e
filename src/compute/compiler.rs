//! Shell compiler - drives every stage from blueprint to compiled show.
//!
//! Bake, solve ignition, cluster, then solve kinematics region by region.
//! Tags are resolved once up front so the numeric stages never see strings.

use std::collections::BTreeMap;

use glam::Vec3;
use rand::prelude::*;

use super::{
    BakeOptions, FuseCost, IgnitionParams, KinematicsSolver, SEED_MULTIPLIER, UniformFuel, bake,
    build_regions, solve_ignition,
};
use crate::schema::{
    Blueprint, CompilerConfig, Intent, ProfileSource, RecordKind, Rgba, ScatterDef, StarKind,
    StarProfile, WashiDef, positive,
};
use crate::show::{BurstEvent, CompiledShow, LaunchParams, ParticleInit};

/// Salt separating the kinematics random stream from star placement.
const KINEMATICS_STREAM: u64 = 0x6b69_6e65_6d61_7469;

/// Counters describing one compile.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompileStats {
    pub voxels: usize,
    pub star_voxels: usize,
    /// Star voxels inside some burst region.
    pub clustered_stars: usize,
    pub regions: usize,
    pub particles: usize,
    /// True when no region formed and every star fired in one burst at t = 0.
    pub used_fallback: bool,
    /// Latest finite ignition time anywhere in the volume.
    pub latest_ignition: f32,
}

impl std::fmt::Display for CompileStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} star voxels, {} bursts, {} particles{}",
            self.star_voxels,
            self.regions,
            self.particles,
            if self.used_fallback { " (fallback burst)" } else { "" }
        )
    }
}

/// Everything resolved from tags before the numeric stages run.
struct Resolved {
    star_id: u16,
    star: StarProfile,
    palette: Vec<Rgba>,
    scatter: ScatterDef,
    washi: WashiDef,
    launch: LaunchParams,
    fuse_costs: Vec<FuseCost>,
    bake: BakeOptions,
}

fn builtin_profile(intent: &Intent, kind: StarKind) -> StarProfile {
    let jitter = intent.jitter.max(0.0);
    let defaults = StarProfile::default();
    StarProfile {
        tag: String::new(),
        kind,
        base_speed: intent.base_speed.max(0.0),
        speed_jitter: jitter,
        base_size: defaults.base_size,
        size_jitter: defaults.base_size * jitter,
        base_life: intent.life.max(0.0),
        life_jitter: intent.life.max(0.0) * jitter,
        drag: intent.drag,
        brightness: 1.0,
    }
}

/// Fuse tags mapped to slots in first-seen order.
struct FuseSlots<'p> {
    profiles: Option<&'p dyn ProfileSource>,
    config: &'p CompilerConfig,
    tags: Vec<String>,
    costs: Vec<FuseCost>,
}

impl<'p> FuseSlots<'p> {
    fn slot(&mut self, tag: &str) -> u8 {
        let key = tag.trim().to_lowercase();
        if let Some(pos) = self.tags.iter().position(|t| *t == key) {
            return pos as u8;
        }
        if self.tags.len() >= u8::MAX as usize {
            // Volume stores slot + 1 in a u8
            return u8::MAX - 1;
        }

        let def = self
            .profiles
            .and_then(|db| db.resolve_tag(RecordKind::Fuse, tag).and_then(|id| db.fuse(id)));
        let cost = match def {
            Some(def) => FuseCost {
                seconds_per_cell: def.ignite_cost.max(0.0) / positive(def.burn_speed),
                jitter: def.jitter.clamp(0.0, 1.0),
            },
            None => FuseCost {
                seconds_per_cell: self.config.fuse_ignite_cost / self.config.fuse_burn_speed,
                jitter: 0.0,
            },
        };

        self.tags.push(key);
        self.costs.push(cost);
        (self.tags.len() - 1) as u8
    }
}

fn resolve(
    blueprint: &Blueprint,
    config: &CompilerConfig,
    profiles: Option<&dyn ProfileSource>,
) -> Resolved {
    let tags = &blueprint.tags;

    let (star_id, star) = profiles
        .and_then(|db| {
            let id = db.resolve_tag(RecordKind::Star, &tags.star)?;
            Some((id.0, db.star(id)?.clone()))
        })
        .unwrap_or_else(|| {
            (
                blueprint.star_kind as u16,
                builtin_profile(&blueprint.intent, blueprint.star_kind),
            )
        });

    let palette = profiles
        .and_then(|db| db.palette(db.resolve_tag(RecordKind::Palette, &tags.palette)?))
        .filter(|p| !p.colors.is_empty())
        .map(|p| p.colors.clone())
        .unwrap_or_else(|| blueprint.palette.clone());

    let scatter = profiles
        .and_then(|db| db.scatter(db.resolve_tag(RecordKind::Scatter, &tags.scatter)?))
        .cloned()
        .unwrap_or_else(|| ScatterDef {
            tag: String::new(),
            strength: config.scatter_strength,
            uniformity: blueprint.intent.uniformity,
            ignite_cost_multiplier: config.scatter_ignite_cost_multiplier,
        });

    let washi = profiles
        .and_then(|db| db.washi(db.resolve_tag(RecordKind::Washi, &tags.washi)?))
        .cloned()
        .unwrap_or_else(|| WashiDef {
            tag: String::new(),
            delay: config.washi_delay,
            collimation: config.washi_collimation,
        });

    let launch = profiles
        .and_then(|db| db.launch(db.resolve_tag(RecordKind::Launch, &tags.launch)?))
        .map(LaunchParams::from)
        .unwrap_or_else(|| LaunchParams::from(&blueprint.launch));

    let mut fuses = FuseSlots {
        profiles,
        config,
        tags: Vec::new(),
        costs: Vec::new(),
    };
    let igniter_fuse_slots = blueprint
        .igniters
        .iter()
        .map(|ig| (!ig.fuse.trim().is_empty()).then(|| fuses.slot(&ig.fuse)))
        .collect();
    let fuse_line_slots = blueprint.fuses.iter().map(|l| fuses.slot(&l.fuse)).collect();

    Resolved {
        star_id,
        star,
        palette,
        scatter,
        washi,
        launch,
        fuse_costs: fuses.costs,
        bake: BakeOptions {
            star_profile: star_id,
            igniter_fuse_slots,
            fuse_line_slots,
        },
    }
}

/// Compile a blueprint into a show.
///
/// `profiles` may be absent, in which case blueprint-embedded defaults are
/// used. `seed` overrides the blueprint's seed. The result depends only on
/// these inputs.
pub fn compile(
    blueprint: &Blueprint,
    profiles: Option<&dyn ProfileSource>,
    seed: Option<u32>,
) -> CompiledShow {
    compile_with_stats(blueprint, profiles, seed).0
}

/// [`compile`], also returning stage counters.
pub fn compile_with_stats(
    blueprint: &Blueprint,
    profiles: Option<&dyn ProfileSource>,
    seed: Option<u32>,
) -> (CompiledShow, CompileStats) {
    let seed = seed.unwrap_or(blueprint.seed);
    let config = blueprint.compiler.sanitized();
    let resolved = resolve(blueprint, &config, profiles);

    let volume = bake(
        blueprint,
        seed,
        &UniformFuel(config.base_fuel),
        &resolved.bake,
    );

    let params = IgnitionParams {
        seconds_per_voxel: config.seconds_per_voxel,
        paper_extra_delay_per_cell: config.paper_extra_delay_per_cell,
        scatter_cost_multiplier: positive(resolved.scatter.ignite_cost_multiplier),
        fuse_costs: resolved.fuse_costs.clone(),
        seed,
    };
    let field = solve_ignition(&volume, &blueprint.igniters, &params);
    let regions = build_regions(
        &volume,
        &field,
        config.max_ignition_time,
        config.cluster_window,
    );

    let mut star_profiles = BTreeMap::new();
    star_profiles.insert(resolved.star_id, resolved.star.clone());
    let solver = KinematicsSolver {
        volume: &volume,
        field: &field,
        palette: &resolved.palette,
        profiles: &star_profiles,
        fallback_profile: &resolved.star,
        scatter: &resolved.scatter,
        washi: &resolved.washi,
    };

    let mut rng = StdRng::seed_from_u64(seed as u64 ^ KINEMATICS_STREAM);
    let mut particles: Vec<ParticleInit> = Vec::new();
    let mut bursts = Vec::with_capacity(regions.len().max(1));
    let star_voxels = volume.star_count();

    if regions.is_empty() {
        let stars = volume.star_indices();
        if !stars.is_empty() {
            log::warn!(
                "No burst regions formed; firing all {} stars at t=0",
                stars.len()
            );
            solver.solve(&stars, None, &mut rng, &mut particles);
            let centroid = stars
                .iter()
                .map(|&v| volume.cell_center(v as usize))
                .fold(Vec3::ZERO, |a, b| a + b)
                / stars.len() as f32;
            bursts.push(BurstEvent {
                time: 0.0,
                position: centroid,
                effect_id: blueprint.effect_id,
                count: particles.len() as u32,
                start: 0,
            });
        }
    } else {
        for region in &regions {
            let start = particles.len();
            solver.solve(&region.voxels, Some(region.start_time), &mut rng, &mut particles);
            bursts.push(BurstEvent {
                time: region.start_time,
                position: region.centroid,
                effect_id: blueprint.effect_id,
                count: (particles.len() - start) as u32,
                start: start as u32,
            });
        }
    }

    for (i, particle) in particles.iter_mut().enumerate() {
        particle.seed = seed ^ (i as u32).wrapping_mul(SEED_MULTIPLIER);
    }

    let stats = CompileStats {
        voxels: volume.len(),
        star_voxels,
        clustered_stars: regions.iter().map(|r| r.voxels.len()).sum(),
        regions: bursts.len(),
        particles: particles.len(),
        used_fallback: regions.is_empty() && !bursts.is_empty(),
        latest_ignition: field.latest().unwrap_or(0.0),
    };
    log::info!("Compiled shell (seed {}): {}", seed, stats);

    let show = CompiledShow {
        seed,
        launch: resolved.launch,
        bursts,
        particles,
    };
    (show, stats)
}
