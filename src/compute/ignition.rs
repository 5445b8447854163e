//! Ignition-time propagation over the 6-connected voxel graph.
//!
//! A multi-source Dijkstra: every igniter seeds the frontier at its start
//! delay, and relaxing into a cell costs a time that depends on fuel density,
//! fuse membership and paper.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{VoxelVolume, hash_pair, hash_unit};
use crate::schema::Igniter;

/// Fixed cost of burning through one fuse cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuseCost {
    /// `ignite_cost / burn_speed`, in seconds per cell.
    pub seconds_per_cell: f32,
    /// Relative per-cell jitter.
    pub jitter: f32,
}

/// Edge-cost constants for one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct IgnitionParams {
    pub seconds_per_voxel: f32,
    pub paper_extra_delay_per_cell: f32,
    /// Applied to every non-fuse cell.
    pub scatter_cost_multiplier: f32,
    /// Indexed by fuse slot (volume value minus one).
    pub fuse_costs: Vec<FuseCost>,
    /// Seed for fuse jitter.
    pub seed: u32,
}

impl Default for IgnitionParams {
    fn default() -> Self {
        Self {
            seconds_per_voxel: 0.02,
            paper_extra_delay_per_cell: 0.04,
            scatter_cost_multiplier: 1.0,
            fuse_costs: Vec::new(),
            seed: 0,
        }
    }
}

/// Earliest ignition time of every voxel, `f32::INFINITY` when unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct IgnitionField {
    pub times: Vec<f32>,
    /// Cells the solve started from.
    pub sources: Vec<usize>,
}

impl IgnitionField {
    #[inline]
    pub fn time(&self, i: usize) -> f32 {
        self.times[i]
    }

    #[inline]
    pub fn is_reachable(&self, i: usize) -> bool {
        self.times[i].is_finite()
    }

    /// Number of cells with a finite ignition time.
    pub fn reached_count(&self) -> usize {
        self.times.iter().filter(|t| t.is_finite()).count()
    }

    /// Latest finite ignition time, if any cell was reached.
    pub fn latest(&self) -> Option<f32> {
        self.times
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .max_by(f32::total_cmp)
    }
}

/// Min-heap entry ordered by time, ties broken by cell index.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    time: f32,
    cell: u32,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the earliest time
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

/// Time to ignite cell `i` from an already burning neighbor.
#[inline]
pub fn step_cost(volume: &VoxelVolume, i: usize, params: &IgnitionParams) -> f32 {
    let slot = volume.fuse[i];
    let mut cost = match params.fuse_costs.get((slot as usize).wrapping_sub(1)) {
        Some(fuse) if slot > 0 => {
            let jitter = (hash_unit(hash_pair(params.seed, i as u32)) * 2.0 - 1.0) * fuse.jitter;
            fuse.seconds_per_cell * (1.0 + jitter).max(0.0)
        }
        _ => {
            let density = volume.fuel[i] as f32 / 255.0;
            let burn_rate = 0.25 + (1.0 - 0.25) * density;
            params.seconds_per_voxel / burn_rate * params.scatter_cost_multiplier
        }
    };

    if volume.has_paper(i) {
        let strength = volume.paper_strength[i];
        cost += if strength > 0 {
            params.paper_extra_delay_per_cell * (strength as f32 / 255.0)
        } else {
            params.paper_extra_delay_per_cell
        };
    }

    cost
}

/// Resolve the cells the solve starts from.
///
/// Igniters in impassable cells are skipped. With none left, the shell
/// center is used, or failing that the first fuel-bearing cell.
fn seed_cells(volume: &VoxelVolume, igniters: &[Igniter]) -> Vec<(usize, f32)> {
    let seeds: Vec<(usize, f32)> = igniters
        .iter()
        .map(|ig| {
            let delay = if ig.start_delay.is_finite() {
                ig.start_delay.max(0.0)
            } else {
                0.0
            };
            (volume.nearest_cell(ig.position), delay)
        })
        .filter(|&(i, _)| volume.is_passable(i))
        .collect();

    if !seeds.is_empty() {
        return seeds;
    }

    let center = volume.center_cell();
    if volume.is_passable(center) {
        log::warn!("No igniter reached fuel; igniting from shell center");
        return vec![(center, 0.0)];
    }

    match (0..volume.len()).find(|&i| volume.is_passable(i)) {
        Some(i) => {
            log::warn!("No igniter reached fuel; igniting from first fuel cell {}", i);
            vec![(i, 0.0)]
        }
        None => Vec::new(),
    }
}

/// Compute the ignition time of every voxel.
pub fn solve_ignition(
    volume: &VoxelVolume,
    igniters: &[Igniter],
    params: &IgnitionParams,
) -> IgnitionField {
    let mut times = vec![f32::INFINITY; volume.len()];
    let mut heap = BinaryHeap::new();
    let seeds = seed_cells(volume, igniters);

    for &(cell, time) in &seeds {
        if time < times[cell] {
            times[cell] = time;
            heap.push(Frontier {
                time,
                cell: cell as u32,
            });
        }
    }

    while let Some(Frontier { time, cell }) = heap.pop() {
        let cell = cell as usize;
        if time > times[cell] {
            continue;
        }

        for n in volume.neighbors(cell) {
            if !volume.is_passable(n) {
                continue;
            }
            let candidate = time + step_cost(volume, n, params);
            if candidate < times[n] {
                times[n] = candidate;
                heap.push(Frontier {
                    time: candidate,
                    cell: n as u32,
                });
            }
        }
    }

    let mut sources: Vec<usize> = seeds.into_iter().map(|(c, _)| c).collect();
    sources.sort_unstable();
    sources.dedup();

    IgnitionField { times, sources }
}
