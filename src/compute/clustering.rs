//! Grouping of star voxels into time-bounded burst regions.

use std::collections::VecDeque;

use glam::Vec3;

use super::{IgnitionField, VoxelVolume};

/// A spatially connected set of star voxels igniting within one time window.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Member voxel indices in admission order.
    pub voxels: Vec<u32>,
    /// Earliest member ignition time.
    pub start_time: f32,
    /// Latest member ignition time.
    pub end_time: f32,
    /// Mean cell center of the members.
    pub centroid: Vec3,
}

impl Region {
    #[inline]
    pub fn span(&self) -> f32 {
        self.end_time - self.start_time
    }
}

#[inline]
fn is_candidate(volume: &VoxelVolume, field: &IgnitionField, i: usize, max_time: f32) -> bool {
    let t = field.time(i);
    volume.star[i] && t.is_finite() && t <= max_time
}

/// Flood-fill star voxels into regions whose ignition span stays within `window`.
///
/// A neighbor joins when the region's running min/max, widened by the
/// neighbor's time, still spans at most `window`. Membership therefore
/// depends on breadth-first admission order: a voxel refused by one region
/// stays unvisited and may seed or join a later one. Regions are returned in
/// ascending start time; ties keep discovery order.
pub fn build_regions(
    volume: &VoxelVolume,
    field: &IgnitionField,
    max_time: f32,
    window: f32,
) -> Vec<Region> {
    let mut visited = vec![false; volume.len()];
    let mut queue = VecDeque::new();
    let mut regions = Vec::new();

    for seed in 0..volume.len() {
        if visited[seed] || !is_candidate(volume, field, seed, max_time) {
            continue;
        }

        visited[seed] = true;
        queue.push_back(seed);

        let mut min_t = field.time(seed);
        let mut max_t = min_t;
        let mut sum = Vec3::ZERO;
        let mut voxels = Vec::new();

        while let Some(cell) = queue.pop_front() {
            voxels.push(cell as u32);
            sum += volume.cell_center(cell);

            for n in volume.neighbors(cell) {
                if visited[n] || !is_candidate(volume, field, n, max_time) {
                    continue;
                }
                let t = field.time(n);
                let lo = min_t.min(t);
                let hi = max_t.max(t);
                if hi - lo <= window {
                    min_t = lo;
                    max_t = hi;
                    visited[n] = true;
                    queue.push_back(n);
                }
            }
        }

        let centroid = sum / voxels.len() as f32;
        regions.push(Region {
            voxels,
            start_time: min_t,
            end_time: max_t,
            centroid,
        });
    }

    regions.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    log::debug!(
        "Clustered star voxels into {} regions (window {:.3}s, cutoff {:.2}s)",
        regions.len(),
        window,
        max_time
    );

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Volume with a straight line of star cells along x at y = z = 0.
    fn line_volume(res: usize, len: usize) -> VoxelVolume {
        let mut volume = VoxelVolume::new(res);
        volume.fuel.fill(100);
        for x in 0..len {
            let i = volume.idx(x, 0, 0);
            volume.star[i] = true;
        }
        volume
    }

    fn field_with(volume: &VoxelVolume, times: &[(usize, f32)]) -> IgnitionField {
        let mut all = vec![f32::INFINITY; volume.len()];
        for &(i, t) in times {
            all[i] = t;
        }
        IgnitionField {
            times: all,
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_window_splits_line() {
        let volume = line_volume(8, 6);
        let times: Vec<(usize, f32)> = (0..6).map(|x| (volume.idx(x, 0, 0), x as f32 * 0.1)).collect();
        let field = field_with(&volume, &times);

        let regions = build_regions(&volume, &field, 10.0, 0.25);
        let sizes: Vec<usize> = regions.iter().map(|r| r.voxels.len()).collect();
        assert_eq!(sizes, vec![3, 3]);
        assert!((regions[0].start_time - 0.0).abs() < 1e-6);
        assert!((regions[1].start_time - 0.3).abs() < 1e-6);
        for region in &regions {
            assert!(region.span() <= 0.25 + 1e-6);
        }
    }

    #[test]
    fn test_single_region_when_window_is_wide() {
        let volume = line_volume(8, 6);
        let times: Vec<(usize, f32)> = (0..6).map(|x| (volume.idx(x, 0, 0), x as f32 * 0.1)).collect();
        let field = field_with(&volume, &times);

        let regions = build_regions(&volume, &field, 10.0, 1.0);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].voxels.len(), 6);

        let expected = (0..6)
            .map(|x| volume.cell_center(volume.idx(x, 0, 0)))
            .fold(Vec3::ZERO, |a, b| a + b)
            / 6.0;
        assert!((regions[0].centroid - expected).length() < 1e-5);
    }

    #[test]
    fn test_unreachable_and_late_stars_excluded() {
        let volume = line_volume(8, 4);
        let field = field_with(
            &volume,
            &[
                (volume.idx(0, 0, 0), 0.1),
                (volume.idx(1, 0, 0), 0.1),
                (volume.idx(2, 0, 0), 9.0),
                // x = 3 left unreachable
            ],
        );

        let regions = build_regions(&volume, &field, 5.0, 1.0);
        assert_eq!(regions.len(), 1);
        let mut members = regions[0].voxels.clone();
        members.sort();
        assert_eq!(members, vec![volume.idx(0, 0, 0) as u32, volume.idx(1, 0, 0) as u32]);
    }

    #[test]
    fn test_admission_uses_running_span() {
        // Times 0.0, 0.2, 0.4 along the line; with window 0.2 the middle cell
        // joins the first region and the last cell is refused.
        let volume = line_volume(8, 3);
        let field = field_with(
            &volume,
            &[
                (volume.idx(0, 0, 0), 0.0),
                (volume.idx(1, 0, 0), 0.2),
                (volume.idx(2, 0, 0), 0.4),
            ],
        );

        let regions = build_regions(&volume, &field, 10.0, 0.2 + 1e-6);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].voxels.len(), 2);
        assert_eq!(regions[1].voxels, vec![volume.idx(2, 0, 0) as u32]);
    }

    #[test]
    fn test_regions_sorted_by_start_time() {
        let mut volume = VoxelVolume::new(8);
        volume.fuel.fill(100);
        let late = volume.idx(0, 0, 0);
        let early = volume.idx(5, 5, 5);
        volume.star[late] = true;
        volume.star[early] = true;
        let field = field_with(&volume, &[(late, 2.0), (early, 0.5)]);

        let regions = build_regions(&volume, &field, 10.0, 0.1);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].voxels, vec![early as u32]);
        assert_eq!(regions[1].voxels, vec![late as u32]);
    }
}
