//! Dense voxel volume holding a shell's fuel and geometry.

use glam::Vec3;

/// Cubic voxel grid over the shell-local cube `[-1, 1]^3`.
///
/// All per-cell attributes are stored as flat arrays indexed
/// `z * res * res + y * res + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelVolume {
    /// Side length of the grid.
    pub res: usize,
    /// Fuel density (0 = impassable).
    pub fuel: Vec<u8>,
    /// Star presence flag.
    pub star: Vec<bool>,
    /// Palette index of the star in this cell.
    pub star_color: Vec<u8>,
    /// Star profile id of the star in this cell.
    pub star_profile: Vec<u16>,
    /// Paper wall id (0 = no paper).
    pub paper_wall: Vec<u16>,
    /// Paper strength (0 = flat delay).
    pub paper_strength: Vec<u8>,
    /// Fuse slot plus one (0 = not a fuse cell).
    pub fuse: Vec<u8>,
}

impl VoxelVolume {
    /// Create an empty volume with zero fuel everywhere.
    pub fn new(res: usize) -> Self {
        let len = res * res * res;
        Self {
            res,
            fuel: vec![0; len],
            star: vec![false; len],
            star_color: vec![0; len],
            star_profile: vec![0; len],
            paper_wall: vec![0; len],
            paper_strength: vec![0; len],
            fuse: vec![0; len],
        }
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.fuel.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fuel.is_empty()
    }

    /// Edge length of one cell in shell-local units.
    #[inline]
    pub fn voxel_size(&self) -> f32 {
        2.0 / self.res as f32
    }

    /// Convert (x, y, z) coordinates to flat index.
    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.res * self.res + y * self.res + x
    }

    /// Convert a flat index back to (x, y, z).
    #[inline]
    pub fn coords(&self, i: usize) -> (usize, usize, usize) {
        let slice = self.res * self.res;
        (i % self.res, (i / self.res) % self.res, i / slice)
    }

    /// Shell-local position of a cell's center.
    #[inline]
    pub fn cell_center(&self, i: usize) -> Vec3 {
        let (x, y, z) = self.coords(i);
        let s = self.voxel_size();
        Vec3::new(
            (x as f32 + 0.5) * s - 1.0,
            (y as f32 + 0.5) * s - 1.0,
            (z as f32 + 0.5) * s - 1.0,
        )
    }

    /// Grid coordinate along one axis for a local coordinate, unclamped.
    #[inline]
    fn axis_cell(&self, v: f32) -> i64 {
        ((v + 1.0) * 0.5 * self.res as f32).floor() as i64
    }

    /// Cell containing `p`, or `None` if `p` lies outside the grid.
    pub fn cell_at(&self, p: Vec3) -> Option<usize> {
        let res = self.res as i64;
        let (x, y, z) = (self.axis_cell(p.x), self.axis_cell(p.y), self.axis_cell(p.z));
        if (0..res).contains(&x) && (0..res).contains(&y) && (0..res).contains(&z) {
            Some(self.idx(x as usize, y as usize, z as usize))
        } else {
            None
        }
    }

    /// Cell containing `p`, clamped onto the grid boundary.
    pub fn nearest_cell(&self, p: Vec3) -> usize {
        let max = self.res as i64 - 1;
        let x = self.axis_cell(p.x).clamp(0, max) as usize;
        let y = self.axis_cell(p.y).clamp(0, max) as usize;
        let z = self.axis_cell(p.z).clamp(0, max) as usize;
        self.idx(x, y, z)
    }

    /// Index of the cell at the shell center.
    #[inline]
    pub fn center_cell(&self) -> usize {
        self.nearest_cell(Vec3::ZERO)
    }

    /// Whether ignition can propagate into this cell.
    #[inline]
    pub fn is_passable(&self, i: usize) -> bool {
        self.fuel[i] > 0
    }

    #[inline]
    pub fn has_paper(&self, i: usize) -> bool {
        self.paper_wall[i] != 0
    }

    /// Normalized fuel (0-1) at `p`, zero outside the grid.
    #[inline]
    pub fn fuel_at(&self, p: Vec3) -> f32 {
        self.cell_at(p)
            .map(|i| self.fuel[i] as f32 / 255.0)
            .unwrap_or(0.0)
    }

    /// Flat indices of every star cell, ascending.
    pub fn star_indices(&self) -> Vec<u32> {
        self.star
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i as u32))
            .collect()
    }

    /// Number of star cells.
    pub fn star_count(&self) -> usize {
        self.star.iter().filter(|&&s| s).count()
    }

    /// The up to six face-adjacent neighbors of a cell.
    #[inline]
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + use<> {
        let (x, y, z) = self.coords(i);
        let res = self.res;
        let slice = res * res;
        [
            (x > 0).then(|| i - 1),
            (x + 1 < res).then(|| i + 1),
            (y > 0).then(|| i - res),
            (y + 1 < res).then(|| i + res),
            (z > 0).then(|| i - slice),
            (z + 1 < res).then(|| i + slice),
        ]
        .into_iter()
        .flatten()
    }
}
