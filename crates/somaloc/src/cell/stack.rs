//! Cubic crop of the volume around one seed.

use crate::error::RefineError;
use crate::volume::VoxelSource;

/// Owned crop of a volume around a seed, with a movable center.
///
/// The crop covers `[seed - dim/2, seed + dim/2)` in x and y and
/// `[seed - floor(dim*s/2), seed + floor(dim*s/2))` in z, clamped to the
/// volume. Each half-extent is at least one voxel, so an interior seed always
/// lies inside its crop. Coordinates passed to the accessors are crop-local.
#[derive(Debug, Clone)]
pub struct CellStack {
    seed: [i32; 3],
    dim: usize,
    offset: [i32; 3],
    extent: [usize; 3],
    z_scale: f64,
    center: [i32; 3],
    on_border: bool,
    data: Vec<u16>,
}

impl CellStack {
    /// Crop the region around `seed` (volume coordinates) out of `volume`.
    ///
    /// Never fails: a seed outside the volume gives a crop with zero extent
    /// along the offending axis, flagged as on-border.
    pub fn extract<V: VoxelSource + ?Sized>(volume: &V, seed: [i32; 3], dim: usize) -> Self {
        let dims = volume.dimensions();
        let z_scale = volume.z_scale();
        let half_xy = ((dim / 2) as i64).max(1);
        let half_z = ((dim as f64 * z_scale / 2.0).floor() as i64).max(1);
        let half = [half_xy, half_xy, half_z];

        let mut offset = [0i32; 3];
        let mut extent = [0usize; 3];
        let mut on_border = false;
        for axis in 0..3 {
            let limit = dims[axis] as i64;
            let lo_req = seed[axis] as i64 - half[axis];
            let hi_req = seed[axis] as i64 + half[axis];
            let lo = lo_req.clamp(0, limit);
            let hi = hi_req.clamp(0, limit);
            offset[axis] = lo as i32;
            extent[axis] = (hi - lo).max(0) as usize;
            if extent[axis] as i64 != hi_req - lo_req {
                on_border = true;
            }
        }

        let mut data = Vec::with_capacity(extent[0] * extent[1] * extent[2]);
        for z in 0..extent[2] as i32 {
            for y in 0..extent[1] as i32 {
                for x in 0..extent[0] as i32 {
                    let p = [offset[0] + x, offset[1] + y, offset[2] + z];
                    data.push(volume.intensity(p).unwrap_or(0));
                }
            }
        }

        let center = [
            seed[0] - offset[0],
            seed[1] - offset[1],
            seed[2] - offset[2],
        ];

        Self {
            seed,
            dim,
            offset,
            extent,
            z_scale,
            center,
            on_border,
            data,
        }
    }

    /// Seed in volume coordinates.
    pub fn seed(&self) -> [i32; 3] {
        self.seed
    }

    /// Requested cube side length.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Crop origin in volume coordinates.
    pub fn offset(&self) -> [i32; 3] {
        self.offset
    }

    /// Crop extent `[w, h, d]` after clamping.
    pub fn extent(&self) -> [usize; 3] {
        self.extent
    }

    /// z-scale of the source volume.
    pub fn z_scale(&self) -> f64 {
        self.z_scale
    }

    /// Current cell center in crop coordinates.
    pub fn center(&self) -> [i32; 3] {
        self.center
    }

    /// Move the cell center (crop coordinates).
    pub fn set_center(&mut self, center: [i32; 3]) {
        self.center = center;
    }

    /// True when the requested cube did not fit inside the volume.
    pub fn on_border(&self) -> bool {
        self.on_border
    }

    /// True when the crop holds no voxel.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn contains(&self, p: [i32; 3]) -> bool {
        p[0] >= 0
            && p[1] >= 0
            && p[2] >= 0
            && (p[0] as usize) < self.extent[0]
            && (p[1] as usize) < self.extent[1]
            && (p[2] as usize) < self.extent[2]
    }

    /// Intensity at a crop-local point, `None` outside the crop.
    #[inline]
    pub fn voxel(&self, p: [i32; 3]) -> Option<u16> {
        if !self.contains(p) {
            return None;
        }
        Some(self.data[self.linear_index(p)])
    }

    /// Intensity at a point that must lie inside the crop.
    pub fn voxel_checked(&self, p: [i32; 3]) -> Result<u16, RefineError> {
        self.voxel(p).ok_or(RefineError::OutOfBounds { point: p })
    }

    /// Convert a crop-local point to volume coordinates.
    pub fn to_volume(&self, p: [i32; 3]) -> [i32; 3] {
        [
            p[0] + self.offset[0],
            p[1] + self.offset[1],
            p[2] + self.offset[2],
        ]
    }

    /// Crop-local point of a linear index (x fastest).
    #[inline]
    pub(crate) fn position_of(&self, idx: usize) -> [i32; 3] {
        let [w, h, _] = self.extent;
        let x = idx % w;
        let y = (idx / w) % h;
        let z = idx / (w * h);
        [x as i32, y as i32, z as i32]
    }

    #[inline]
    pub(crate) fn linear_index(&self, p: [i32; 3]) -> usize {
        let [w, h, _] = self.extent;
        (p[2] as usize * h + p[1] as usize) * w + p[0] as usize
    }

    /// Raw crop buffer, x fastest.
    pub(crate) fn raw(&self) -> &[u16] {
        &self.data
    }
}
