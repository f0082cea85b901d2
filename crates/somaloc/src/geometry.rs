//! Anisotropic distance, Gaussian kernel and ball enumeration.
//!
//! Every distance in this crate is measured in xy-voxel units with z steps
//! inflated by `1 / z_scale`, so a sphere in physical space is a flattened
//! ellipsoid in voxel space.

use std::f64::consts::PI;

/// Squared anisotropic distance of an integer offset.
#[inline]
pub(crate) fn offset_dist_sq(dx: i32, dy: i32, dz: i32, z_scale: f64) -> f64 {
    let (x, y) = (dx as f64, dy as f64);
    let zs = dz as f64 / z_scale;
    x * x + y * y + zs * zs
}

/// `sqrt(dx² + dy² + dz² / s²)` between two voxel positions.
#[inline]
pub fn anisotropic_distance(a: [i32; 3], b: [i32; 3], z_scale: f64) -> f64 {
    offset_dist_sq(a[0] - b[0], a[1] - b[1], a[2] - b[2], z_scale).sqrt()
}

/// Gaussian radial basis function `1/(σ√(2π)) · exp(−½ (d/σ)²)`.
#[inline]
pub fn gaussian_kernel(distance: f64, bandwidth: f64) -> f64 {
    let u = distance / bandwidth;
    (-0.5 * u * u).exp() / (bandwidth * (2.0 * PI).sqrt())
}

/// Integer offset inside an anisotropic ball, with its squared distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BallOffset {
    pub(crate) d: [i32; 3],
    pub(crate) dist_sq: f64,
}

/// All offsets with `dist² <= radius²`, enumerated z outer, y middle,
/// x inner, most negative first.
///
/// The z half-extent is `floor(radius * z_scale)`. A negative radius yields
/// an empty set.
pub(crate) fn ball_offsets(radius: f64, z_scale: f64) -> Vec<BallOffset> {
    if radius.is_nan() || radius < 0.0 {
        return Vec::new();
    }
    let r_sq = radius * radius;
    let rxy = radius.floor() as i32;
    let rz = (radius * z_scale).floor() as i32;
    let mut out = Vec::new();
    for dz in -rz..=rz {
        for dy in -rxy..=rxy {
            for dx in -rxy..=rxy {
                let dist_sq = offset_dist_sq(dx, dy, dz, z_scale);
                if dist_sq <= r_sq {
                    out.push(BallOffset {
                        d: [dx, dy, dz],
                        dist_sq,
                    });
                }
            }
        }
    }
    out
}
