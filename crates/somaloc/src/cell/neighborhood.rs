//! Mean intensity over anisotropic spheres and shells.
//!
//! All three samplers return `None` when no in-bounds voxel satisfies the
//! radius predicate; callers decide how to treat an empty neighborhood.

use super::stack::CellStack;
use crate::geometry::offset_dist_sq;

/// Accumulate the mean of in-bounds voxels whose squared distance passes
/// `keep`, scanning the bounding box of radius `r_outer` within the crop.
fn mean_where(
    stack: &CellStack,
    center: [i32; 3],
    r_outer: f64,
    keep: impl Fn(f64) -> bool,
) -> Option<f64> {
    if r_outer.is_nan() || r_outer < 0.0 {
        return None;
    }
    let s = stack.z_scale();
    let ext = stack.extent();
    let rxy = r_outer.floor() as i64;
    let rz = (r_outer * s).floor() as i64;
    // Scan only offsets that land inside the crop.
    let span = |axis: usize, r: i64| -> (i32, i32) {
        let c = center[axis] as i64;
        let lo = (-r).max(-c);
        let hi = r.min(ext[axis] as i64 - 1 - c);
        (lo as i32, hi as i32)
    };
    let (x0, x1) = span(0, rxy);
    let (y0, y1) = span(1, rxy);
    let (z0, z1) = span(2, rz);

    let mut sum = 0.0f64;
    let mut count = 0usize;
    for dz in z0..=z1 {
        for dy in y0..=y1 {
            for dx in x0..=x1 {
                if !keep(offset_dist_sq(dx, dy, dz, s)) {
                    continue;
                }
                if let Some(v) = stack.voxel([center[0] + dx, center[1] + dy, center[2] + dz]) {
                    sum += v as f64;
                    count += 1;
                }
            }
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Mean over voxels with `dist² <= r_outer²`.
pub fn sphere_mean(stack: &CellStack, center: [i32; 3], r_outer: f64) -> Option<f64> {
    let r_sq = r_outer * r_outer;
    mean_where(stack, center, r_outer, |d2| d2 <= r_sq)
}

/// Mean over the closed shell `r_inner² <= dist² <= r_outer²`.
pub fn shell_mean(
    stack: &CellStack,
    center: [i32; 3],
    r_inner: f64,
    r_outer: f64,
) -> Option<f64> {
    let lo = r_inner * r_inner;
    let hi = r_outer * r_outer;
    mean_where(stack, center, r_outer, |d2| d2 >= lo && d2 <= hi)
}

/// Mean over the half-open layer `r_inner² <= dist² < r_outer²`.
///
/// Consecutive layers `[r, r+1)` partition the ball, so every voxel lands in
/// exactly one radial-profile entry.
pub fn layer_mean(
    stack: &CellStack,
    center: [i32; 3],
    r_inner: f64,
    r_outer: f64,
) -> Option<f64> {
    let lo = r_inner * r_inner;
    let hi = r_outer * r_outer;
    mean_where(stack, center, r_outer, |d2| d2 >= lo && d2 < hi)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::volume::Volume;

    fn noisy_stack(z_scale: f64) -> CellStack {
        let mut rng = StdRng::seed_from_u64(7);
        let vol = Volume::from_fn([24, 24, 24], z_scale, |_, _, _| rng.gen_range(0..1000)).unwrap();
        CellStack::extract(&vol, [12, 12, 12], 20)
    }

    #[test]
    fn zero_radius_sphere_is_the_center_voxel() {
        let cs = noisy_stack(1.0);
        for p in [[0, 0, 0], [5, 9, 3], [19, 19, 19]] {
            let v = cs.voxel(p).unwrap() as f64;
            assert_relative_eq!(sphere_mean(&cs, p, 0.0).unwrap(), v);
        }
    }

    #[test]
    fn huge_radius_covers_whole_crop() {
        let cs = noisy_stack(0.4);
        let all = cs.raw().iter().map(|&v| v as f64).sum::<f64>() / cs.raw().len() as f64;
        assert_relative_eq!(
            sphere_mean(&cs, cs.center(), 1.0e9).unwrap(),
            all,
            epsilon = 1e-9
        );
        assert_eq!(shell_mean(&cs, cs.center(), 1.0e9, 2.0e9), None);
    }

    #[test]
    fn shell_from_zero_equals_sphere() {
        for z_scale in [1.0, 0.4] {
            let cs = noisy_stack(z_scale);
            for r in [1.0, 2.5, 6.0] {
                let c = cs.center();
                assert_relative_eq!(
                    shell_mean(&cs, c, 0.0, r).unwrap(),
                    sphere_mean(&cs, c, r).unwrap(),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn isotropic_unit_sphere_averages_seven_voxels() {
        let mut vol = Volume::filled([9, 9, 9], 1.0, 0).unwrap();
        vol.set_voxel([4, 4, 4], 70);
        let cs = CellStack::extract(&vol, [4, 4, 4], 8);
        assert_relative_eq!(sphere_mean(&cs, cs.center(), 1.0).unwrap(), 10.0);
        assert_relative_eq!(layer_mean(&cs, cs.center(), 0.0, 1.0).unwrap(), 70.0);
        assert_relative_eq!(layer_mean(&cs, cs.center(), 1.0, 2.0).unwrap(), 0.0);
    }

    #[test]
    fn anisotropy_shrinks_z_reach() {
        // z = 1 is 2.5 units away at s = 0.4, outside a radius-2 sphere.
        let mut vol = Volume::filled([9, 9, 9], 0.4, 0).unwrap();
        vol.set_voxel([4, 4, 5], 100);
        let cs = CellStack::extract(&vol, [4, 4, 4], 20);
        let c = cs.center();
        assert_eq!(c, [4, 4, 4]);
        assert_relative_eq!(sphere_mean(&cs, c, 2.0).unwrap(), 0.0);
        assert!(sphere_mean(&cs, c, 3.0).unwrap() > 0.0);
    }

    #[test]
    fn empty_neighborhoods_are_none() {
        let cs = noisy_stack(1.0);
        assert!(sphere_mean(&cs, [-10, -10, -10], 2.0).is_none());
        assert!(shell_mean(&cs, cs.center(), 3.0, 2.0).is_none());
        assert!(sphere_mean(&cs, cs.center(), -1.0).is_none());
    }

    #[test]
    fn out_of_bounds_voxels_are_ignored() {
        let vol = Volume::filled([10, 10, 10], 1.0, 50).unwrap();
        let cs = CellStack::extract(&vol, [5, 5, 5], 10);
        assert_relative_eq!(sphere_mean(&cs, [0, 0, 0], 4.0).unwrap(), 50.0);
    }
}
